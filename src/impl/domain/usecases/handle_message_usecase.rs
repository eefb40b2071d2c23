use async_trait::async_trait;
use fractic_server_error::ServerError;
use tracing::{debug, warn};

use crate::{
    config::ExpenseCaptureConfig,
    data::repositories::{
        conversation_repository_impl::ConversationRepositoryImpl,
        interpretation_repository_impl::InterpretationRepositoryImpl,
        ledger_repository_impl::LedgerRepositoryImpl,
        reference_repository_impl::ReferenceRepositoryImpl,
    },
    domain::{
        logic::{
            dialogue_controller::{DialogueController, StateChange},
            normalizer::normalize_user_key,
            synonyms::CategoryKeywordTable,
        },
        repositories::{
            conversation_repository::ConversationRepository,
            interpretation_repository::InterpretationRepository,
            ledger_repository::LedgerRepository, reference_repository::ReferenceRepository,
        },
    },
    entities::{
        ConversationStateService, DialogueReply, InboundMessage, InterpretationService,
        LedgerService, ReferenceDataService,
    },
};

#[async_trait]
pub trait HandleMessageUsecase: Send + Sync {
    /// Runs one full turn for the message's user. Only failures to load or
    /// persist the conversation are returned as errors.
    async fn handle_message(&self, message: &InboundMessage)
        -> Result<DialogueReply, ServerError>;
}

pub(crate) struct HandleMessageUsecaseImpl<
    IS,
    RS,
    LS,
    SS,
    R1 = InterpretationRepositoryImpl<IS>, // Default.
    R2 = ReferenceRepositoryImpl<RS>,      // Default.
    R3 = LedgerRepositoryImpl<LS>,         // Default.
    R4 = ConversationRepositoryImpl<SS>,   // Default.
> where
    IS: InterpretationService,
    RS: ReferenceDataService,
    LS: LedgerService,
    SS: ConversationStateService,
    R1: InterpretationRepository,
    R2: ReferenceRepository,
    R3: LedgerRepository,
    R4: ConversationRepository,
{
    interpretation_repository: R1,
    reference_repository: R2,
    ledger_repository: R3,
    conversation_repository: R4,
    config: ExpenseCaptureConfig,
    keywords: CategoryKeywordTable,
    _phantom: std::marker::PhantomData<(IS, RS, LS, SS)>,
}

#[async_trait]
impl<IS, RS, LS, SS, R1, R2, R3, R4> HandleMessageUsecase
    for HandleMessageUsecaseImpl<IS, RS, LS, SS, R1, R2, R3, R4>
where
    IS: InterpretationService,
    RS: ReferenceDataService,
    LS: LedgerService,
    SS: ConversationStateService,
    R1: InterpretationRepository,
    R2: ReferenceRepository,
    R3: LedgerRepository,
    R4: ConversationRepository,
{
    async fn handle_message(
        &self,
        message: &InboundMessage,
    ) -> Result<DialogueReply, ServerError> {
        let user_key = normalize_user_key(&message.user_id);
        let _turn_guard = self.conversation_repository.lock(&user_key).await;

        let stored = self.conversation_repository.load(&user_key).await?;
        let version = stored.as_ref().map(|s| s.version);

        let references = match self.reference_repository.load(&message.org_id).await {
            Ok(references) => references,
            Err(e) => {
                warn!(user_key = %user_key, org_id = %message.org_id, error = ?e, "reference data unavailable");
                return Ok(DialogueReply::Error);
            }
        };

        let outcome = DialogueController::new(
            &self.interpretation_repository,
            &self.ledger_repository,
            &self.config,
            &self.keywords,
            &references,
            message,
            &user_key,
        )
        .process(stored.map(|s| s.state))
        .await;

        match outcome.state_change {
            StateChange::Save(state) => {
                self.conversation_repository
                    .save(&state, version, message.received_at)
                    .await?
            }
            StateChange::Clear if version.is_some() => {
                self.conversation_repository.clear(&user_key).await?
            }
            StateChange::Clear | StateChange::Keep => {}
        }
        debug!(user_key = %user_key, reply = %outcome.reply.summary(), "turn handled");
        Ok(outcome.reply)
    }
}

impl<IS, RS, LS, SS> HandleMessageUsecaseImpl<IS, RS, LS, SS>
where
    IS: InterpretationService,
    RS: ReferenceDataService,
    LS: LedgerService,
    SS: ConversationStateService,
{
    pub(crate) fn new(
        interpretation_service: IS,
        reference_data_service: RS,
        ledger_service: LS,
        state_service: SS,
        config: ExpenseCaptureConfig,
    ) -> Self {
        HandleMessageUsecaseImpl {
            interpretation_repository: InterpretationRepositoryImpl::new(interpretation_service),
            reference_repository: ReferenceRepositoryImpl::new(reference_data_service),
            ledger_repository: LedgerRepositoryImpl::new(ledger_service),
            conversation_repository: ConversationRepositoryImpl::new(state_service),
            keywords: CategoryKeywordTable::new(&config),
            config,
            _phantom: std::marker::PhantomData,
        }
    }
}

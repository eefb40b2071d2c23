use fractic_server_error::ServerError;

use crate::{
    config::ExpenseCaptureConfig,
    domain::usecases::handle_message_usecase::{
        HandleMessageUsecase as _, HandleMessageUsecaseImpl,
    },
    entities::{
        ConversationStateService, DialogueReply, InboundMessage, InterpretationService,
        LedgerService, ReferenceDataService,
    },
    presentation::reply_fmt::ReplyRenderer,
};

/// Entry point of the library: one instance per deployment, shared by every
/// inbound message. Turns of the same user are serialized internally.
pub struct ExpenseCaptureUtil<I, R, L, S>
where
    I: InterpretationService,
    R: ReferenceDataService,
    L: LedgerService,
    S: ConversationStateService,
{
    handle_message_usecase: HandleMessageUsecaseImpl<I, R, L, S>,
    renderer: ReplyRenderer,
}

impl<I, R, L, S> ExpenseCaptureUtil<I, R, L, S>
where
    I: InterpretationService,
    R: ReferenceDataService,
    L: LedgerService,
    S: ConversationStateService,
{
    /// Fails only if the configuration is invalid (e.g. unknown currency).
    pub fn new(
        interpretation: I,
        reference_data: R,
        ledger: L,
        state_store: S,
        config: ExpenseCaptureConfig,
    ) -> Result<Self, ServerError> {
        let renderer = ReplyRenderer::new(config.currency()?);
        Ok(Self {
            handle_message_usecase: HandleMessageUsecaseImpl::new(
                interpretation,
                reference_data,
                ledger,
                state_store,
                config,
            ),
            renderer,
        })
    }

    pub async fn handle_message(
        &self,
        message: &InboundMessage,
    ) -> Result<DialogueReply, ServerError> {
        self.handle_message_usecase.handle_message(message).await
    }

    /// Default pt-BR wording of a reply.
    pub fn render(&self, reply: &DialogueReply) -> String {
        self.renderer.render(reply)
    }

    pub async fn handle_and_render(&self, message: &InboundMessage) -> Result<String, ServerError> {
        let reply = self.handle_message(message).await?;
        Ok(self.render(&reply))
    }
}

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::{
    config::ExpenseCaptureConfig,
    domain::repositories::{
        interpretation_repository::InterpretationRepository, ledger_repository::LedgerRepository,
    },
    entities::{
        CollectedFields, ConversationState, DialogueReply, ExpenseField, InboundMessage,
        Interpretation, InterpretedFields, OrgReferenceData, PaymentMethod, ReferenceItem, Turn,
        TurnRole, WaitingFor,
    },
};

use super::{
    finalizer::Finalizer,
    normalizer::{
        extract_amount, extract_card_and_installments, is_cancel_command, is_generic_description,
        looks_like_new_expense, match_payment_method, sentence_case,
    },
    reference_resolver::{
        infer_category, resolve_category, resolve_responsible, ReferenceResolver, Resolution,
    },
    synonyms::CategoryKeywordTable,
    utils::installment_cap,
};

/// What the caller must do with the stored conversation after a turn.
#[derive(Debug)]
pub(crate) enum StateChange {
    Save(ConversationState),
    Clear,
    Keep,
}

#[derive(Debug)]
pub(crate) struct TurnOutcome {
    pub(crate) reply: DialogueReply,
    pub(crate) state_change: StateChange,
}

impl TurnOutcome {
    fn new(reply: DialogueReply, state_change: StateChange) -> Self {
        Self {
            reply,
            state_change,
        }
    }
}

/// A candidate value that failed validation this turn.
#[derive(Debug)]
struct FieldProblem {
    field: ExpenseField,
    options: Vec<String>,
}

impl FieldProblem {
    fn into_reply(self) -> DialogueReply {
        DialogueReply::InvalidAnswer {
            field: self.field,
            options: self.options,
        }
    }
}

/// Runs one turn of the slot-filling state machine
/// (idle -> collecting -> finalizing -> idle) for a single inbound message.
pub(crate) struct DialogueController<'a, I, L>
where
    I: InterpretationRepository,
    L: LedgerRepository,
{
    interpreter: &'a I,
    ledger: &'a L,
    config: &'a ExpenseCaptureConfig,
    keywords: &'a CategoryKeywordTable,
    references: &'a OrgReferenceData,
    message: &'a InboundMessage,
    user_key: &'a str,
}

impl<'a, I, L> DialogueController<'a, I, L>
where
    I: InterpretationRepository,
    L: LedgerRepository,
{
    pub(crate) fn new(
        interpreter: &'a I,
        ledger: &'a L,
        config: &'a ExpenseCaptureConfig,
        keywords: &'a CategoryKeywordTable,
        references: &'a OrgReferenceData,
        message: &'a InboundMessage,
        user_key: &'a str,
    ) -> Self {
        Self {
            interpreter,
            ledger,
            config,
            keywords,
            references,
            message,
            user_key,
        }
    }

    pub(crate) async fn process(&self, pending: Option<ConversationState>) -> TurnOutcome {
        let text = self.message.text.as_str();

        if is_cancel_command(text) {
            return match pending {
                Some(_) => {
                    info!(user_key = %self.user_key, "conversation cancelled by user");
                    TurnOutcome::new(DialogueReply::Cancelled, StateChange::Clear)
                }
                None => TurnOutcome::new(DialogueReply::Rejected, StateChange::Keep),
            };
        }

        match pending {
            Some(state) if looks_like_new_expense(text) => {
                info!(
                    user_key = %self.user_key,
                    pending_field = ?state.pending_field(),
                    "new expense replaces pending conversation"
                );
                self.start(true).await
            }
            Some(state) => self.resume(state).await,
            None => self.start(false).await,
        }
    }

    // Transitions.
    // ---

    async fn start(&self, replaces_pending: bool) -> TurnOutcome {
        let text = self.message.text.as_str();
        let untouched = if replaces_pending {
            StateChange::Clear
        } else {
            StateChange::Keep
        };

        let (interpretation, failed) = match self
            .interpreter
            .interpret(text, &[], None, self.references, &self.message.user_name)
            .await
        {
            Ok(interpretation) => (interpretation, false),
            Err(e) => {
                warn!(user_key = %self.user_key, error = ?e, "interpretation failed on new message");
                (Interpretation::default(), true)
            }
        };
        if interpretation.rejected {
            debug!(user_key = %self.user_key, "message rejected as not an expense");
            return TurnOutcome::new(DialogueReply::Rejected, untouched);
        }

        let mut state = ConversationState::new(
            self.user_key,
            &self.message.org_id,
            self.message.received_at,
        );
        state.confidence = interpretation.confidence;
        state.push_turn(TurnRole::User, text, self.config.history_limit);

        let mut fields = interpretation.fields;
        if fields.amount.is_none() {
            fields.amount = extract_amount(text);
        }
        let problems = self.merge(&mut state, &fields, None);
        if state.collected == CollectedFields::default() {
            let reply = if failed {
                DialogueReply::Error
            } else {
                DialogueReply::Rejected
            };
            return TurnOutcome::new(reply, untouched);
        }

        info!(user_key = %self.user_key, "conversation started");
        self.advance(state, problems).await
    }

    async fn resume(&self, mut state: ConversationState) -> TurnOutcome {
        match state.waiting_for {
            Some(WaitingFor::CardInfo) => self.handle_card_info(state).await,
            Some(WaitingFor::Responsible) => self.handle_responsible(state).await,
            None if state.missing_fields.is_empty() => {
                // Everything was resolved before; only the commit failed.
                state.push_turn(
                    TurnRole::User,
                    self.message.text.as_str(),
                    self.config.history_limit,
                );
                self.finalize(state).await
            }
            None => self.collect(state).await,
        }
    }

    async fn collect(&self, mut state: ConversationState) -> TurnOutcome {
        let text = self.message.text.as_str();
        let pending_field = state.missing_fields.first().copied();
        let prior_turns: Vec<Turn> = state.history.iter().cloned().collect();

        let interpretation = match self
            .interpreter
            .interpret(
                text,
                &prior_turns,
                pending_field,
                self.references,
                &self.message.user_name,
            )
            .await
        {
            Ok(interpretation) if interpretation.rejected => {
                debug!(user_key = %self.user_key, "message rejected, pending conversation kept");
                return TurnOutcome::new(DialogueReply::Rejected, StateChange::Keep);
            }
            Ok(interpretation) => interpretation,
            Err(e) => {
                warn!(
                    user_key = %self.user_key,
                    field = ?pending_field,
                    error = ?e,
                    "interpretation failed, asking again"
                );
                let reply = pending_field
                    .map(|field| self.ask(field))
                    .unwrap_or(DialogueReply::Error);
                return TurnOutcome::new(reply, StateChange::Keep);
            }
        };

        state.confidence = state.confidence.max(interpretation.confidence);
        state.push_turn(TurnRole::User, text, self.config.history_limit);
        let problems = self.merge(&mut state, &interpretation.fields, pending_field);
        self.advance(state, problems).await
    }

    /// Recomputes missing fields and decides the next step. The credit
    /// branch preempts the regular field order.
    async fn advance(
        &self,
        mut state: ConversationState,
        mut problems: Vec<FieldProblem>,
    ) -> TurnOutcome {
        let is_credit = state
            .collected
            .payment_method
            .is_some_and(|m| m.is_credit());
        let installments_fit = state
            .collected
            .installments
            .map_or(true, |n| n <= self.max_installments_for(state.collected.amount));
        if !is_credit || !installments_fit {
            state.collected.card = None;
            state.collected.installments = None;
        }
        if is_credit && !installments_fit {
            problems.push(problem(ExpenseField::Installments, Vec::new()));
        }
        state.missing_fields = self.missing_fields(&state);

        if is_credit && state.collected.card.is_none() {
            state.waiting_for = Some(WaitingFor::CardInfo);
            let reply = take_problem(&mut problems, ExpenseField::Card)
                .or_else(|| take_problem(&mut problems, ExpenseField::Installments))
                .map(FieldProblem::into_reply)
                .unwrap_or_else(|| self.ask(ExpenseField::Card));
            debug!(user_key = %self.user_key, "credit payment, asking for card");
            return self.respond(state, reply);
        }

        state.waiting_for = None;
        match state.missing_fields.first().copied() {
            None => self.finalize(state).await,
            Some(field) => {
                let reply = take_problem(&mut problems, field)
                    .map(FieldProblem::into_reply)
                    .unwrap_or_else(|| self.ask(field));
                self.respond(state, reply)
            }
        }
    }

    async fn handle_card_info(&self, mut state: ConversationState) -> TurnOutcome {
        let text = self.message.text.as_str();
        state.push_turn(TurnRole::User, text, self.config.history_limit);

        let extracted = extract_card_and_installments(text);
        let Some(card_name) = extracted.card_name else {
            debug!(user_key = %self.user_key, "no card name in answer");
            let reply = DialogueReply::InvalidAnswer {
                field: ExpenseField::Card,
                options: Vec::new(),
            };
            return self.respond(state, reply);
        };

        match self.resolve_card(&card_name, extracted.installments, state.collected.amount) {
            Ok((card, installments)) => {
                state.collected.card = Some(card);
                state.collected.installments = Some(installments);
                state.waiting_for = None;
                self.after_sub_flow(state).await
            }
            Err(problem) => {
                debug!(user_key = %self.user_key, card = %card_name, "card not resolved");
                self.respond(state, problem.into_reply())
            }
        }
    }

    async fn handle_responsible(&self, mut state: ConversationState) -> TurnOutcome {
        let text = self.message.text.as_str();
        state.push_turn(TurnRole::User, text, self.config.history_limit);

        match resolve_responsible(
            text,
            &self.message.user_name,
            &self.references.cost_centers,
        ) {
            Resolution::Unique(responsible) => {
                state.collected.responsible = Some(responsible);
                state.waiting_for = None;
                self.after_sub_flow(state).await
            }
            Resolution::Ambiguous(items) => {
                let reply = DialogueReply::InvalidAnswer {
                    field: ExpenseField::Responsible,
                    options: names(&items),
                };
                self.respond(state, reply)
            }
            Resolution::NoMatch => {
                let reply = DialogueReply::InvalidAnswer {
                    field: ExpenseField::Responsible,
                    options: self.references.cost_center_names(),
                };
                self.respond(state, reply)
            }
        }
    }

    /// Collection resumes after a sub-flow; a missing responsible gets its
    /// own sub-flow so the next answer skips interpretation.
    async fn after_sub_flow(&self, mut state: ConversationState) -> TurnOutcome {
        state.missing_fields = self.missing_fields(&state);
        match state.missing_fields.first().copied() {
            None => self.finalize(state).await,
            Some(ExpenseField::Responsible) => {
                state.waiting_for = Some(WaitingFor::Responsible);
                let reply = self.ask(ExpenseField::Responsible);
                self.respond(state, reply)
            }
            Some(field) => {
                let reply = self.ask(field);
                self.respond(state, reply)
            }
        }
    }

    async fn finalize(&self, mut state: ConversationState) -> TurnOutcome {
        let date = self.config.local_date(self.message.received_at);
        let finalizer = Finalizer::new(self.ledger, self.config, self.keywords);
        match finalizer.finalize(&state, self.references, date).await
        {
            Ok(expense) => {
                info!(
                    user_key = %self.user_key,
                    amount = %expense.amount,
                    installments = ?expense.installments,
                    "expense finalized"
                );
                TurnOutcome::new(DialogueReply::Confirmed(expense), StateChange::Clear)
            }
            Err(e) => {
                warn!(user_key = %self.user_key, error = ?e, "finalization failed, conversation kept");
                state.missing_fields.clear();
                state.waiting_for = None;
                self.respond(state, DialogueReply::Error)
            }
        }
    }

    // Field handling.
    // ---

    /// Applies every value the interpretation offers, not only the one being
    /// asked. Values for fields that are already filled are ignored unless
    /// that field is the pending one.
    fn merge(
        &self,
        state: &mut ConversationState,
        fields: &InterpretedFields,
        pending: Option<ExpenseField>,
    ) -> Vec<FieldProblem> {
        let text = self.message.text.as_str();
        let direct_answer = *fields == InterpretedFields::default();
        let candidate = |field: ExpenseField| -> Option<String> {
            fields
                .text_for(field)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| (direct_answer && pending == Some(field)).then(|| text.to_string()))
        };
        let fillable = |field: ExpenseField, present: bool| pending == Some(field) || !present;
        let collected = &mut state.collected;
        let mut problems = Vec::new();

        if fillable(ExpenseField::Amount, collected.amount.is_some()) {
            let amount = fields
                .amount
                .filter(|a| a.is_sign_positive() && !a.is_zero())
                .or_else(|| {
                    (pending == Some(ExpenseField::Amount))
                        .then(|| extract_amount(text))
                        .flatten()
                });
            match amount {
                Some(amount) => collected.amount = Some(amount),
                None if pending == Some(ExpenseField::Amount) => {
                    problems.push(problem(ExpenseField::Amount, Vec::new()))
                }
                None => {}
            }
        }

        let has_description = collected
            .description
            .as_deref()
            .is_some_and(|d| !is_generic_description(d));
        if fillable(ExpenseField::Description, has_description) {
            match candidate(ExpenseField::Description) {
                Some(d) if !is_generic_description(&d) => {
                    collected.description = Some(sentence_case(&d))
                }
                Some(_) if pending == Some(ExpenseField::Description) => {
                    problems.push(problem(ExpenseField::Description, Vec::new()))
                }
                _ => {}
            }
        }

        if fillable(ExpenseField::PaymentMethod, collected.payment_method.is_some()) {
            match candidate(ExpenseField::PaymentMethod)
                .as_deref()
                .map(match_payment_method)
            {
                Some(Some(method)) => {
                    if collected.payment_method != Some(method) {
                        collected.card = None;
                        collected.installments = None;
                    }
                    collected.payment_method = Some(method);
                }
                Some(None) => problems.push(problem(ExpenseField::PaymentMethod, Vec::new())),
                None => {}
            }
        }

        if collected.payment_method == Some(PaymentMethod::Credit) && collected.card.is_none() {
            let card_name = fields
                .card
                .as_deref()
                .and_then(|c| extract_card_and_installments(c).card_name);
            if let Some(card_name) = card_name {
                let installments = fields.installments.unwrap_or_else(|| {
                    fields
                        .card
                        .as_deref()
                        .map(|c| extract_card_and_installments(c).installments)
                        .unwrap_or(1)
                });
                match self.resolve_card(&card_name, installments, collected.amount) {
                    Ok((card, installments)) => {
                        collected.card = Some(card);
                        collected.installments = Some(installments);
                    }
                    Err(p) => problems.push(p),
                }
            }
        }

        if fillable(ExpenseField::Responsible, collected.responsible.is_some()) {
            if let Some(c) = candidate(ExpenseField::Responsible) {
                match resolve_responsible(
                    &c,
                    &self.message.user_name,
                    &self.references.cost_centers,
                ) {
                    Resolution::Unique(responsible) => collected.responsible = Some(responsible),
                    Resolution::Ambiguous(items) => {
                        problems.push(problem(ExpenseField::Responsible, names(&items)))
                    }
                    Resolution::NoMatch => problems.push(problem(
                        ExpenseField::Responsible,
                        self.references.cost_center_names(),
                    )),
                }
            }
        }

        if fillable(ExpenseField::Category, collected.category.is_some()) {
            if let Some(c) = candidate(ExpenseField::Category) {
                match resolve_category(&c, &self.references.categories, self.keywords) {
                    Resolution::Unique(category) => collected.category = Some(category),
                    Resolution::Ambiguous(items) => {
                        problems.push(problem(ExpenseField::Category, names(&items)))
                    }
                    Resolution::NoMatch if pending == Some(ExpenseField::Category) => problems
                        .push(problem(
                            ExpenseField::Category,
                            self.references.category_names(),
                        )),
                    Resolution::NoMatch => {}
                }
            }
        }

        problems
    }

    fn resolve_card(
        &self,
        card_name: &str,
        installments: u32,
        amount: Option<Decimal>,
    ) -> Result<(ReferenceItem, u32), FieldProblem> {
        let installments = installments.max(1);
        if installments > self.max_installments_for(amount) {
            return Err(problem(ExpenseField::Installments, Vec::new()));
        }
        match ReferenceResolver::new(&self.references.cards).resolve(card_name) {
            Resolution::Unique(card) => Ok((card, installments)),
            Resolution::Ambiguous(items) => Err(problem(ExpenseField::Card, names(&items))),
            Resolution::NoMatch => Err(problem(
                ExpenseField::Card,
                self.references.card_names(),
            )),
        }
    }

    fn max_installments_for(&self, amount: Option<Decimal>) -> u32 {
        let max = self.config.max_installments;
        amount.map_or(max, |a| installment_cap(a, max))
    }

    /// Required fields still open, in asking order. The category is only
    /// required when the interpretation was unsure and nothing can be
    /// inferred from the description.
    fn missing_fields(&self, state: &ConversationState) -> Vec<ExpenseField> {
        let collected = &state.collected;
        ExpenseField::REQUIRED_ORDER
            .into_iter()
            .filter(|field| match field {
                ExpenseField::Amount => collected.amount.is_none(),
                ExpenseField::Description => collected
                    .description
                    .as_deref()
                    .map_or(true, is_generic_description),
                ExpenseField::PaymentMethod => collected.payment_method.is_none(),
                ExpenseField::Responsible => collected.responsible.is_none(),
                // Asked only when the interpretation was unsure AND the
                // description gives no keyword. A lone signal is left to the
                // default category at finalization.
                ExpenseField::Category => {
                    collected.category.is_none()
                        && !self.references.categories.is_empty()
                        && state.confidence < self.config.low_confidence_threshold
                        && collected
                            .description
                            .as_deref()
                            .and_then(|d| {
                                infer_category(d, &self.references.categories, self.keywords)
                            })
                            .is_none()
                }
                ExpenseField::Card | ExpenseField::Installments => false,
            })
            .collect()
    }

    fn ask(&self, field: ExpenseField) -> DialogueReply {
        let options = match field {
            ExpenseField::Card => self.references.card_names(),
            ExpenseField::Category => self.references.category_names(),
            ExpenseField::Responsible => self.references.cost_center_names(),
            _ => Vec::new(),
        };
        DialogueReply::AskField { field, options }
    }

    fn respond(&self, mut state: ConversationState, reply: DialogueReply) -> TurnOutcome {
        state.push_turn(
            TurnRole::Assistant,
            reply.summary(),
            self.config.history_limit,
        );
        TurnOutcome::new(reply, StateChange::Save(state))
    }
}

fn problem(field: ExpenseField, options: Vec<String>) -> FieldProblem {
    FieldProblem { field, options }
}

fn take_problem(problems: &mut Vec<FieldProblem>, field: ExpenseField) -> Option<FieldProblem> {
    let index = problems.iter().position(|p| p.field == field)?;
    Some(problems.remove(index))
}

fn names(items: &[ReferenceItem]) -> Vec<String> {
    items.iter().map(|i| i.name.clone()).collect()
}

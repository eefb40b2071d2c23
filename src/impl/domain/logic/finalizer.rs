use chrono::NaiveDate;
use fractic_server_error::{CriticalError, ServerError};

use crate::{
    config::ExpenseCaptureConfig,
    domain::repositories::ledger_repository::{LedgerPlan, LedgerRepository},
    entities::{
        CollectedFields, ConversationState, ExpenseField, LedgerRecord, OrgReferenceData,
        ReferenceItem, ResolvedExpense,
    },
    errors::{
        CardOnNonCreditExpense, CreditExpenseWithoutCard, IncompleteExpense, InvalidInstallments,
        NonPositiveAmount,
    },
};

use super::{
    normalizer::{canonicalize, is_generic_description, sentence_case},
    reference_resolver::{default_category, infer_category},
    synonyms::CategoryKeywordTable,
    utils::{add_months, installment_cap, split_installments},
};

/// Turns a complete slot set into ledger records and commits them once.
pub(crate) struct Finalizer<'a, L: LedgerRepository> {
    ledger: &'a L,
    config: &'a ExpenseCaptureConfig,
    keywords: &'a CategoryKeywordTable,
}

impl<'a, L: LedgerRepository> Finalizer<'a, L> {
    pub(crate) fn new(
        ledger: &'a L,
        config: &'a ExpenseCaptureConfig,
        keywords: &'a CategoryKeywordTable,
    ) -> Self {
        Self {
            ledger,
            config,
            keywords,
        }
    }

    /// Nothing is written unless every invariant holds. On error the caller
    /// keeps the conversation as it is.
    pub(crate) async fn finalize(
        &self,
        state: &ConversationState,
        references: &OrgReferenceData,
        date: NaiveDate,
    ) -> Result<ResolvedExpense, ServerError> {
        let expense = self.resolve(&state.collected, references, date)?;
        let plan = build_plan(&expense, state)?;
        self.ledger.commit(plan).await?;
        Ok(expense)
    }

    pub(crate) fn resolve(
        &self,
        collected: &CollectedFields,
        references: &OrgReferenceData,
        date: NaiveDate,
    ) -> Result<ResolvedExpense, ServerError> {
        let amount = collected
            .amount
            .ok_or_else(|| IncompleteExpense::new(ExpenseField::Amount))?;
        if amount.is_sign_negative() || amount.is_zero() {
            return Err(NonPositiveAmount::new(&amount.to_string()));
        }
        let description = collected
            .description
            .as_deref()
            .filter(|d| !is_generic_description(d))
            .map(sentence_case)
            .ok_or_else(|| IncompleteExpense::new(ExpenseField::Description))?;
        let payment_method = collected
            .payment_method
            .ok_or_else(|| IncompleteExpense::new(ExpenseField::PaymentMethod))?;
        let responsible = collected
            .responsible
            .clone()
            .ok_or_else(|| IncompleteExpense::new(ExpenseField::Responsible))?;

        let (card, installments) = if payment_method.is_credit() {
            let (Some(card), Some(installments)) = (&collected.card, collected.installments)
            else {
                return Err(CreditExpenseWithoutCard::new());
            };
            let cap = installment_cap(amount, self.config.max_installments);
            if installments == 0 || installments > cap {
                return Err(InvalidInstallments::new(installments));
            }
            (Some(card.clone()), Some(installments))
        } else {
            if collected.card.is_some() || collected.installments.is_some() {
                return Err(CardOnNonCreditExpense::new(payment_method));
            }
            (None, None)
        };

        let category = self.resolve_category(collected.category.as_ref(), &description, references);

        Ok(ResolvedExpense {
            amount,
            description,
            category,
            payment_method,
            responsible,
            card,
            installments,
            date,
        })
    }

    /// Exact match on the collected name, then keyword inference from the
    /// description, then the default category. `None` is acceptable.
    fn resolve_category(
        &self,
        collected: Option<&ReferenceItem>,
        description: &str,
        references: &OrgReferenceData,
    ) -> Option<ReferenceItem> {
        let categories = &references.categories;
        collected
            .and_then(|c| {
                let wanted = canonicalize(&c.name);
                categories
                    .iter()
                    .find(|item| canonicalize(&item.name) == wanted)
                    .cloned()
            })
            .or_else(|| infer_category(description, categories, self.keywords))
            .or_else(|| {
                default_category(categories, self.config.default_category_name.as_deref())
            })
    }
}

/// Records are a pure function of the expense and the conversation, so a
/// retried commit repeats the exact same rows.
pub(crate) fn build_plan(
    expense: &ResolvedExpense,
    state: &ConversationState,
) -> Result<LedgerPlan, ServerError> {
    let count = expense.installments.unwrap_or(1);
    let record = |amount, number, correlation_id, date| LedgerRecord {
        org_id: state.org_id.clone(),
        user_key: state.user_key.clone(),
        amount,
        total_amount: expense.amount,
        description: expense.description.clone(),
        category_id: expense.category.as_ref().map(|c| c.id.clone()),
        payment_method: expense.payment_method,
        cost_center_id: expense.responsible.cost_center_id().map(str::to_string),
        shared: expense.responsible.is_shared(),
        card_id: expense.card.as_ref().map(|c| c.id.clone()),
        installment_number: number,
        installment_count: count,
        conversation_id: state.conversation_id,
        correlation_id,
        date,
        settled: true,
    };

    if !expense.payment_method.is_credit() || count <= 1 {
        return Ok(LedgerPlan::Single(record(expense.amount, 1, None, expense.date)));
    }

    let correlation_id = Some(state.conversation_id);
    let mut records = split_installments(expense.amount, count)
        .into_iter()
        .enumerate()
        .map(|(i, amount)| -> Result<LedgerRecord, ServerError> {
            let date = add_months(expense.date, i as u32)?;
            Ok(record(amount, i as u32 + 1, correlation_id, date))
        })
        .collect::<Result<Vec<_>, ServerError>>()?
        .into_iter();
    let parent = records.next().ok_or_else(|| {
        CriticalError::with_debug(
            "installment series unexpectedly empty",
            &count,
        )
    })?;
    Ok(LedgerPlan::Series {
        parent,
        children: records.collect(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::*;
    use crate::entities::{PaymentMethod, Responsible};

    #[derive(Default)]
    struct RecordingLedger {
        plans: Mutex<Vec<LedgerPlan>>,
        fail: bool,
    }

    #[async_trait]
    impl LedgerRepository for RecordingLedger {
        async fn commit(&self, plan: LedgerPlan) -> Result<(), ServerError> {
            if self.fail {
                return Err(crate::errors::LedgerCommitFailed::new());
            }
            self.plans.lock().unwrap().push(plan);
            Ok(())
        }
    }

    fn references() -> OrgReferenceData {
        OrgReferenceData {
            categories: vec![
                ReferenceItem::new("cat-food", "Alimentação"),
                ReferenceItem::new("cat-fun", "Lazer"),
                ReferenceItem::new("cat-other", "Outros"),
            ],
            cost_centers: vec![ReferenceItem::new("cc-ana", "Ana Souza")],
            cards: vec![ReferenceItem::new("card-nu", "Nubank")],
        }
    }

    fn collected(payment_method: PaymentMethod) -> CollectedFields {
        CollectedFields {
            amount: Some(Decimal::new(100, 0)),
            description: Some("mercado".to_string()),
            category: None,
            payment_method: Some(payment_method),
            responsible: Some(Responsible::Specific(ReferenceItem::new("cc-ana", "Ana Souza"))),
            card: None,
            installments: None,
        }
    }

    fn state(collected: CollectedFields) -> ConversationState {
        let mut state = ConversationState::new("5511", "org", chrono::Utc::now());
        state.collected = collected;
        state
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
    }

    #[tokio::test]
    async fn single_record_with_inferred_category() {
        let ledger = RecordingLedger::default();
        let config = ExpenseCaptureConfig::default();
        let keywords = CategoryKeywordTable::new(&config);
        let finalizer = Finalizer::new(&ledger, &config, &keywords);

        let conversation = state(collected(PaymentMethod::Pix));
        let expense = finalizer
            .finalize(&conversation, &references(), today())
            .await
            .unwrap();
        assert_eq!(expense.description, "Mercado");
        assert_eq!(expense.category.map(|c| c.id), Some("cat-food".to_string()));

        let plans = ledger.plans.lock().unwrap();
        assert_eq!(plans.len(), 1);
        let LedgerPlan::Single(record) = &plans[0] else {
            panic!("expected a single record");
        };
        assert_eq!(record.amount, Decimal::new(100, 0));
        assert_eq!(record.cost_center_id.as_deref(), Some("cc-ana"));
        assert!(!record.shared);
        assert!(record.settled);
        assert_eq!(record.conversation_id, conversation.conversation_id);
        assert_eq!(record.correlation_id, None);
    }

    #[tokio::test]
    async fn category_falls_back_to_default_then_none() {
        let ledger = RecordingLedger::default();
        let config = ExpenseCaptureConfig::default();
        let keywords = CategoryKeywordTable::new(&config);
        let finalizer = Finalizer::new(&ledger, &config, &keywords);

        let mut fields = collected(PaymentMethod::Cash);
        fields.description = Some("presente da Maria".to_string());
        let expense = finalizer.resolve(&fields, &references(), today()).unwrap();
        assert_eq!(expense.category.map(|c| c.id), Some("cat-other".to_string()));

        let mut no_default = references();
        no_default.categories.retain(|c| c.id != "cat-other");
        let expense = finalizer.resolve(&fields, &no_default, today()).unwrap();
        assert_eq!(expense.category, None);
    }

    #[tokio::test]
    async fn collected_category_is_rematched_by_name() {
        let ledger = RecordingLedger::default();
        let config = ExpenseCaptureConfig::default();
        let keywords = CategoryKeywordTable::new(&config);
        let finalizer = Finalizer::new(&ledger, &config, &keywords);

        let mut fields = collected(PaymentMethod::Pix);
        fields.category = Some(ReferenceItem::new("stale-id", "LAZER"));
        let expense = finalizer.resolve(&fields, &references(), today()).unwrap();
        assert_eq!(expense.category.map(|c| c.id), Some("cat-fun".to_string()));
    }

    #[tokio::test]
    async fn credit_installments_build_a_linked_series() {
        let ledger = RecordingLedger::default();
        let config = ExpenseCaptureConfig::default();
        let keywords = CategoryKeywordTable::new(&config);
        let finalizer = Finalizer::new(&ledger, &config, &keywords);

        let mut fields = collected(PaymentMethod::Credit);
        fields.card = Some(ReferenceItem::new("card-nu", "Nubank"));
        fields.installments = Some(3);
        let conversation = state(fields);
        finalizer
            .finalize(&conversation, &references(), today())
            .await
            .unwrap();

        let plans = ledger.plans.lock().unwrap();
        let LedgerPlan::Series { parent, children } = &plans[0] else {
            panic!("expected an installment series");
        };
        assert_eq!(children.len(), 2);
        assert_eq!(parent.installment_number, 1);
        assert_eq!(parent.amount, Decimal::new(3334, 2));
        assert_eq!(parent.date, today());
        assert_eq!(parent.correlation_id, Some(conversation.conversation_id));
        assert_eq!(children[0].date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(children[1].date, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        for child in children {
            assert_eq!(child.correlation_id, parent.correlation_id);
            assert_eq!(child.conversation_id, conversation.conversation_id);
            assert_eq!(child.installment_count, 3);
            assert_eq!(child.card_id.as_deref(), Some("card-nu"));
            assert!(child.settled);
        }
    }

    #[tokio::test]
    async fn credit_with_single_installment_is_one_record() {
        let mut fields = collected(PaymentMethod::Credit);
        fields.card = Some(ReferenceItem::new("card-nu", "Nubank"));
        fields.installments = Some(1);
        let config = ExpenseCaptureConfig::default();
        let keywords = CategoryKeywordTable::new(&config);
        let ledger = RecordingLedger::default();
        let expense = Finalizer::new(&ledger, &config, &keywords)
            .resolve(&fields, &references(), today())
            .unwrap();
        assert!(matches!(
            build_plan(&expense, &state(fields)).unwrap(),
            LedgerPlan::Single(LedgerRecord {
                installment_count: 1,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn refuses_to_break_invariants() {
        let ledger = RecordingLedger::default();
        let config = ExpenseCaptureConfig::default();
        let keywords = CategoryKeywordTable::new(&config);
        let finalizer = Finalizer::new(&ledger, &config, &keywords);

        // Credit without a card.
        let fields = collected(PaymentMethod::Credit);
        assert!(finalizer
            .finalize(&state(fields), &references(), today())
            .await
            .is_err());

        // Card on a non-credit expense.
        let mut fields = collected(PaymentMethod::Debit);
        fields.card = Some(ReferenceItem::new("card-nu", "Nubank"));
        assert!(finalizer.resolve(&fields, &references(), today()).is_err());

        // Missing responsible.
        let mut fields = collected(PaymentMethod::Pix);
        fields.responsible = None;
        assert!(finalizer.resolve(&fields, &references(), today()).is_err());

        // More installments than cents.
        let mut fields = collected(PaymentMethod::Credit);
        fields.amount = Some(Decimal::new(2, 2));
        fields.card = Some(ReferenceItem::new("card-nu", "Nubank"));
        fields.installments = Some(3);
        assert!(finalizer.resolve(&fields, &references(), today()).is_err());

        // Generic description.
        let mut fields = collected(PaymentMethod::Pix);
        fields.description = Some("despesa".to_string());
        assert!(finalizer.resolve(&fields, &references(), today()).is_err());

        assert!(ledger.plans.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn commit_failure_is_reported() {
        let ledger = RecordingLedger {
            fail: true,
            ..Default::default()
        };
        let config = ExpenseCaptureConfig::default();
        let keywords = CategoryKeywordTable::new(&config);
        let finalizer = Finalizer::new(&ledger, &config, &keywords);
        assert!(finalizer
            .finalize(&state(collected(PaymentMethod::Pix)), &references(), today())
            .await
            .is_err());
    }
}

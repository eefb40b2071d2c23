use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use fractic_expense_capture::{
    config::ExpenseCaptureConfig,
    datasources::InMemoryConversationStateService,
    entities::{
        ConversationState, ConversationStateService, DialogueReply, ExpenseField, InboundMessage,
        InterpretationRequest, InterpretationService, LedgerRecord, LedgerService, PaymentMethod,
        ReferenceDataService, ReferenceItem, Responsible, StoredConversation, WaitingFor,
    },
    errors::{LedgerCommitFailed, ReferenceDataUnavailable},
    util::ExpenseCaptureUtil,
};
use fractic_server_error::{CriticalError, ServerError};
use rust_decimal::Decimal;

// Fakes.
// ---

/// Replays canned JSON answers; an exhausted script answers `{}`.
#[derive(Clone, Default)]
struct ScriptedInterpretation {
    answers: Arc<Mutex<VecDeque<String>>>,
    requests: Arc<Mutex<Vec<InterpretationRequest>>>,
    delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedInterpretation {
    fn then(&self, answer: &str) {
        self.answers.lock().unwrap().push_back(answer.to_string());
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> InterpretationRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl InterpretationService for ScriptedInterpretation {
    async fn interpret(&self, request: &InterpretationRequest) -> Result<String, ServerError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.requests.lock().unwrap().push(request.clone());
        let answer = self.answers.lock().unwrap().pop_front();
        Ok(answer.unwrap_or_else(|| "{}".to_string()))
    }
}

#[derive(Clone, Default)]
struct Directory {
    down: Arc<AtomicBool>,
}

impl Directory {
    fn check(&self, org_id: &str) -> Result<(), ServerError> {
        if self.down.load(Ordering::SeqCst) {
            Err(ReferenceDataUnavailable::new(org_id))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ReferenceDataService for Directory {
    async fn list_categories(&self, org_id: &str) -> Result<Vec<ReferenceItem>, ServerError> {
        self.check(org_id)?;
        Ok(vec![
            ReferenceItem::new("cat-food", "Alimentação"),
            ReferenceItem::new("cat-health", "Saúde"),
            ReferenceItem::new("cat-fun", "Lazer"),
            ReferenceItem::new("cat-other", "Outros"),
        ])
    }

    async fn list_cost_centers(&self, org_id: &str) -> Result<Vec<ReferenceItem>, ServerError> {
        self.check(org_id)?;
        Ok(vec![
            ReferenceItem::new("cc-ana", "Ana Souza"),
            ReferenceItem::new("cc-fs", "Felipe Silva"),
            ReferenceItem::new("cc-fc", "Felipe Costa"),
        ])
    }

    async fn list_active_cards(&self, org_id: &str) -> Result<Vec<ReferenceItem>, ServerError> {
        self.check(org_id)?;
        Ok(vec![
            ReferenceItem::new("card-nu", "Nubank"),
            ReferenceItem::new("card-itau", "Itaú"),
        ])
    }
}

#[derive(Clone, Default)]
struct RecordingLedger {
    singles: Arc<Mutex<Vec<LedgerRecord>>>,
    series: Arc<Mutex<Vec<(LedgerRecord, Vec<LedgerRecord>)>>>,
    down: Arc<AtomicBool>,
}

impl RecordingLedger {
    fn commits(&self) -> usize {
        self.singles.lock().unwrap().len() + self.series.lock().unwrap().len()
    }
}

#[async_trait]
impl LedgerService for RecordingLedger {
    async fn commit_expense(&self, record: LedgerRecord) -> Result<(), ServerError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(LedgerCommitFailed::new());
        }
        self.singles.lock().unwrap().push(record);
        Ok(())
    }

    async fn commit_installment_series(
        &self,
        parent: LedgerRecord,
        children: Vec<LedgerRecord>,
    ) -> Result<(), ServerError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(LedgerCommitFailed::new());
        }
        self.series.lock().unwrap().push((parent, children));
        Ok(())
    }
}

#[derive(Clone, Default)]
struct SharedStore {
    inner: Arc<InMemoryConversationStateService>,
    /// Number of upcoming deletes that fail.
    failing_deletes: Arc<AtomicUsize>,
}

#[async_trait]
impl ConversationStateService for SharedStore {
    async fn load(&self, user_key: &str) -> Result<Option<StoredConversation>, ServerError> {
        self.inner.load(user_key).await
    }

    async fn upsert(
        &self,
        record: StoredConversation,
        expected_version: Option<u64>,
    ) -> Result<(), ServerError> {
        self.inner.upsert(record, expected_version).await
    }

    async fn delete(&self, user_key: &str) -> Result<(), ServerError> {
        let failing = self
            .failing_deletes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(CriticalError::with_debug("state store unavailable", &user_key));
        }
        self.inner.delete(user_key).await
    }
}

// Harness.
// ---

const USER_KEY: &str = "5511999990000";

struct Harness {
    util: ExpenseCaptureUtil<ScriptedInterpretation, Directory, RecordingLedger, SharedStore>,
    interpretation: ScriptedInterpretation,
    directory: Directory,
    ledger: RecordingLedger,
    store: SharedStore,
}

impl Harness {
    fn new() -> Self {
        Self::with_interpretation(ScriptedInterpretation::default())
    }

    fn with_interpretation(interpretation: ScriptedInterpretation) -> Self {
        let directory = Directory::default();
        let ledger = RecordingLedger::default();
        let store = SharedStore::default();
        let util = ExpenseCaptureUtil::new(
            interpretation.clone(),
            directory.clone(),
            ledger.clone(),
            store.clone(),
            ExpenseCaptureConfig::default(),
        )
        .unwrap();
        Self {
            util,
            interpretation,
            directory,
            ledger,
            store,
        }
    }

    async fn say(&self, text: &str) -> DialogueReply {
        self.say_as("whatsapp:+55 11 99999-0000", text).await
    }

    async fn say_as(&self, user_id: &str, text: &str) -> DialogueReply {
        self.try_say_as(user_id, text).await.unwrap()
    }

    async fn try_say_as(&self, user_id: &str, text: &str) -> Result<DialogueReply, ServerError> {
        let message = InboundMessage::new(
            user_id,
            "Ana Souza",
            "org-1",
            text,
            Utc.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap(),
        );
        self.util.handle_message(&message).await
    }

    async fn stored(&self) -> Option<StoredConversation> {
        self.store.load(USER_KEY).await.unwrap()
    }

    async fn pending(&self) -> Option<ConversationState> {
        self.stored()
            .await
            .map(|row| serde_json::from_str(&row.blob).unwrap())
    }
}

fn ask(field: ExpenseField, options: &[&str]) -> DialogueReply {
    DialogueReply::AskField {
        field,
        options: options.iter().map(|o| o.to_string()).collect(),
    }
}

fn invalid(field: ExpenseField, options: &[&str]) -> DialogueReply {
    DialogueReply::InvalidAnswer {
        field,
        options: options.iter().map(|o| o.to_string()).collect(),
    }
}

const PEOPLE: &[&str] = &["Ana Souza", "Felipe Silva", "Felipe Costa"];
const CARDS: &[&str] = &["Nubank", "Itaú"];

fn ana() -> Responsible {
    Responsible::Specific(ReferenceItem::new("cc-ana", "Ana Souza"))
}

// Scenarios.
// ---

#[tokio::test]
async fn fields_are_asked_in_order_until_the_expense_is_complete() {
    let h = Harness::new();
    h.interpretation
        .then(r#"{"fields": {"amount": 50, "description": "mercado"}, "confidence": 0.9}"#);
    assert_eq!(
        h.say("Gastei 50 no mercado").await,
        ask(ExpenseField::PaymentMethod, &[])
    );

    h.interpretation
        .then(r#"{"fields": {"payment_method": "pix"}, "confidence": 0.9}"#);
    assert_eq!(h.say("pix").await, ask(ExpenseField::Responsible, PEOPLE));
    assert_eq!(
        h.interpretation.last_request().pending_field,
        Some(ExpenseField::PaymentMethod)
    );

    let reply = h.say("eu").await;
    let DialogueReply::Confirmed(expense) = &reply else {
        panic!("expected confirmation, got {reply:?}");
    };
    assert_eq!(expense.amount, Decimal::new(50, 0));
    assert_eq!(expense.description, "Mercado");
    assert_eq!(expense.payment_method, PaymentMethod::Pix);
    assert_eq!(expense.responsible, ana());
    assert!(h
        .util
        .render(&reply)
        .starts_with("Gasto registrado: R$ 50,00 - Mercado (Alimentação)"));

    let singles = h.ledger.singles.lock().unwrap();
    assert_eq!(singles.len(), 1);
    assert_eq!(singles[0].cost_center_id.as_deref(), Some("cc-ana"));
    assert_eq!(singles[0].category_id.as_deref(), Some("cat-food"));
    assert_eq!(singles[0].user_key, USER_KEY);
    assert_eq!(singles[0].date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
    drop(singles);
    assert!(h.stored().await.is_none());
}

#[tokio::test]
async fn complete_message_is_finalized_in_one_turn() {
    let h = Harness::new();
    h.interpretation.then(
        r#"{"fields": {"amount": "80", "description": "farmácia", "payment_method": "pix",
            "responsible": "eu"}, "confidence": 0.95}"#,
    );
    let reply = h.say("80 farmácia, pix, eu").await;
    let DialogueReply::Confirmed(expense) = reply else {
        panic!("expected confirmation, got {reply:?}");
    };
    assert_eq!(expense.category.map(|c| c.id), Some("cat-health".to_string()));
    assert_eq!(h.interpretation.request_count(), 1);
    assert_eq!(h.ledger.commits(), 1);
}

#[tokio::test]
async fn credit_payment_asks_for_card_before_responsible() {
    let h = Harness::new();
    h.interpretation.then(
        r#"{"fields": {"amount": 120, "description": "cinema", "payment_method": "crédito"},
            "confidence": 0.9}"#,
    );
    assert_eq!(h.say("120 cinema no crédito").await, ask(ExpenseField::Card, CARDS));

    let pending = h.pending().await.unwrap();
    assert_eq!(pending.waiting_for, Some(WaitingFor::CardInfo));
    assert_eq!(pending.missing_fields, vec![ExpenseField::Responsible]);
}

#[tokio::test]
async fn unknown_card_is_asked_again_with_valid_names() {
    let h = Harness::new();
    h.interpretation.then(
        r#"{"fields": {"amount": 120, "description": "cinema", "payment_method": "credito"},
            "confidence": 0.9}"#,
    );
    h.say("120 cinema no crédito").await;

    assert_eq!(h.say("Latam 3x").await, invalid(ExpenseField::Card, CARDS));
    assert_eq!(
        h.pending().await.unwrap().waiting_for,
        Some(WaitingFor::CardInfo)
    );

    assert_eq!(
        h.say("nubank em 3x").await,
        ask(ExpenseField::Responsible, PEOPLE)
    );
    assert!(matches!(h.say("eu").await, DialogueReply::Confirmed(_)));

    let series = h.ledger.series.lock().unwrap();
    let [(parent, children)] = &series[..] else {
        panic!("expected one installment series");
    };
    assert_eq!(parent.amount, Decimal::new(40, 0));
    assert_eq!(parent.total_amount, Decimal::new(120, 0));
    assert_eq!(parent.card_id.as_deref(), Some("card-nu"));
    assert_eq!(children.len(), 2);
    assert!(parent.correlation_id.is_some());
    assert!(children
        .iter()
        .all(|c| c.correlation_id == parent.correlation_id));
    assert_eq!(
        children.iter().map(|c| c.date).collect::<Vec<_>>(),
        vec![
            NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
        ]
    );
    assert_eq!(
        children
            .iter()
            .map(|c| c.installment_number)
            .collect::<Vec<_>>(),
        vec![2, 3]
    );
    // Only the opening message went through interpretation.
    assert_eq!(h.interpretation.request_count(), 1);
}

#[tokio::test]
async fn rejected_message_does_not_touch_pending_conversation() {
    let h = Harness::new();
    h.interpretation.then(r#"{"rejected": true}"#);
    assert_eq!(h.say("bom dia").await, DialogueReply::Rejected);
    assert!(h.stored().await.is_none());

    h.interpretation
        .then(r#"{"fields": {"amount": 50, "description": "mercado"}, "confidence": 0.9}"#);
    h.say("Gastei 50 no mercado").await;
    let before = h.stored().await.unwrap();

    h.interpretation.then(r#"{"rejected": true}"#);
    assert_eq!(h.say("bom dia").await, DialogueReply::Rejected);
    assert_eq!(h.stored().await.unwrap(), before);
}

#[tokio::test]
async fn ambiguous_responsible_offers_both_candidates() {
    let h = Harness::new();
    h.interpretation.then(
        r#"{"fields": {"amount": 40, "description": "uber", "payment_method": "pix"},
            "confidence": 0.9}"#,
    );
    assert_eq!(
        h.say("Gastei 40 no uber no pix").await,
        ask(ExpenseField::Responsible, PEOPLE)
    );

    h.interpretation
        .then(r#"{"fields": {"responsible": "Felipe"}, "confidence": 0.9}"#);
    assert_eq!(
        h.say("Felipe").await,
        invalid(ExpenseField::Responsible, &["Felipe Silva", "Felipe Costa"])
    );

    h.interpretation
        .then(r#"{"fields": {"responsible": "Felipe Costa"}, "confidence": 0.9}"#);
    let DialogueReply::Confirmed(expense) = h.say("Felipe Costa").await else {
        panic!("expected confirmation");
    };
    assert_eq!(
        expense.responsible,
        Responsible::Specific(ReferenceItem::new("cc-fc", "Felipe Costa"))
    );
}

// Invariants.
// ---

#[tokio::test]
async fn confirmed_conversation_is_never_finalized_twice() {
    let h = Harness::new();
    h.interpretation.then(
        r#"{"fields": {"amount": 80, "description": "farmácia", "payment_method": "pix",
            "responsible": "eu"}, "confidence": 0.95}"#,
    );
    assert!(matches!(
        h.say("80 farmácia, pix, eu").await,
        DialogueReply::Confirmed(_)
    ));

    assert_eq!(h.say("ok").await, DialogueReply::Rejected);
    assert_eq!(h.ledger.commits(), 1);
    assert!(h.stored().await.is_none());
}

#[tokio::test]
async fn new_expense_discards_pending_conversation() {
    let h = Harness::new();
    h.interpretation
        .then(r#"{"fields": {"amount": 50, "description": "mercado"}, "confidence": 0.9}"#);
    h.say("Gastei 50 no mercado").await;

    h.interpretation
        .then(r#"{"fields": {"amount": 30, "description": "uber"}, "confidence": 0.9}"#);
    assert_eq!(
        h.say("Gastei 30 no uber").await,
        ask(ExpenseField::PaymentMethod, &[])
    );

    let request = h.interpretation.last_request();
    assert!(request.prior_turns.is_empty());
    assert_eq!(request.pending_field, None);
    let pending = h.pending().await.unwrap();
    assert_eq!(pending.collected.amount, Some(Decimal::new(30, 0)));
    assert_eq!(pending.collected.description.as_deref(), Some("Uber"));
}

#[tokio::test]
async fn failed_commit_keeps_answers_for_the_retry() {
    let h = Harness::new();
    h.ledger.down.store(true, Ordering::SeqCst);
    h.interpretation.then(
        r#"{"fields": {"amount": 80, "description": "farmácia", "payment_method": "pix",
            "responsible": "eu"}, "confidence": 0.95}"#,
    );
    assert_eq!(h.say("80 farmácia, pix, eu").await, DialogueReply::Error);
    assert!(h.pending().await.unwrap().is_complete());

    h.ledger.down.store(false, Ordering::SeqCst);
    assert!(matches!(
        h.say("tenta de novo").await,
        DialogueReply::Confirmed(_)
    ));
    assert_eq!(h.ledger.commits(), 1);
    assert_eq!(h.interpretation.request_count(), 1);
    assert!(h.stored().await.is_none());
}

#[tokio::test]
async fn commit_repeated_after_failed_cleanup_is_identical() {
    let h = Harness::new();
    h.ledger.down.store(true, Ordering::SeqCst);
    h.interpretation.then(
        r#"{"fields": {"amount": 80, "description": "farmácia", "payment_method": "pix",
            "responsible": "eu"}, "confidence": 0.95}"#,
    );
    assert_eq!(h.say("80 farmácia, pix, eu").await, DialogueReply::Error);
    let pending = h.pending().await.unwrap();

    // The commit goes through but the conversation cannot be deleted.
    h.ledger.down.store(false, Ordering::SeqCst);
    h.store.failing_deletes.store(1, Ordering::SeqCst);
    assert!(h.try_say_as(USER_KEY, "tenta de novo").await.is_err());
    assert_eq!(h.ledger.commits(), 1);
    assert_eq!(h.pending().await.unwrap(), pending);

    assert!(matches!(h.say("ok").await, DialogueReply::Confirmed(_)));
    assert!(h.stored().await.is_none());

    // The ledger sees the same conversation id twice and can drop the
    // second commit.
    let singles = h.ledger.singles.lock().unwrap();
    assert_eq!(singles.len(), 2);
    assert_eq!(singles[0].conversation_id, pending.conversation_id);
    assert_eq!(singles[0], singles[1]);
}

#[tokio::test]
async fn amount_answer_keeps_the_description_already_given() {
    let h = Harness::new();
    h.interpretation
        .then(r#"{"fields": {"description": "remédio"}, "confidence": 0.9}"#);
    assert_eq!(
        h.say("comprei remédio").await,
        ask(ExpenseField::Amount, &[])
    );

    h.interpretation.then(r#"{"fields": {"amount": 50}, "confidence": 0.9}"#);
    assert_eq!(
        h.say("paguei 50 reais").await,
        ask(ExpenseField::PaymentMethod, &[])
    );
    let pending = h.pending().await.unwrap();
    assert_eq!(pending.collected.amount, Some(Decimal::new(50, 0)));
    assert_eq!(pending.collected.description.as_deref(), Some("Remédio"));
}

#[tokio::test]
async fn cancel_deletes_pending_conversation() {
    let h = Harness::new();
    h.interpretation
        .then(r#"{"fields": {"amount": 50, "description": "mercado"}, "confidence": 0.9}"#);
    h.say("Gastei 50 no mercado").await;

    assert_eq!(h.say("cancelar").await, DialogueReply::Cancelled);
    assert!(h.stored().await.is_none());
    assert_eq!(h.ledger.commits(), 0);
}

#[tokio::test]
async fn reference_outage_is_a_retry_safe_error() {
    let h = Harness::new();
    h.directory.down.store(true, Ordering::SeqCst);
    assert_eq!(h.say("Gastei 50 no mercado").await, DialogueReply::Error);
    assert!(h.stored().await.is_none());
    assert_eq!(h.interpretation.request_count(), 0);
}

#[tokio::test]
async fn turns_of_one_user_never_overlap() {
    let h = Arc::new(Harness::with_interpretation(ScriptedInterpretation {
        delay: Some(Duration::from_millis(30)),
        ..Default::default()
    }));
    h.interpretation
        .then(r#"{"fields": {"amount": 50, "description": "mercado"}, "confidence": 0.9}"#);
    h.interpretation
        .then(r#"{"fields": {"amount": 20, "description": "padaria"}, "confidence": 0.9}"#);

    let (first, second) = tokio::join!(
        h.say("Gastei 50 no mercado"),
        h.say("Gastei 20 na padaria")
    );
    assert_eq!(first, ask(ExpenseField::PaymentMethod, &[]));
    assert_eq!(second, ask(ExpenseField::PaymentMethod, &[]));
    assert_eq!(h.interpretation.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(h.stored().await.unwrap().version, 2);
}

#[tokio::test]
async fn different_users_are_served_concurrently() {
    let h = Harness::with_interpretation(ScriptedInterpretation {
        delay: Some(Duration::from_millis(30)),
        ..Default::default()
    });
    let (first, second) = tokio::join!(
        h.say_as("5511911111111", "Gastei 50 no mercado"),
        h.say_as("5511922222222", "Gastei 20 na padaria")
    );
    // Neither answer carries fields, but both amounts are read locally.
    assert_eq!(first, ask(ExpenseField::Description, &[]));
    assert_eq!(second, ask(ExpenseField::Description, &[]));
    assert_eq!(h.interpretation.max_in_flight.load(Ordering::SeqCst), 2);
}

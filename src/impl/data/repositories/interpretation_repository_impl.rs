use std::str::FromStr as _;

use async_trait::async_trait;
use fractic_server_error::ServerError;

use crate::{
    data::models::interpretation_model::InterpretationModel,
    domain::repositories::interpretation_repository::InterpretationRepository,
    entities::{
        ExpenseField, FieldSpec, Interpretation, InterpretationRequest, InterpretationService,
        OrgReferenceData, PaymentMethod, ReferenceContext, Turn,
    },
};

pub(crate) struct InterpretationRepositoryImpl<S: InterpretationService> {
    service: S,
}

impl<S: InterpretationService> InterpretationRepositoryImpl<S> {
    pub(crate) fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S: InterpretationService> InterpretationRepository for InterpretationRepositoryImpl<S> {
    async fn interpret(
        &self,
        message: &str,
        prior_turns: &[Turn],
        pending_field: Option<ExpenseField>,
        references: &OrgReferenceData,
        current_user_name: &str,
    ) -> Result<Interpretation, ServerError> {
        let request = InterpretationRequest {
            message: message.to_string(),
            prior_turns: prior_turns.to_vec(),
            taxonomy: taxonomy(references),
            reference_context: ReferenceContext {
                categories: references.category_names(),
                cost_centers: references.cost_center_names(),
                cards: references.card_names(),
                current_user_name: current_user_name.to_string(),
            },
            pending_field,
        };
        let raw = self.service.interpret(&request).await?;
        Ok(InterpretationModel::from_str(&raw)?.into())
    }
}

/// Field descriptions sent along with every message.
fn taxonomy(references: &OrgReferenceData) -> Vec<FieldSpec> {
    let spec = |field: ExpenseField, description: &'static str, allowed_values| FieldSpec {
        name: field.key(),
        description,
        allowed_values,
    };
    vec![
        spec(
            ExpenseField::Amount,
            "Total amount paid, as a number.",
            Vec::new(),
        ),
        spec(
            ExpenseField::Description,
            "Short description of what was bought.",
            Vec::new(),
        ),
        spec(
            ExpenseField::Category,
            "Expense category, one of the allowed values.",
            references.category_names(),
        ),
        spec(
            ExpenseField::PaymentMethod,
            "How it was paid.",
            PaymentMethod::ALL
                .iter()
                .map(|m| m.code().to_string())
                .collect(),
        ),
        spec(
            ExpenseField::Responsible,
            "Person the expense belongs to, 'eu' for the sender, or 'compartilhado' when split.",
            references.cost_center_names(),
        ),
        spec(
            ExpenseField::Card,
            "Credit card name, only for credit payments.",
            references.card_names(),
        ),
        spec(
            ExpenseField::Installments,
            "Number of installments, only for credit payments.",
            Vec::new(),
        ),
    ]
}

use iso_currency::Currency;

use crate::entities::{DialogueReply, ExpenseField, PaymentMethod, ResolvedExpense, Responsible};

use super::utils::{format_amount, join_options};

/// Default pt-BR wording for dialogue replies.
pub(crate) struct ReplyRenderer {
    currency: Currency,
}

impl ReplyRenderer {
    pub(crate) fn new(currency: Currency) -> Self {
        Self { currency }
    }

    pub(crate) fn render(&self, reply: &DialogueReply) -> String {
        match reply {
            DialogueReply::AskField { field, options } => ask(*field, options),
            DialogueReply::InvalidAnswer { field, options } => invalid_answer(*field, options),
            DialogueReply::Rejected => {
                "Isso não parece ser um gasto. Me conte algo como \"Gastei 50 no mercado\"."
                    .to_string()
            }
            DialogueReply::Confirmed(expense) => self.confirmation(expense),
            DialogueReply::Cancelled => "Tudo bem, cancelei esse gasto.".to_string(),
            DialogueReply::Error => {
                "Tive um problema para registrar agora. Tente de novo em instantes, \
                 o que você já informou está guardado."
                    .to_string()
            }
        }
    }

    fn confirmation(&self, expense: &ResolvedExpense) -> String {
        let mut text = format!(
            "Gasto registrado: {} - {}",
            format_amount(expense.amount, self.currency),
            expense.description
        );
        if let Some(category) = &expense.category {
            text.push_str(&format!(" ({})", category.name));
        }
        text.push_str(&format!(
            ", pago com {}",
            payment_method_label(expense.payment_method)
        ));
        if let Some(card) = &expense.card {
            match expense.installments {
                Some(n) if n > 1 => text.push_str(&format!(" no {} em {}x", card.name, n)),
                _ => text.push_str(&format!(" no {} à vista", card.name)),
            }
        }
        match &expense.responsible {
            Responsible::Specific(item) => {
                text.push_str(&format!(", responsável: {}.", item.name))
            }
            Responsible::Shared => text.push_str(", compartilhado."),
        }
        text
    }
}

fn ask(field: ExpenseField, options: &[String]) -> String {
    let question = match field {
        ExpenseField::Amount => "Qual foi o valor?",
        ExpenseField::Description => "Com o que foi esse gasto?",
        ExpenseField::PaymentMethod => {
            "Como você pagou? (pix, débito, crédito, dinheiro, transferência ou boleto)"
        }
        ExpenseField::Responsible => "De quem é esse gasto?",
        ExpenseField::Category => "Em qual categoria ele se encaixa?",
        ExpenseField::Card => "Qual cartão e em quantas parcelas? (ex.: \"Nubank 3x\")",
        ExpenseField::Installments => "Em quantas parcelas?",
    };
    with_options(question.to_string(), options)
}

fn invalid_answer(field: ExpenseField, options: &[String]) -> String {
    let text = match field {
        ExpenseField::Card if options.is_empty() => {
            "Não entendi o cartão. Responda com o nome dele e as parcelas, \
             por exemplo \"Nubank 3x\"."
                .to_string()
        }
        ExpenseField::Installments => "Esse número de parcelas não é válido.".to_string(),
        _ if options.len() > 1 => format!("Encontrei mais de uma opção para {}.", label(field)),
        _ => format!("Não consegui identificar {}.", label(field)),
    };
    with_options(text, options)
}

fn with_options(text: String, options: &[String]) -> String {
    if options.is_empty() {
        text
    } else {
        format!("{} Opções: {}.", text, join_options(options))
    }
}

fn label(field: ExpenseField) -> &'static str {
    match field {
        ExpenseField::Amount => "o valor",
        ExpenseField::Description => "a descrição",
        ExpenseField::Category => "a categoria",
        ExpenseField::PaymentMethod => "a forma de pagamento",
        ExpenseField::Responsible => "o responsável",
        ExpenseField::Card => "o cartão",
        ExpenseField::Installments => "o número de parcelas",
    }
}

fn payment_method_label(payment_method: PaymentMethod) -> &'static str {
    match payment_method {
        PaymentMethod::Credit => "crédito",
        PaymentMethod::Debit => "débito",
        PaymentMethod::Pix => "pix",
        PaymentMethod::Cash => "dinheiro",
        PaymentMethod::BankTransfer => "transferência",
        PaymentMethod::Boleto => "boleto",
        PaymentMethod::Other => "outro meio",
    }
}

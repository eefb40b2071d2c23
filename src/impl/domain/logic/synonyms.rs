//! Lookup tables behind the heuristic parts of the normalizer and resolvers.
//!
//! Every table is ordered: the first group that matches wins. Entries are
//! written in canonical form (lowercase, no diacritics).

use crate::{config::ExpenseCaptureConfig, entities::PaymentMethod};

use super::normalizer::{contains_phrase, tokens};

pub(crate) const PAYMENT_METHOD_SYNONYMS: &[(PaymentMethod, &[&str])] = &[
    (PaymentMethod::Pix, &["pix"]),
    (PaymentMethod::Debit, &["debito", "debit"]),
    (
        PaymentMethod::Credit,
        &["credito", "credit", "cartao", "card", "parcelado", "parcelei"],
    ),
    (PaymentMethod::Cash, &["dinheiro", "especie", "cash", "grana"]),
    (
        PaymentMethod::BankTransfer,
        &["transferencia", "transferi", "transfer", "ted", "doc"],
    ),
    (PaymentMethod::Boleto, &["boleto", "bill slip"]),
    (PaymentMethod::Other, &["outro", "outra", "other"]),
];

/// Word prefixes that name a payment method in any inflection
/// ("transferi", "transferimos"). Checked after the whole-word table.
pub(crate) const PAYMENT_METHOD_STEMS: &[(PaymentMethod, &str)] = &[
    (PaymentMethod::BankTransfer, "transfer"),
    (PaymentMethod::Credit, "parcel"),
];

/// Built-in keyword → category name rules.
pub(crate) const CATEGORY_KEYWORDS: &[(&[&str], &str)] = &[
    (
        &[
            "mercado",
            "supermercado",
            "feira",
            "padaria",
            "acougue",
            "restaurante",
            "lanche",
            "ifood",
            "almoco",
            "jantar",
            "comida",
        ],
        "Alimentação",
    ),
    (
        &[
            "uber",
            "99",
            "taxi",
            "gasolina",
            "combustivel",
            "onibus",
            "metro",
            "estacionamento",
            "pedagio",
        ],
        "Transporte",
    ),
    (
        &[
            "farmacia", "remedio", "medico", "consulta", "exame", "hospital", "dentista",
        ],
        "Saúde",
    ),
    (
        &[
            "cinema", "show", "teatro", "bar", "viagem", "netflix", "spotify", "jogo",
        ],
        "Lazer",
    ),
    (
        &[
            "aluguel",
            "condominio",
            "luz",
            "energia",
            "agua",
            "internet",
            "gas",
        ],
        "Moradia",
    ),
    (
        &["escola", "faculdade", "curso", "livro", "mensalidade"],
        "Educação",
    ),
    (&["roupa", "sapato", "tenis"], "Vestuário"),
    (&["veterinario", "racao", "petshop"], "Pets"),
];

/// Values of the responsible slot meaning "split between everyone".
pub(crate) const SHARED_MARKERS: &[&str] = &[
    "compartilhado",
    "compartilhada",
    "dividido",
    "dividida",
    "dividir",
    "meio a meio",
    "nos dois",
    "ambos",
    "todos",
    "casal",
    "split",
    "shared",
];

/// First-person references resolved to the current user.
pub(crate) const SELF_REFERENCES: &[&str] = &[
    "eu",
    "eu mesmo",
    "eu mesma",
    "me",
    "mim",
    "pra mim",
    "para mim",
    "comigo",
    "meu",
    "minha",
    "i",
    "myself",
];

pub(crate) const CANCEL_COMMANDS: &[&str] = &[
    "cancelar",
    "cancela",
    "cancele",
    "esquece",
    "esqueca",
    "deixa pra la",
    "cancel",
];

pub(crate) const EXPENSE_VERBS: &[&str] = &[
    "gastei", "gastamos", "gasto", "paguei", "pagamos", "comprei", "compramos", "custou",
    "spent", "paid", "bought",
];

/// Words that only qualify an amount ("50 reais", "uns 30 conto").
pub(crate) const AMOUNT_WORDS: &[&str] = &[
    "r", "rs", "real", "reais", "conto", "contos", "pila", "pilas", "centavos", "uns", "umas",
    "de", "em", "no", "na", "com", "o", "a", "um", "uma", "so", "reals", "bucks", "dollars",
];

/// Descriptions too vague to be kept.
pub(crate) const GENERIC_DESCRIPTIONS: &[&str] = &[
    "gasto", "gastos", "despesa", "compra", "pagamento", "conta", "algo", "coisa", "expense",
    "purchase", "item",
];

/// Words dropped around a card name once the installment marker is removed.
pub(crate) const CARD_CONNECTORS: &[&str] = &[
    "em", "no", "na", "de", "do", "da", "com", "pelo", "pela", "e", "cartao", "in", "at", "on",
    "with", "card",
];

pub(crate) const NUMBER_WORDS: &[(&str, u32)] = &[
    ("duas", 2),
    ("dois", 2),
    ("tres", 3),
    ("quatro", 4),
    ("cinco", 5),
    ("seis", 6),
    ("sete", 7),
    ("oito", 8),
    ("nove", 9),
    ("dez", 10),
    ("onze", 11),
    ("doze", 12),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
];

/// True if the canonical phrase equals one of the entries, ignoring
/// punctuation.
pub(crate) fn is_one_of(text: &str, table: &[&str]) -> bool {
    let joined = tokens(text).join(" ");
    !joined.is_empty() && table.iter().any(|entry| *entry == joined)
}

/// Category keyword rules: the built-in table followed by configured extras.
#[derive(Debug, Clone)]
pub(crate) struct CategoryKeywordTable {
    rules: Vec<(Vec<String>, String)>,
}

impl CategoryKeywordTable {
    pub(crate) fn new(config: &ExpenseCaptureConfig) -> Self {
        let builtin = CATEGORY_KEYWORDS.iter().map(|(keywords, category)| {
            (
                keywords.iter().map(|k| k.to_string()).collect(),
                category.to_string(),
            )
        });
        let extra = config.extra_category_keywords.iter().map(|rule| {
            (
                rule.keywords
                    .iter()
                    .map(|k| super::normalizer::canonicalize(k))
                    .collect(),
                rule.category.clone(),
            )
        });
        Self {
            rules: builtin.chain(extra).collect(),
        }
    }

    /// Category names whose keywords appear in the text, in rule order.
    pub(crate) fn matches<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.rules
            .iter()
            .filter(move |(keywords, _)| keywords.iter().any(|k| contains_phrase(text, k)))
            .map(|(_, category)| category.as_str())
    }
}

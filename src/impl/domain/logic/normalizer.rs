//! Pure text normalization. Nothing in here performs I/O.

use std::{str::FromStr as _, sync::LazyLock};

use regex::Regex;
use rust_decimal::Decimal;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization as _};

use crate::entities::PaymentMethod;

use super::synonyms::{
    is_one_of, AMOUNT_WORDS, CANCEL_COMMANDS, CARD_CONNECTORS, EXPENSE_VERBS,
    GENERIC_DESCRIPTIONS, NUMBER_WORDS, PAYMENT_METHOD_STEMS, PAYMENT_METHOD_SYNONYMS,
    SELF_REFERENCES,
};

static NUMERIC_INSTALLMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})\s*(?:x|vezes|parcelas?|times|installments?)\b")
        .expect("static installment regex should be valid")
});

static WORD_INSTALLMENTS: LazyLock<Regex> = LazyLock::new(|| {
    let words = NUMBER_WORDS
        .iter()
        .map(|(w, _)| *w)
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"\b({words})(?:\s*(?:x|vezes|parcelas?|times|installments?)\b|\s*$)"
    ))
    .expect("static installment regex should be valid")
});

static FULL_PAYMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:a vista|avista|in full)\b").expect("static full-payment regex should be valid")
});

static AMOUNT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w.,])(\d{1,3}(?:\.\d{3})+(?:,\d{1,2})?|\d+(?:[.,]\d{1,2})?)(?:$|[^\w])")
        .expect("static amount regex should be valid")
});

static THOUSANDS_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,3}(?:\.\d{3})+$").expect("static amount regex should be valid")
});

/// Lowercase, diacritic-free, trimmed, single-spaced.
pub fn canonicalize(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical words, punctuation removed.
pub(crate) fn tokens(text: &str) -> Vec<String> {
    canonicalize(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whole-word (or whole-phrase) containment on canonical tokens.
pub(crate) fn contains_phrase(text: &str, phrase: &str) -> bool {
    let haystack = tokens(text);
    let needle = tokens(phrase);
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle.as_slice())
}

/// Resolves a payment method from free text; `None` if no synonym group
/// matches. Patterns match whole words, stems match word prefixes.
pub fn match_payment_method(text: &str) -> Option<PaymentMethod> {
    let words = tokens(text);
    if words.is_empty() {
        return None;
    }
    PAYMENT_METHOD_SYNONYMS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| contains_phrase(text, p)))
        .map(|(method, _)| *method)
        .or_else(|| {
            PAYMENT_METHOD_STEMS
                .iter()
                .find(|(_, stem)| words.iter().any(|w| w.starts_with(stem)))
                .map(|(method, _)| *method)
        })
}

pub fn normalize_payment_method(text: &str) -> PaymentMethod {
    match_payment_method(text).unwrap_or(PaymentMethod::Other)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardInstallments {
    pub card_name: Option<String>,
    pub installments: u32,
}

/// Splits an answer like "nubank em 3x" into the card phrase and the
/// installment count.
pub fn extract_card_and_installments(text: &str) -> CardInstallments {
    let canonical = canonicalize(text);
    let marker = find_installment_marker(&canonical);
    let remaining = match &marker {
        Some((start, end, _)) => format!("{} {}", &canonical[..*start], &canonical[*end..]),
        None => canonical.clone(),
    };
    let phrase = strip_connectors(&remaining);

    // A leftover digit without any marker usually means an amount or an
    // installment count we failed to recognize, not part of a card name.
    let unreliable = marker.is_none() && phrase.chars().any(|c| c.is_ascii_digit());
    CardInstallments {
        card_name: if phrase.is_empty() || unreliable {
            None
        } else {
            Some(phrase)
        },
        installments: marker.map(|(_, _, n)| n.max(1)).unwrap_or(1),
    }
}

/// The right-most installment marker: (start, end, installments).
fn find_installment_marker(canonical: &str) -> Option<(usize, usize, u32)> {
    let numeric = NUMERIC_INSTALLMENTS.captures_iter(canonical).filter_map(|c| {
        let whole = c.get(0)?;
        let n = c.get(1)?.as_str().parse::<u32>().ok()?;
        Some((whole.start(), whole.end(), n))
    });
    let words = WORD_INSTALLMENTS.captures_iter(canonical).filter_map(|c| {
        let whole = c.get(0)?;
        let word = c.get(1)?.as_str();
        let n = NUMBER_WORDS.iter().find(|(w, _)| *w == word)?.1;
        Some((whole.start(), whole.end(), n))
    });
    let full = FULL_PAYMENT
        .find_iter(canonical)
        .map(|m| (m.start(), m.end(), 1));
    numeric.chain(words).chain(full).max_by_key(|(start, _, _)| *start)
}

fn strip_connectors(text: &str) -> String {
    let words = tokens(text);
    let is_connector = |w: &String| CARD_CONNECTORS.contains(&w.as_str());
    let start = words.iter().position(|w| !is_connector(w));
    let end = words.iter().rposition(|w| !is_connector(w));
    match (start, end) {
        (Some(start), Some(end)) => words[start..=end].join(" "),
        _ => String::new(),
    }
}

/// Maps first-person references to the current user's display name.
pub fn resolve_self_reference(candidate: &str, current_user_name: &str) -> String {
    if is_one_of(candidate, SELF_REFERENCES) {
        current_user_name.to_string()
    } else {
        candidate.to_string()
    }
}

/// Parses a single amount token in Brazilian ("1.234,56") or plain
/// ("1234.56") notation. Only positive values are accepted.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    let raw = raw
        .strip_prefix("R$")
        .or_else(|| raw.strip_prefix("r$"))
        .unwrap_or(raw)
        .trim();
    let normalized = if raw.contains(',') {
        raw.replace('.', "").replace(',', ".")
    } else if THOUSANDS_ONLY.is_match(raw) {
        raw.replace('.', "")
    } else {
        raw.to_string()
    };
    Decimal::from_str(&normalized)
        .ok()
        .filter(|d| d.is_sign_positive() && !d.is_zero())
}

/// First amount mentioned in free text.
pub fn extract_amount(text: &str) -> Option<Decimal> {
    AMOUNT_TOKEN
        .captures_iter(&canonicalize(text))
        .filter_map(|c| c.get(1).and_then(|m| parse_amount(m.as_str())))
        .next()
}

/// Heuristic for "this starts a different expense": an amount, an expense
/// verb, and at least one word saying what was bought. "paguei 50 reais"
/// only answers an amount question.
pub fn looks_like_new_expense(text: &str) -> bool {
    let words = tokens(text);
    words.len() > 2
        && words.iter().any(|w| EXPENSE_VERBS.contains(&w.as_str()))
        && extract_amount(text).is_some()
        && words.iter().any(|w| is_descriptive_word(w))
}

fn is_descriptive_word(word: &str) -> bool {
    !(EXPENSE_VERBS.contains(&word)
        || AMOUNT_WORDS.contains(&word)
        || word.chars().all(|c| c.is_ascii_digit())
        || match_payment_method(word).is_some())
}

pub fn is_cancel_command(text: &str) -> bool {
    is_one_of(text, CANCEL_COMMANDS)
}

pub fn is_generic_description(text: &str) -> bool {
    tokens(text).iter().all(|w| {
        GENERIC_DESCRIPTIONS.contains(&w.as_str()) || ["um", "uma", "o", "a"].contains(&w.as_str())
    })
}

/// "  MERCADO do bairro " -> "Mercado do bairro".
pub fn sentence_case(text: &str) -> String {
    let collapsed = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let mut chars = collapsed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Phone numbers become digits only; other ids are trimmed and lowercased.
pub fn normalize_user_key(user_id: &str) -> String {
    let trimmed = user_id.trim();
    let trimmed = trimmed.strip_prefix("whatsapp:").unwrap_or(trimmed).trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    let phone_like = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || " +-().".contains(c));
    if phone_like && digits.len() >= 8 {
        digits
    } else {
        trimmed.to_lowercase()
    }
}

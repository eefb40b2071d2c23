// Crate-internal.
// ---

pub(crate) mod data {
    pub(crate) mod datasources {
        pub(crate) mod in_memory_conversation_datasource;
    }
    pub(crate) mod models {
        pub(crate) mod amount_model;
        pub(crate) mod conversation_state_model;
        pub(crate) mod interpretation_model;
    }
    pub(crate) mod repositories {
        pub(crate) mod conversation_repository_impl;
        pub(crate) mod interpretation_repository_impl;
        pub(crate) mod ledger_repository_impl;
        pub(crate) mod reference_repository_impl;
    }
}

pub(crate) mod domain {
    pub(crate) mod entities {
        pub(crate) mod conversation_state;
        pub(crate) mod dialogue_reply;
        pub(crate) mod expense;
        pub(crate) mod expense_field;
        pub(crate) mod inbound_message;
        pub(crate) mod interpretation;
        pub(crate) mod payment_method;
        pub(crate) mod reference_data;
        pub(crate) mod responsible;
        pub(crate) mod services;
    }
    pub(crate) mod logic {
        pub(crate) mod dialogue_controller;
        pub(crate) mod finalizer;
        pub(crate) mod normalizer;
        pub(crate) mod reference_resolver;
        pub(crate) mod synonyms;
        mod utils;
    }
    pub(crate) mod repositories {
        pub(crate) mod conversation_repository;
        pub(crate) mod interpretation_repository;
        pub(crate) mod ledger_repository;
        pub(crate) mod reference_repository;
    }
    pub(crate) mod usecases {
        pub(crate) mod handle_message_usecase;
    }
}

pub(crate) mod presentation {
    pub(crate) mod reply_fmt;
    pub(crate) mod utils;
}

// Public exports.
// ---

#[doc(hidden)]
#[allow(unused_imports)]
pub mod exports {
    // This mod represents how clients see the library, and can differ from the
    // internal structure.
    //
    // The contents of this mod are re-exported in the root of the crate.

    pub mod entities {
        pub use crate::domain::entities::conversation_state::*;
        pub use crate::domain::entities::dialogue_reply::*;
        pub use crate::domain::entities::expense::*;
        pub use crate::domain::entities::expense_field::*;
        pub use crate::domain::entities::inbound_message::*;
        pub use crate::domain::entities::interpretation::*;
        pub use crate::domain::entities::payment_method::*;
        pub use crate::domain::entities::reference_data::*;
        pub use crate::domain::entities::responsible::*;
        pub use crate::domain::entities::services::*;
    }

    pub mod normalizer {
        pub use crate::domain::logic::normalizer::{
            canonicalize, extract_amount, extract_card_and_installments, is_cancel_command,
            looks_like_new_expense, match_payment_method, normalize_payment_method,
            normalize_user_key, parse_amount, CardInstallments,
        };
    }

    pub mod datasources {
        pub use crate::data::datasources::in_memory_conversation_datasource::InMemoryConversationStateService;
    }
}

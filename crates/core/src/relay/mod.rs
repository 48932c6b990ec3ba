//! The race-and-failover engine: one [`ChainDriver`] walks the language chain,
//! one [`HopRace`] per hop races a [`HopWorker`] per proxy.

mod chain;
mod race;
mod worker;

#[cfg(test)]
mod testing;

use crate::proxy::ProxyError;

pub use chain::{ChainDriver, LanguageChain};
pub use race::{HopRace, HopSession, SessionResult};
pub use worker::{HopOutcome, HopWorker};

#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error("hop {source_lang}->{target_lang}: every proxy failed in {rounds} consecutive rounds")]
    HopExhausted {
        source_lang: String,
        target_lang: String,
        rounds: u32,
    },

    #[error("language chain needs a source and at least one target, got {0:?}")]
    ShortChain(String),

    #[error("empty language code in chain {0:?}")]
    EmptyLanguage(String),
}

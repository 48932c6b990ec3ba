mod google;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

pub use google::{GoogleTranslator, DEFAULT_ENDPOINT};

/// One call's worth of input. Built fresh for every worker and never shared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslationRequest {
    pub source_lang: String,
    pub target_lang: String,
    pub proxy: String,
    pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    pub detected_source_lang: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum TranslateError {
    #[error("endpoint answered with a markup page (quota or block)")]
    Blocked,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http error {0}: {1}")]
    HttpStatus(u16, String),

    #[error("undecodable response: {0}")]
    Decode(String),

    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl TranslateError {
    /// Permanent errors are not worth retrying through the same proxy.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Blocked)
    }
}

pub trait Translator: Send + Sync {
    fn translate<'a>(
        &'a self,
        request: &'a TranslationRequest,
    ) -> BoxFuture<'a, Result<Translation, TranslateError>>;
}

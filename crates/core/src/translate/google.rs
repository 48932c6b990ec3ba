use crate::normalize::join_segments;
use crate::translate::{TranslateError, Translation, TranslationRequest, Translator};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, Proxy};
use serde_json::Value;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

const FIXED_QUERY: [(&str, &str); 17] = [
    ("client", "gtx"),
    ("dt", "t"),
    ("ie", "UTF-8"),
    ("oe", "UTF-8"),
    ("otf", "1"),
    ("ssel", "0"),
    ("tsel", "0"),
    ("kc", "7"),
    ("dt", "at"),
    ("dt", "bd"),
    ("dt", "ex"),
    ("dt", "ld"),
    ("dt", "md"),
    ("dt", "qca"),
    ("dt", "rw"),
    ("dt", "rm"),
    ("dt", "ss"),
];

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/97.0.4692.71 Safari/537.36";

const MAX_ERROR_BODY: usize = 200;

/// Client for the unofficial `translate_a/single` endpoint. Every call builds
/// its own reqwest client because every call goes out through a different
/// proxy.
#[derive(Clone, Debug)]
pub struct GoogleTranslator {
    endpoint: String,
    timeout: Duration,
}

impl GoogleTranslator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            timeout,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn client_for(&self, proxy: &str) -> Result<Client, TranslateError> {
        let proxy = Proxy::all(format!("http://{proxy}"))?;
        Ok(Client::builder()
            .proxy(proxy)
            .timeout(self.timeout)
            .build()?)
    }

    async fn fetch(&self, request: &TranslationRequest) -> Result<Translation, TranslateError> {
        let url = Url::parse_with_params(
            &self.endpoint,
            FIXED_QUERY.iter().copied().chain([
                ("sl", request.source_lang.as_str()),
                ("tl", request.target_lang.as_str()),
                ("q", request.text.as_str()),
            ]),
        )?;

        let response = self
            .client_for(&request.proxy)?
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, "*/*")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9,es;q=0.8")
            .header(
                CONTENT_TYPE,
                "application/x-www-form-urlencoded;charset=UTF-8",
            )
            .header(ORIGIN, "https://translate.google.com")
            .header(REFERER, "https://translate.google.com/")
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        parse_body(status, &body)
    }
}

impl Translator for GoogleTranslator {
    fn translate<'a>(
        &'a self,
        request: &'a TranslationRequest,
    ) -> BoxFuture<'a, Result<Translation, TranslateError>> {
        self.fetch(request).boxed()
    }
}

/// Classifies a response body.
///
/// The payload is a nested array: element 0 holds the segments (each segment's
/// first field is a translated fragment), element 2 the detected source
/// language. Everything else is ignored, whatever its shape.
fn parse_body(status: u16, body: &str) -> Result<Translation, TranslateError> {
    if body.trim_start().starts_with('<') {
        return Err(TranslateError::Blocked);
    }
    if !(200..300).contains(&status) {
        let snippet = body.chars().take(MAX_ERROR_BODY).collect();
        return Err(TranslateError::HttpStatus(status, snippet));
    }

    let payload: Value =
        serde_json::from_str(body).map_err(|e| TranslateError::Decode(e.to_string()))?;
    let parts = payload
        .as_array()
        .ok_or_else(|| TranslateError::Decode("top level is not an array".to_owned()))?;

    let text = join_segments(
        parts
            .first()
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(|segment| segment.get(0).and_then(Value::as_str)),
    );
    let detected_source_lang = parts.get(2).and_then(Value::as_str).map(str::to_owned);

    Ok(Translation {
        text,
        detected_source_lang,
    })
}

use crate::proxy::{ProxyError, ProxyPool, ProxySource};
use crate::translate::{TranslateError, Translation, TranslationRequest, Translator};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn request(proxy: &str) -> TranslationRequest {
    TranslationRequest {
        source_lang: "en".into(),
        target_lang: "fr".into(),
        proxy: proxy.into(),
        text: "Hello world".into(),
    }
}

/// Scripted behaviour of one proxy.
#[derive(Clone)]
pub enum Script {
    /// Answers after `delay`, picking the text by target language (`*` matches
    /// any target).
    Reply {
        delay: Duration,
        by_target: Vec<(String, String)>,
    },
    /// Answers with a quota page.
    Blocked,
    /// Times out, forever.
    Transient,
    /// Times out `failures` times, then answers.
    Flaky { failures: usize, text: String },
}

impl Script {
    pub fn reply(text: &str) -> Self {
        Self::delayed(Duration::ZERO, text)
    }

    pub fn delayed(delay: Duration, text: &str) -> Self {
        Self::Reply {
            delay,
            by_target: vec![("*".to_owned(), text.to_owned())],
        }
    }

    pub fn by_target(pairs: &[(&str, &str)]) -> Self {
        Self::Reply {
            delay: Duration::ZERO,
            by_target: pairs
                .iter()
                .map(|(t, text)| ((*t).to_owned(), (*text).to_owned()))
                .collect(),
        }
    }

    pub fn flaky(failures: usize, text: &str) -> Self {
        Self::Flaky {
            failures,
            text: text.to_owned(),
        }
    }
}

#[derive(Clone, Default)]
pub struct ScriptedTranslator {
    scripts: Arc<HashMap<String, Script>>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
}

impl ScriptedTranslator {
    pub fn with(mut self, proxy: &str, script: Script) -> Self {
        Arc::make_mut(&mut self.scripts).insert(proxy.to_owned(), script);
        self
    }

    pub fn calls(&self, proxy: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .get(proxy)
            .copied()
            .unwrap_or(0)
    }

    fn record_call(&self, proxy: &str) -> usize {
        let mut calls = self.calls.lock().expect("calls lock");
        let n = calls.entry(proxy.to_owned()).or_default();
        *n += 1;
        *n
    }
}

fn translation(text: &str) -> Translation {
    Translation {
        text: text.to_owned(),
        detected_source_lang: None,
    }
}

fn timeout() -> TranslateError {
    TranslateError::HttpStatus(504, "gateway timeout".to_owned())
}

impl Translator for ScriptedTranslator {
    fn translate<'a>(
        &'a self,
        request: &'a TranslationRequest,
    ) -> BoxFuture<'a, Result<Translation, TranslateError>> {
        async move {
            let call = self.record_call(&request.proxy);
            match self.scripts.get(&request.proxy) {
                Some(Script::Reply { delay, by_target }) => {
                    tokio::time::sleep(*delay).await;
                    by_target
                        .iter()
                        .find(|(t, _)| t == "*" || *t == request.target_lang)
                        .map(|(_, text)| translation(text))
                        .ok_or_else(timeout)
                }
                Some(Script::Blocked) => Err(TranslateError::Blocked),
                Some(Script::Flaky { failures, text }) if call > *failures => {
                    Ok(translation(text))
                }
                Some(Script::Transient) | Some(Script::Flaky { .. }) | None => Err(timeout()),
            }
        }
        .boxed()
    }
}

/// Hands out a fixed sequence of pools; the last one repeats.
#[derive(Clone)]
pub struct SequenceSource {
    pools: Arc<Mutex<VecDeque<ProxyPool>>>,
    loads: Arc<Mutex<usize>>,
}

impl SequenceSource {
    pub fn new(pools: Vec<Vec<&str>>) -> Self {
        Self {
            pools: Arc::new(Mutex::new(
                pools
                    .into_iter()
                    .map(|p| p.into_iter().collect())
                    .collect(),
            )),
            loads: Arc::new(Mutex::new(0)),
        }
    }

    pub fn loads(&self) -> usize {
        *self.loads.lock().expect("loads lock")
    }
}

impl ProxySource for SequenceSource {
    fn load(&self) -> Result<ProxyPool, ProxyError> {
        *self.loads.lock().expect("loads lock") += 1;
        let mut pools = self.pools.lock().expect("pools lock");
        if pools.len() > 1 {
            Ok(pools.pop_front().unwrap_or_default())
        } else {
            Ok(pools.front().cloned().unwrap_or_default())
        }
    }
}

use crate::config::RelayConfig;
use crate::proxy::{ProxyPool, ProxySource};
use crate::relay::worker::{HopOutcome, HopWorker};
use crate::relay::RelayError;
use crate::translate::{TranslationRequest, Translator};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "relay::race";

/// How a session ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionResult {
    Won(String),
    AllFailed,
}

/// Bookkeeping for one race: how many workers are still alive and whether the
/// race has been decided. Once decided, later outcomes are ignored.
#[derive(Debug)]
pub struct HopSession {
    id: u64,
    cancel: CancellationToken,
    alive: usize,
    result: Option<SessionResult>,
}

impl HopSession {
    pub fn new(workers: usize) -> Self {
        Self {
            id: rand::random(),
            cancel: CancellationToken::new(),
            alive: workers,
            result: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn alive(&self) -> usize {
        self.alive
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    /// Applies one outcome. Returns the result on the transition into a
    /// terminal state, and `None` otherwise, including for every outcome that
    /// arrives after the session was decided.
    pub fn record(&mut self, outcome: HopOutcome) -> Option<SessionResult> {
        if self.result.is_some() {
            return None;
        }
        let decided = match outcome {
            HopOutcome::Success(text) => SessionResult::Won(text),
            HopOutcome::PermanentFailure => {
                self.alive = self.alive.saturating_sub(1);
                if self.alive > 0 {
                    return None;
                }
                SessionResult::AllFailed
            }
        };
        self.cancel.cancel();
        self.result = Some(decided.clone());
        Some(decided)
    }
}

impl Drop for HopSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Runs hops: loads the proxy pool, races a worker per proxy and reloads the
/// pool whenever a race ends with every proxy failed.
#[derive(Clone)]
pub struct HopRace<T, P> {
    translator: T,
    proxies: P,
    config: RelayConfig,
}

impl<T, P> HopRace<T, P>
where
    T: Translator + Clone + 'static,
    P: ProxySource,
{
    pub fn new(translator: T, proxies: P, config: RelayConfig) -> Self {
        Self {
            translator,
            proxies,
            config,
        }
    }

    /// Translates `text` from `source` to `target`, retrying with a fresh pool
    /// until some proxy succeeds. Only a configured round ceiling or an
    /// unreadable proxy source makes this return an error.
    pub async fn run_hop(
        &self,
        source: &str,
        target: &str,
        text: &str,
    ) -> Result<String, RelayError> {
        let mut rounds = 0u32;
        loop {
            let pool = self.load_pool().await?;
            match self.race(&pool, source, target, text).await {
                SessionResult::Won(text) => return Ok(text),
                SessionResult::AllFailed => {
                    rounds += 1;
                    tracing::warn!(
                        target: LOG_TARGET,
                        from = source,
                        to = target,
                        proxies = pool.len(),
                        rounds,
                        backoff = ?self.config.exhausted_backoff,
                        "every proxy failed, reloading proxy list"
                    );
                    if self.config.hop_attempts.is_some_and(|limit| rounds >= limit) {
                        return Err(RelayError::HopExhausted {
                            source_lang: source.to_owned(),
                            target_lang: target.to_owned(),
                            rounds,
                        });
                    }
                    tokio::time::sleep(self.config.exhausted_backoff).await;
                }
            }
        }
    }

    async fn load_pool(&self) -> Result<ProxyPool, RelayError> {
        loop {
            let pool = self.proxies.load()?;
            if !pool.is_empty() {
                return Ok(pool);
            }
            tracing::warn!(
                target: LOG_TARGET,
                backoff = ?self.config.empty_pool_backoff,
                "no proxies available, waiting"
            );
            tokio::time::sleep(self.config.empty_pool_backoff).await;
        }
    }

    async fn race(
        &self,
        pool: &ProxyPool,
        source: &str,
        target: &str,
        text: &str,
    ) -> SessionResult {
        let mut session = HopSession::new(pool.len());
        let (tx, mut rx) = mpsc::unbounded_channel();
        tracing::debug!(
            target: LOG_TARGET,
            session = session.id(),
            from = source,
            to = target,
            proxies = pool.len(),
            "session started"
        );

        for proxy in pool.iter() {
            let request = TranslationRequest {
                source_lang: source.to_owned(),
                target_lang: target.to_owned(),
                proxy: proxy.to_owned(),
                text: text.to_owned(),
            };
            let _ = HopWorker::new(self.translator.clone(), request, self.config.http_retries)
                .spawn(session.cancel_token(), tx.clone());
        }
        drop(tx);

        while let Some(outcome) = rx.recv().await {
            if let Some(result) = session.record(outcome) {
                tracing::debug!(
                    target: LOG_TARGET,
                    session = session.id(),
                    won = matches!(result, SessionResult::Won(_)),
                    "session decided"
                );
                return result;
            }
            tracing::trace!(
                target: LOG_TARGET,
                session = session.id(),
                alive = session.alive(),
                "proxy failed"
            );
        }

        // Workers only go quiet when cancelled, which happens after a decision.
        SessionResult::AllFailed
    }
}

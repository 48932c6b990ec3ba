use crate::normalize::normalize;
use crate::translate::{TranslationRequest, Translator};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "relay::worker";

/// What a worker reports to its session. Each worker reports at most once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HopOutcome {
    Success(String),
    PermanentFailure,
}

/// Owns one proxy for one hop and keeps calling the endpoint through it until
/// it has something to report or the session no longer cares.
pub struct HopWorker<T> {
    translator: T,
    request: TranslationRequest,
    retries: u32,
}

impl<T> HopWorker<T>
where
    T: Translator + Clone + 'static,
{
    pub fn new(translator: T, request: TranslationRequest, retries: u32) -> Self {
        Self {
            translator,
            request,
            retries,
        }
    }

    /// Runs the worker on the runtime and delivers its outcome, if any, to
    /// `outcomes`. A closed channel means the session already ended.
    pub fn spawn(
        self,
        cancel: CancellationToken,
        outcomes: UnboundedSender<HopOutcome>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Some(outcome) = self.run(&cancel).await {
                let _ = outcomes.send(outcome);
            }
        })
    }

    /// Returns `None` when cancelled: the session has been decided elsewhere.
    pub async fn run(&self, cancel: &CancellationToken) -> Option<HopOutcome> {
        let proxy = self.request.proxy.as_str();
        let mut failures = 0u32;

        loop {
            if cancel.is_cancelled() {
                return None;
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                result = self.translator.translate(&self.request) => result,
            };

            match result {
                Ok(translation) => {
                    tracing::debug!(
                        target: LOG_TARGET,
                        proxy,
                        detected = ?translation.detected_source_lang,
                        attempts = failures + 1,
                        "translation received"
                    );
                    return Some(HopOutcome::Success(normalize(&translation.text, false)));
                }
                Err(e) if e.is_permanent() => {
                    tracing::debug!(target: LOG_TARGET, proxy, error = %e, "proxy blocked");
                    return Some(HopOutcome::PermanentFailure);
                }
                Err(e) => {
                    failures += 1;
                    if failures >= self.retries {
                        tracing::debug!(
                            target: LOG_TARGET,
                            proxy,
                            error = %e,
                            failures,
                            "retries exhausted"
                        );
                        return Some(HopOutcome::PermanentFailure);
                    }
                    tracing::trace!(target: LOG_TARGET, proxy, error = %e, failures, "retrying");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::testing::{request, Script, ScriptedTranslator};
    use std::time::Duration;

    #[tokio::test]
    async fn success_is_trimmed_but_not_recased() {
        let translator =
            ScriptedTranslator::default().with("p1", Script::reply("  bonjour LE monde \n"));
        let worker = HopWorker::new(translator, request("p1"), 3);
        let outcome = worker.run(&CancellationToken::new()).await;
        assert_eq!(
            outcome,
            Some(HopOutcome::Success("bonjour LE monde".to_owned()))
        );
    }

    #[tokio::test]
    async fn blocked_fails_without_retry() {
        let translator = ScriptedTranslator::default().with("p1", Script::Blocked);
        let worker = HopWorker::new(translator.clone(), request("p1"), 5);
        assert_eq!(
            worker.run(&CancellationToken::new()).await,
            Some(HopOutcome::PermanentFailure)
        );
        assert_eq!(translator.calls("p1"), 1);
    }

    #[tokio::test]
    async fn transient_errors_retry_up_to_bound() {
        let translator = ScriptedTranslator::default().with("p1", Script::Transient);
        let worker = HopWorker::new(translator.clone(), request("p1"), 4);
        assert_eq!(
            worker.run(&CancellationToken::new()).await,
            Some(HopOutcome::PermanentFailure)
        );
        assert_eq!(translator.calls("p1"), 4);
    }

    #[tokio::test]
    async fn recovers_after_transient_errors() {
        let translator =
            ScriptedTranslator::default().with("p1", Script::flaky(2, "hallo welt"));
        let worker = HopWorker::new(translator.clone(), request("p1"), 3);
        assert_eq!(
            worker.run(&CancellationToken::new()).await,
            Some(HopOutcome::Success("hallo welt".to_owned()))
        );
        assert_eq!(translator.calls("p1"), 3);
    }

    #[tokio::test]
    async fn cancelled_before_start_makes_no_call() {
        let translator = ScriptedTranslator::default().with("p1", Script::reply("x"));
        let worker = HopWorker::new(translator.clone(), request("p1"), 3);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(worker.run(&cancel).await, None);
        assert_eq!(translator.calls("p1"), 0);
    }

    #[tokio::test]
    async fn cancellation_interrupts_in_flight_call() {
        let translator = ScriptedTranslator::default()
            .with("p1", Script::delayed(Duration::from_secs(60), "too late"));
        let worker = HopWorker::new(translator, request("p1"), 3);
        let cancel = CancellationToken::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = worker.spawn(cancel.clone(), tx);

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("worker stops promptly")
            .expect("worker task");
        assert!(rx.recv().await.is_none());
    }
}

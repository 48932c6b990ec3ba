use crate::config::RelayConfig;
use crate::normalize::normalize;
use crate::proxy::ProxySource;
use crate::record::ChainRecord;
use crate::relay::race::HopRace;
use crate::relay::RelayError;
use crate::translate::Translator;
use std::str::FromStr;

/// `[L0, L1, ..., Ln]`: the source language followed by at least one target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LanguageChain(Vec<String>);

impl LanguageChain {
    /// Parses a comma-separated list such as `en,fr,de`.
    pub fn parse(value: &str) -> Result<Self, RelayError> {
        let langs: Vec<String> = value.split(',').map(|l| l.trim().to_owned()).collect();
        if langs.iter().any(String::is_empty) {
            return Err(RelayError::EmptyLanguage(value.to_owned()));
        }
        if langs.len() < 2 {
            return Err(RelayError::ShortChain(value.to_owned()));
        }
        Ok(Self(langs))
    }

    pub fn source(&self) -> &str {
        &self.0[0]
    }

    /// Consecutive `(from, to)` pairs.
    pub fn hops(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.windows(2).map(|w| (w[0].as_str(), w[1].as_str()))
    }
}

impl FromStr for LanguageChain {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct ChainState {
    source: String,
    text: String,
    record: ChainRecord,
}

/// Walks a [`LanguageChain`] one hop at a time, feeding each hop's winner into
/// the next.
pub struct ChainDriver<T, P> {
    race: HopRace<T, P>,
}

impl<T, P> ChainDriver<T, P>
where
    T: Translator + Clone + 'static,
    P: ProxySource,
{
    pub fn new(translator: T, proxies: P, config: RelayConfig) -> Self {
        Self {
            race: HopRace::new(translator, proxies, config),
        }
    }

    pub async fn run(&self, input: &str, chain: &LanguageChain) -> Result<ChainRecord, RelayError> {
        let text = normalize(input, true);
        let mut state = ChainState {
            source: chain.source().to_owned(),
            text: text.clone(),
            record: ChainRecord::default(),
        };
        state.record.push(text, chain.source());

        for (hop, (_, target)) in chain.hops().enumerate() {
            let carried = normalize(&state.text, true);
            // Nothing to translate: an empty text relays as itself.
            let won = if carried.is_empty() {
                String::new()
            } else {
                self.race.run_hop(&state.source, target, &carried).await?
            };
            tracing::info!(hop, from = %state.source, to = target, "hop complete");

            state.record.push(normalize(&won, true), target);
            state.text = won;
            state.source = target.to_owned();
        }

        Ok(state.record)
    }
}

use std::path::PathBuf;

/// Proxy addresses (`host:port`) for one hop attempt, in file order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProxyPool(Vec<String>);

impl ProxyPool {
    /// Parses a newline-delimited list. Blank lines and surrounding whitespace
    /// are ignored, so a blank source is an empty pool.
    pub fn parse(contents: &str) -> Self {
        Self(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ProxyPool {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ProxyError {
    #[error("failed to read proxy list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the coordinator gets its proxies. Called at the start of every hop
/// attempt; implementations must not cache.
pub trait ProxySource: Send + Sync {
    fn load(&self) -> Result<ProxyPool, ProxyError>;
}

#[derive(Clone, Debug)]
pub struct FileProxySource {
    path: PathBuf,
}

impl FileProxySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProxySource for FileProxySource {
    fn load(&self) -> Result<ProxyPool, ProxyError> {
        std::fs::read_to_string(&self.path)
            .map(|contents| ProxyPool::parse(&contents))
            .map_err(|source| ProxyError::Read {
                path: self.path.clone(),
                source,
            })
    }
}

use std::fmt;
use std::path::{Path, PathBuf};

/// Joins the fields of a rendered record. Assumed never to occur in real text.
pub const SENTINEL: &str = "__TRANSLATE_NG_SENTINEL__";

/// The text of every stage of a chain, paired with its language, in
/// traversal order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainRecord {
    entries: Vec<(String, String)>,
}

impl ChainRecord {
    pub fn push(&mut self, text: impl Into<String>, lang: impl Into<String>) {
        self.entries.push((text.into(), lang.into()));
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn last_text(&self) -> Option<&str> {
        self.entries.last().map(|(text, _)| text.as_str())
    }
}

impl fmt::Display for ChainRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (text, lang) in &self.entries {
            write!(f, "{text}{SENTINEL}{lang}{SENTINEL}")?;
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error("failed to read input {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to clear input {path}: {source}")]
    Clear {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write output {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reads the input text and deletes the file, so that a run which dies before
/// writing its output leaves nothing behind to be mistaken for a result.
pub async fn take_input(path: &Path) -> Result<String, RecordError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| RecordError::Read {
            path: path.to_owned(),
            source,
        })?;
    tokio::fs::remove_file(path)
        .await
        .map_err(|source| RecordError::Clear {
            path: path.to_owned(),
            source,
        })?;
    Ok(raw.trim().to_owned())
}

pub async fn write_output(path: &Path, record: &ChainRecord) -> Result<(), RecordError> {
    tokio::fs::write(path, record.to_string())
        .await
        .map_err(|source| RecordError::Write {
            path: path.to_owned(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_every_entry_with_trailing_sentinels() {
        let mut record = ChainRecord::default();
        record.push("Hello", "en");
        record.push("Hallo", "de");
        assert_eq!(
            record.to_string(),
            format!("Hello{SENTINEL}en{SENTINEL}Hallo{SENTINEL}de{SENTINEL}")
        );
        assert_eq!(record.last_text(), Some("Hallo"));
    }

    #[test]
    fn empty_record_renders_empty() {
        assert_eq!(ChainRecord::default().to_string(), "");
    }

    #[tokio::test]
    async fn take_input_clears_the_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("job.txt");
        std::fs::write(&path, "  some text \n").expect("write");

        assert_eq!(take_input(&path).await.expect("readable"), "some text");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn take_input_missing_file_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = take_input(&dir.path().join("nope.txt"))
            .await
            .expect_err("missing");
        assert!(matches!(err, RecordError::Read { .. }));
    }

    #[tokio::test]
    async fn write_output_overwrites() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("job.txt");
        std::fs::write(&path, "stale").expect("write");

        let mut record = ChainRecord::default();
        record.push("Hi", "en");
        write_output(&path, &record).await.expect("writable");
        assert_eq!(
            std::fs::read_to_string(&path).expect("read back"),
            format!("Hi{SENTINEL}en{SENTINEL}")
        );
    }
}

//! Metadata codec: a small line-oriented key/value document format with
//! retry on transient empty/unparseable reads.
//!
//! The on-disk format is a YAML-compatible subset — one `key: value` scalar
//! per line. Nested structures (tags) live in their own leaf files rather
//! than inline in the document.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::thread;

use track_core::Error;

use crate::config::StoreConfig;

/// A parsed metadata document: an ordered map of scalar key/value pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document(BTreeMap<String, String>);

impl Document {
    /// Build a document from key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Document(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Look up a key, returning an error if it is absent or `"None"`/empty.
    pub fn require(&self, key: &str, path: &Path) -> Result<&str, Error> {
        match self.get(key) {
            Some(v) if !v.is_empty() && v != "None" => Ok(v),
            _ => Err(Error::MissingConfig { path: path.to_path_buf() }),
        }
    }

    /// Look up a key and parse it, treating `"None"`/empty as `None`.
    pub fn get_optional(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty() && *v != "None")
    }

    /// Set a key's value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Render to the on-disk text format.
    fn render(&self) -> String {
        let mut out = String::new();
        for (k, v) in &self.0 {
            out.push_str(k);
            out.push_str(": ");
            out.push_str(&escape_value(v));
            out.push('\n');
        }
        out
    }

    /// Parse the on-disk text format. Returns `None` if the content is empty
    /// or does not contain at least one well-formed `key: value` line —
    /// both conditions the reader's retry loop treats as transient.
    fn parse(content: &str) -> Option<Self> {
        if content.trim().is_empty() {
            return None;
        }
        let mut map = BTreeMap::new();
        for line in content.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line.split_once(':')?;
            map.insert(key.trim().to_string(), unescape_value(value.trim()));
        }
        if map.is_empty() {
            None
        } else {
            Some(Document(map))
        }
    }
}

fn escape_value(v: &str) -> String {
    if v.contains('\n') || v.contains('"') || v.starts_with(' ') || v.is_empty() {
        let mut out = String::with_capacity(v.len() + 2);
        out.push('"');
        for c in v.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                other => out.push(other),
            }
        }
        out.push('"');
        out
    } else {
        v.to_string()
    }
}

fn unescape_value(v: &str) -> String {
    if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
        let inner = &v[1..v.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some(other) => out.push(other),
                    None => {}
                }
            } else {
                out.push(c);
            }
        }
        out
    } else {
        v.to_string()
    }
}

/// Write a document to `path`, replacing any existing content.
///
/// Performs a temp-file-then-rename within the same directory where
/// possible, so concurrent readers either see the whole old file or the
/// whole new one. Atomicity against crashes is still best-effort, but this
/// closes the torn-write window that the reader's retry loop exists to
/// paper over.
pub fn write_document(path: &Path, doc: &Document) -> Result<(), Error> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let tmp_path = parent.join(format!(
        ".{}.tmp-{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("meta"),
        std::process::id()
    ));
    {
        let mut f = std::fs::File::create(&tmp_path)?;
        f.write_all(doc.render().as_bytes())?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Read and parse a document from `path`, retrying on a transient
/// empty/unparseable read per `config`.
pub fn read_document(path: &Path, config: &StoreConfig) -> Result<Document, Error> {
    if !path.exists() {
        return Err(Error::MissingConfig { path: path.to_path_buf() });
    }
    let mut last_empty = true;
    for attempt in 0..config.codec_retry_attempts {
        let content = std::fs::read_to_string(path)?;
        match Document::parse(&content) {
            Some(doc) => return Ok(doc),
            None => {
                last_empty = true;
                tracing::trace!(?path, attempt, "metadata read empty or unparseable, retrying");
                if !config.codec_retry_backoff.is_zero() {
                    thread::sleep(config.codec_retry_backoff);
                }
            }
        }
    }
    if last_empty {
        tracing::warn!(?path, "metadata read still empty after retries");
    }
    Err(Error::MissingConfig { path: path.to_path_buf() })
}

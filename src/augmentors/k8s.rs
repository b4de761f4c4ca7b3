//! Kubernetes pod labels
//!
//! Reads the `labels` file that the downward API projects into a pod (by
//! convention under `/etc/podinfo`) and attaches every pod label to each
//! entry as `k8s-pod/<name>`.

use crate::core::{Context, Entry, EntryAugmentor, HandlerError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Prefix of entry labels derived from pod labels
pub const POD_LABEL_PREFIX: &str = "k8s-pod/";

/// Directory the downward API volume is usually mounted at
pub const DEFAULT_PODINFO_ROOT: &str = "/etc/podinfo";

/// Adds pod labels, read once at construction, to every entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodinfoLabels {
    labels: BTreeMap<String, String>,
}

impl PodinfoLabels {
    /// Load `<root>/labels`
    ///
    /// A missing or malformed file yields an augmentor that adds nothing;
    /// the problem is reported on stderr.
    pub fn load(root: impl AsRef<Path>) -> Self {
        let path = root.as_ref().join("labels");
        match Self::from_file(&path) {
            Ok(labels) => labels,
            Err(e) => {
                eprintln!("[LOGGER WARNING] Pod labels not loaded: {}", e);
                Self::default()
            }
        }
    }

    /// Load a labels file, failing if it is missing or malformed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => HandlerError::labels_file(&display, "file not found"),
            _ => HandlerError::labels_file(&display, e.to_string()),
        })?;

        let labels = parse_labels(&content)
            .map_err(|message| HandlerError::labels_file(&display, message))?;
        Ok(Self::from_labels(labels))
    }

    /// Use already known pod labels
    pub fn from_labels<I, K, V>(labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            labels: labels
                .into_iter()
                .map(|(k, v)| (format!("{}{}", POD_LABEL_PREFIX, k.as_ref()), v.into()))
                .collect(),
        }
    }

    /// Prefixed labels this augmentor adds
    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl EntryAugmentor for PodinfoLabels {
    fn augment(&self, _ctx: &Context, entry: &mut Entry, _groups: &[String]) {
        for (key, value) in &self.labels {
            entry.labels.insert(key.clone(), value.clone());
        }
    }
}

/// Parse `name=value` lines as written by the downward API
///
/// `:` is accepted as separator too. Blank lines and lines starting with
/// `#` or `!` are skipped. Values wrapped in double quotes are unquoted.
///
/// Only one label per line is read: backslash escapes are kept as written
/// and a trailing `\` does not continue the value on the next line. The
/// downward API escapes quotes and newlines inside quoted values, so such
/// values come through in their escaped form.
fn parse_labels(content: &str) -> std::result::Result<BTreeMap<String, String>, String> {
    let mut labels = BTreeMap::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let separator = line
            .find(['=', ':'])
            .ok_or_else(|| format!("line {}: missing separator", index + 1))?;
        let key = line[..separator].trim();
        if key.is_empty() {
            return Err(format!("line {}: empty label name", index + 1));
        }

        let value = unquote(line[separator + 1..].trim())
            .ok_or_else(|| format!("line {}: unterminated quote", index + 1))?;
        labels.insert(key.to_string(), value.to_string());
    }

    Ok(labels)
}

fn unquote(value: &str) -> Option<&str> {
    match value.strip_prefix('"') {
        Some(rest) => rest.strip_suffix('"'),
        None => Some(value),
    }
}

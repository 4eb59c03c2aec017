//! Service configuration.

use crate::error::{Error, Result};
use crate::models::ANONYMOUS;
use stampcard_core::DEFAULT_PAGE_SIZE;
use std::path::PathBuf;

/// Stamp card configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StampCardConfig {
    /// JSON file the CLI keeps its documents in
    pub data_file: PathBuf,
    /// Slots per board page
    pub page_size: usize,
    /// Name shown for callers with neither a display name nor an email
    pub anonymous_name: String,
    /// Unsigned upload endpoint for stamp images, if any
    pub media_endpoint: Option<String>,
    pub upload_preset: String,
}

impl Default for StampCardConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("./stampcard-data.json"),
            page_size: DEFAULT_PAGE_SIZE,
            anonymous_name: ANONYMOUS.to_string(),
            media_endpoint: None,
            upload_preset: "anon_upload".to_string(),
        }
    }
}

impl StampCardConfig {
    /// Create config from environment variables with defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_blank = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let page_size = match non_blank("STAMPCARD_PAGE_SIZE") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(Error::Config(format!(
                        "STAMPCARD_PAGE_SIZE must be a positive integer, got {:?}",
                        raw
                    )))
                }
            },
            None => defaults.page_size,
        };

        Ok(Self {
            data_file: non_blank("STAMPCARD_DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_file),
            page_size,
            anonymous_name: non_blank("STAMPCARD_ANONYMOUS_NAME").unwrap_or(defaults.anonymous_name),
            media_endpoint: non_blank("STAMPCARD_MEDIA_ENDPOINT"),
            upload_preset: non_blank("STAMPCARD_UPLOAD_PRESET").unwrap_or(defaults.upload_preset),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = StampCardConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StampCardConfig::default());
        assert_eq!(config.page_size, 10);
        assert_eq!(config.anonymous_name, "Anonymous");
    }

    #[test]
    fn reads_overrides() {
        let config = StampCardConfig::from_lookup(lookup(&[
            ("STAMPCARD_DATA_FILE", "/tmp/cards.json"),
            ("STAMPCARD_PAGE_SIZE", " 12 "),
            ("STAMPCARD_MEDIA_ENDPOINT", "https://media.example/upload"),
            ("STAMPCARD_ANONYMOUS_NAME", ""),
        ]))
        .unwrap();
        assert_eq!(config.data_file, PathBuf::from("/tmp/cards.json"));
        assert_eq!(config.page_size, 12);
        assert_eq!(config.media_endpoint.as_deref(), Some("https://media.example/upload"));
        assert_eq!(config.anonymous_name, "Anonymous");
    }

    #[test]
    fn rejects_bad_page_size() {
        for raw in ["0", "-3", "ten"] {
            let result = StampCardConfig::from_lookup(lookup(&[("STAMPCARD_PAGE_SIZE", raw)]));
            assert!(matches!(result, Err(Error::Config(_))), "accepted {}", raw);
        }
    }
}

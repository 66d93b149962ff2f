//! Key/value context the site is configured from, plus the file that remembers
//! lookups between runs.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

pub const DEFAULT_CACHE_FILE: &str = "static-site.context.json";

#[derive(Debug, Default, Clone)]
pub struct Context {
    values: BTreeMap<String, String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// later writes win, so layers are applied from lowest to highest precedence.
    pub fn set<K: AsRef<str>, V: AsRef<str>>(&mut self, key: K, val: V) {
        self.values.insert(key.as_ref().to_string(), val.as_ref().to_string());
    }

    pub fn merge<I: IntoIterator<Item = (String, String)>>(&mut self, values: I) {
        for (key, val) in values {
            self.set(key, val);
        }
    }

    /// whitespace only values count as missing.
    pub fn try_get(&self, key: &str) -> Option<&str> {
        self.values.get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn get(&self, key: &str) -> Result<&str> {
        self.try_get(key).ok_or_else(|| Error::MissingContext(key.to_string()))
    }

    /// reads a .env file without exporting anything to the process environment.
    /// `SITE_DOMAIN=x` becomes the context key `site_domain`.
    /// returns false if there is no file at `path`.
    pub fn merge_dotenv<P: AsRef<Path>>(&mut self, path: P) -> Result<bool> {
        let path = path.as_ref();
        if !path.is_file() {
            debug!("no .env file at {:?}", path);
            return Ok(false);
        }
        for item in dotenvy::from_path_iter(path)? {
            let (key, val) = item?;
            self.set(key.to_lowercase(), val);
        }
        debug!("loaded context from {:?}", path);
        Ok(true)
    }

    /// parses `key=value` as given to `-c` on the command line.
    pub fn parse_pair(s: &str) -> Result<(String, String)> {
        let (key, val) = s.split_once('=').ok_or_else(|| Error::InvalidContext {
            key: s.to_string(),
            reason: "expected key=value".to_string(),
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::InvalidContext {
                key: s.to_string(),
                reason: "key must not be empty".to_string(),
            });
        }
        Ok((key.to_string(), val.to_string()))
    }
}

/// remembers the results of lookups against the cloud provider so
/// repeated synths give the same template without calling out again.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ContextCache {
    entries: BTreeMap<String, String>,
}

impl ContextCache {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let entries = serde_json::from_str(&contents)?;
        Ok(Self { entries })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|s| s.as_str())
    }

    pub fn insert(&mut self, key: String, val: String) {
        self.entries.insert(key, val);
    }

    pub fn hosted_zone_key(domain: &str) -> String {
        format!("hosted-zone:domain={}", domain.trim_end_matches('.').to_lowercase())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn later_layers_win() {
        let mut ctx = Context::new();
        ctx.set("domain", "from-file.com");
        ctx.merge(vec![("domain".to_string(), "from-cli.com".to_string())]);
        assert_eq!(ctx.get("domain").unwrap(), "from-cli.com");
    }

    #[test]
    fn blank_values_are_missing() {
        let mut ctx = Context::new();
        ctx.set("subdomain", "   ");
        assert!(ctx.try_get("subdomain").is_none());
        match ctx.get("subdomain") {
            Err(Error::MissingContext(key)) => assert_eq!(key, "subdomain"),
            _ => panic!("expected missing context"),
        }
    }

    #[test]
    fn parses_cli_pairs() {
        assert_eq!(Context::parse_pair("domain=example.com").unwrap(), ("domain".into(), "example.com".into()));
        assert_eq!(Context::parse_pair("note=a=b").unwrap(), ("note".into(), "a=b".into()));
        assert!(Context::parse_pair("domain").is_err());
        assert!(Context::parse_pair("=x").is_err());
    }

    #[test]
    fn dotenv_keys_are_lowercased() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "# comment\nDOMAIN=example.com\nSUBDOMAIN=www\n").unwrap();
        let mut ctx = Context::new();
        assert!(ctx.merge_dotenv(&path).unwrap());
        assert_eq!(ctx.get("domain").unwrap(), "example.com");
        assert_eq!(ctx.get("subdomain").unwrap(), "www");
        assert!(!ctx.merge_dotenv(dir.path().join("missing.env")).unwrap());
    }

    #[test]
    fn cache_survives_a_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CACHE_FILE);
        assert_eq!(ContextCache::load(&path).unwrap(), ContextCache::default());
        let mut cache = ContextCache::default();
        cache.insert(ContextCache::hosted_zone_key("Example.com."), "Z0123".into());
        cache.save(&path).unwrap();
        let loaded = ContextCache::load(&path).unwrap();
        assert_eq!(loaded.get("hosted-zone:domain=example.com"), Some("Z0123"));
    }
}

//! Engine configuration.
//!
//! Loaded from YAML; every key is optional.
//!
//! ```yaml
//! base_url: https://vafdb.example.org
//! page_size: 500
//! max_page_size: 5000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Prefix for `next`/`previous` links, without a trailing slash.
    pub base_url: String,
    /// Page size used when a request does not ask for one.
    pub page_size: usize,
    /// Upper bound requested page sizes are clamped to.
    pub max_page_size: usize,
    /// Query parameter carrying the cursor.
    pub cursor_param: String,
    /// Query parameter carrying the requested page size.
    pub page_size_param: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            base_url: "http://localhost:8000".to_string(),
            page_size: 1000,
            max_page_size: 10000,
            cursor_param: "cursor".to_string(),
            page_size_param: "page_size".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_page_size == 0 {
            return Err(Error::Config("max_page_size must be at least 1".into()));
        }
        if self.page_size == 0 || self.page_size > self.max_page_size {
            return Err(Error::Config(format!(
                "page_size must be between 1 and {}",
                self.max_page_size
            )));
        }
        if self.cursor_param.is_empty() || self.page_size_param.is_empty() {
            return Err(Error::Config("parameter names must not be empty".into()));
        }
        if self.cursor_param == self.page_size_param {
            return Err(Error::Config(
                "cursor_param and page_size_param must differ".into(),
            ));
        }
        Ok(())
    }

    /// Returns `true` for query parameters that steer pagination rather
    /// than filter.
    pub fn is_reserved(&self, param: &str) -> bool {
        param == self.cursor_param || param == self.page_size_param
    }

    pub(crate) fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.page_size, 1000);
        assert_eq!(config.max_page_size, 10000);
        assert!(config.validate().is_ok());
        assert!(config.is_reserved("cursor"));
        assert!(config.is_reserved("page_size"));
        assert!(!config.is_reserved("coverage"));
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = EngineConfig::from_yaml_str("page_size: 10\n").unwrap();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.max_page_size, 10000);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            EngineConfig::from_yaml_str("pagesize: 10\n"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn rejects_inconsistent_sizes() {
        let err = EngineConfig::from_yaml_str("page_size: 50\nmax_page_size: 10\n").unwrap_err();
        assert!(err.to_string().contains("page_size must be between 1 and 10"));
        assert!(EngineConfig::from_yaml_str("page_size: 0\n").is_err());
    }

    #[test]
    fn rejects_clashing_params() {
        assert!(EngineConfig::from_yaml_str("cursor_param: page_size\n").is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_url: https://vafdb.example.org/").unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.base(), "https://vafdb.example.org");
    }

    #[test]
    fn load_missing_file() {
        assert!(matches!(
            EngineConfig::load("/nonexistent/vafdb.yaml"),
            Err(Error::Config(_))
        ));
    }
}

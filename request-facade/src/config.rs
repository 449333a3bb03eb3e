use crate::cache::CacheConfig;
use crate::error::Error;
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const ENV_PREFIX: &str = "REQUEST_FACADE_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prefix for relative request urls.
    pub base_url: Option<String>,
    /// Sent with every request, on top of the JSON content type.
    pub headers: BTreeMap<String, String>,
    pub cache: CacheConfig,
}

impl Config {
    /// Defaults, then the YAML file at `path` (if present), then
    /// `REQUEST_FACADE_*` environment variables. Nested keys use `__`,
    /// e.g. `REQUEST_FACADE_CACHE__MAX_ENTRIES`.
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let config: Config = Self::figment(path).extract()?;
        log::debug!("Loaded request facade configuration: {:?}", config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join(format!("{}.yaml", uuid::Uuid::new_v4()));
        let config = Config::load(&path).unwrap();
        assert_eq!(config.base_url, None);
        assert_eq!(config.cache.max_entries, 1000);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("{}.yaml", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            "base_url: https://api.example.com/\nheaders:\n  X-Client: web\ncache:\n  max_entries: 10\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.base_url.as_deref(), Some("https://api.example.com/"));
        assert_eq!(config.headers.get("X-Client").map(String::as_str), Some("web"));
        assert_eq!(config.cache.max_entries, 10);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_invalid_yaml_is_a_config_error() {
        let path = std::env::temp_dir().join(format!("{}.yaml", uuid::Uuid::new_v4()));
        fs::write(&path, "cache:\n  max_entries: lots\n").unwrap();

        let result = Config::load(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::Config(_))));
    }
}

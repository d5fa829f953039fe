use horizons_cache::{CacheConfig, RedisConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Redis configuration
    #[serde(default)]
    pub redis: RedisConfig,
    /// Promotion policy
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.cache.promotion_threshold == 0 {
            return Err("cache.promotion_threshold must be > 0".into());
        }
        if self.redis.enabled {
            if self.redis.url.is_empty() {
                return Err("redis.enabled=true requires redis.url".into());
            }
            if self.redis.pool_size == 0 {
                return Err("redis.pool_size must be > 0".into());
            }
            if self.redis.timeout_ms == 0 {
                return Err("redis.timeout_ms must be > 0".into());
            }
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "warn".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if !pathbuf.exists() {
                    return Err(format!("config file not found: {p}"));
                }
                builder = builder.add_source(File::from(pathbuf));
            }
            None => {
                let default_path = PathBuf::from("horizons.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., HORIZONS__CACHE__PROMOTION_THRESHOLD=5
        builder = builder.add_source(
            Environment::with_prefix("HORIZONS")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[redis]\nenabled = true\nurl = \"redis://cache:6379\"\n\n[cache]\npromotion_threshold = 5"
        )
        .unwrap();

        let cfg = loader::load_config(file.path().to_str()).unwrap();
        assert!(cfg.redis.enabled);
        assert_eq!(cfg.redis.url, "redis://cache:6379");
        assert_eq!(cfg.redis.pool_size, 10);
        assert_eq!(cfg.cache.promotion_threshold, 5);
        assert_eq!(cfg.logging.level, "warn");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(loader::load_config(Some("/nonexistent/horizons.toml")).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(AppConfig::default().validate().is_ok());

        let mut cfg = AppConfig::default();
        cfg.cache.promotion_threshold = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.redis.enabled = true;
        cfg.redis.pool_size = 0;
        assert!(cfg.validate().is_err());
    }
}

use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/Config.toml";

/// Unprefixed environment variable names accepted for compatibility, mapped onto
/// their nested configuration keys.
const LEGACY_ENV: [(&str, &str); 3] = [
    ("DATABASE_URL", "database.url"),
    ("API_SECRET_KEY", "auth.secret"),
    ("SOURCE_API_URL", "source.url"),
];

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from [`DEFAULT_CONFIG_PATH`] and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be parsed or fails validation.
    pub fn load() -> Result<AppConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads configuration by merging defaults, a TOML file, the legacy
    /// environment variables and `SOLOMON_`-prefixed variables, in that order.
    ///
    /// A missing TOML file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be parsed or fails validation.
    pub fn load_from(path: &str) -> Result<AppConfig> {
        let config: AppConfig = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Self::legacy_env())
            .merge(Env::prefixed("SOLOMON_").split("__"))
    }

    fn legacy_env() -> Env {
        Env::raw()
            .only(&LEGACY_ENV.map(|(env, _)| env))
            .map(|key| legacy_key(key.as_str()).into())
    }
}

fn legacy_key(env: &str) -> &'static str {
    LEGACY_ENV
        .iter()
        .find(|(name, _)| env.eq_ignore_ascii_case(name))
        .map_or("unmapped", |(_, path)| *path)
}

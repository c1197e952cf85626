use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    pub auth: AuthConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Location of the upstream transaction feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    pub timeout_secs: u64,
}

/// Shared-secret settings for the bearer-token gate.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub secret: String,
    pub token_ttl_minutes: u64,
    /// Also require a bearer token on the sync trigger.
    pub protect_sync: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Stored procedure invoked with `CALL <name>()` after the raw upserts.
    pub aggregation_procedure: String,
    pub unit_of_work_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/solomon".to_string(),
            max_connections: 10,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000/transactions".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_ttl_minutes: 30,
            protect_sync: false,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("protect_sync", &self.protect_sync)
            .finish()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            aggregation_procedure: "refresh_dashboard_metrics".to_string(),
            unit_of_work_timeout_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Returns the `host:port` pair the HTTP listener binds to.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AppConfig {
    /// Checks the settings that cannot be defaulted safely.
    ///
    /// # Errors
    /// Returns an error naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            bail!("database.url must be set (DATABASE_URL)");
        }
        if self.source.url.trim().is_empty() {
            bail!("source.url must be set (SOURCE_API_URL)");
        }
        if self.auth.secret.trim().is_empty() {
            bail!("auth.secret must be set (API_SECRET_KEY)");
        }
        if self.source.timeout_secs == 0 {
            bail!("source.timeout_secs must be greater than zero");
        }
        if self.pipeline.unit_of_work_timeout_secs == 0 {
            bail!("pipeline.unit_of_work_timeout_secs must be greater than zero");
        }
        if !is_sql_identifier(&self.pipeline.aggregation_procedure) {
            bail!(
                "pipeline.aggregation_procedure is not a plain SQL identifier: {}",
                self.pipeline.aggregation_procedure
            );
        }
        Ok(())
    }
}

/// Accepts `name` or `schema.name`, each part made of ASCII letters, digits and
/// underscores and not starting with a digit.
#[must_use]
pub fn is_sql_identifier(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.is_empty() || parts.len() > 2 {
        return false;
    }
    parts.iter().all(|part| {
        let mut chars = part.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.secret = "shared-secret".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_addr(), "0.0.0.0:8081");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.source.timeout_secs, 10);
        assert_eq!(config.auth.token_ttl_minutes, 30);
        assert!(!config.auth.protect_sync);
        assert_eq!(
            config.pipeline.aggregation_procedure,
            "refresh_dashboard_metrics"
        );
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_secret() {
        let err = AppConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("auth.secret"));
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = valid_config();
        config.source.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.pipeline.unit_of_work_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_injected_procedure_name() {
        let mut config = valid_config();
        config.pipeline.aggregation_procedure = "refresh(); DROP TABLE x; --".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sql_identifier() {
        assert!(is_sql_identifier("refresh_dashboard_metrics"));
        assert!(is_sql_identifier("aggregated.refresh_v2"));
        assert!(!is_sql_identifier(""));
        assert!(!is_sql_identifier("1refresh"));
        assert!(!is_sql_identifier("a.b.c"));
        assert!(!is_sql_identifier("refresh metrics"));
        assert!(!is_sql_identifier("schema."));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", valid_config().auth);
        assert!(!rendered.contains("shared-secret"));
        assert!(rendered.contains("redacted"));
    }
}

use std::path::{Path, PathBuf};

use serde::Deserialize;

use warden_core::policy::PolicyLimits;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub policy: PolicyConfig,
    pub log: LogConfig,
    pub tracing: TracingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Path to the TOML policy file. None starts the server with an
    /// empty policy set, which denies everything but super-admins.
    pub file: Option<PathBuf>,
    pub max_policies_per_scope: usize,
    pub max_condition_depth: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub enabled: bool,
    pub otlp_endpoint: String,
    pub service_name: String,
    pub sample_rate: f64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            file: None,
            max_policies_per_scope: 100,
            max_condition_depth: 8,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "info".to_string(),
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
            service_name: "warden-server".to_string(),
            sample_rate: 1.0,
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e.to_string()))?;
            toml::from_str::<AppConfig>(&contents)
                .map_err(|e| ConfigError::ParseToml(e.to_string()))?
        } else {
            AppConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("WARDEN_HTTP_HOST") {
            self.http.host = v;
        }
        if let Ok(v) = std::env::var("WARDEN_HTTP_PORT")
            && let Ok(port) = v.parse()
        {
            self.http.port = port;
        }
        if let Ok(v) = std::env::var("WARDEN_POLICY_FILE") {
            self.policy.file = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("WARDEN_LOG_LEVEL") {
            self.log.level = v;
        }
        if let Ok(v) = std::env::var("WARDEN_LOG_FORMAT") {
            match v.as_str() {
                "json" => self.log.format = LogFormat::Json,
                "pretty" => self.log.format = LogFormat::Pretty,
                _ => {}
            }
        }
        if let Ok(v) = std::env::var("WARDEN_OTLP_ENDPOINT") {
            self.tracing.otlp_endpoint = v;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.http.port == 0 {
            return Err(ConfigError::Validation(
                "http.port must be non-zero".to_string(),
            ));
        }
        if self.policy.max_policies_per_scope == 0 {
            return Err(ConfigError::Validation(
                "policy.max_policies_per_scope must be non-zero".to_string(),
            ));
        }
        if self.policy.max_condition_depth == 0 {
            return Err(ConfigError::Validation(
                "policy.max_condition_depth must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_policy_limits(&self) -> PolicyLimits {
        PolicyLimits {
            max_policies_per_scope: self.policy.max_policies_per_scope,
            max_condition_depth: self.policy.max_condition_depth,
        }
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http.host, self.http.port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{0}': {1}")]
    ReadFile(String, String),

    #[error("failed to parse TOML config: {0}")]
    ParseToml(String),

    #[error("config validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_has_sensible_values() {
        let config = AppConfig::default();

        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.http.port, 8080);
        assert!(config.policy.file.is_none());
        assert_eq!(config.policy.max_policies_per_scope, 100);
        assert_eq!(config.log.format, LogFormat::Json);
        assert!(!config.tracing.enabled);
    }

    #[test]
    fn load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[http]
host = "127.0.0.1"
port = 9090

[policy]
file = "/etc/warden/policies.toml"
max_condition_depth = 4

[log]
format = "pretty"
level = "debug"
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();

        assert_eq!(config.http.host, "127.0.0.1");
        assert_eq!(config.http.port, 9090);
        assert_eq!(
            config.policy.file,
            Some(PathBuf::from("/etc/warden/policies.toml"))
        );
        assert_eq!(config.policy.max_condition_depth, 4);
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn env_vars_override_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[http]
port = 9090
"#
        )
        .unwrap();

        // SAFETY: test runs single-threaded for this env var
        unsafe { std::env::set_var("WARDEN_HTTP_PORT", "8081") };
        let config = AppConfig::load(Some(&path)).unwrap();
        unsafe { std::env::remove_var("WARDEN_HTTP_PORT") };

        assert_eq!(config.http.port, 8081);
    }

    #[test]
    fn validation_rejects_zero_port() {
        let mut config = AppConfig::default();
        config.http.port = 0;

        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Validation(ref msg)) if msg.contains("port")));
    }

    #[test]
    fn validation_rejects_zero_condition_depth() {
        let mut config = AppConfig::default();
        config.policy.max_condition_depth = 0;

        let result = config.validate();
        assert!(
            matches!(result, Err(ConfigError::Validation(ref msg)) if msg.contains("max_condition_depth"))
        );
    }

    #[test]
    fn to_policy_limits_copies_the_caps() {
        let mut config = AppConfig::default();
        config.policy.max_policies_per_scope = 7;
        config.policy.max_condition_depth = 3;

        let limits = config.to_policy_limits();
        assert_eq!(limits.max_policies_per_scope, 7);
        assert_eq!(limits.max_condition_depth, 3);
    }
}

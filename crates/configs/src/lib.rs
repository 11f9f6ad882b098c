use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

/// Default document-store address when neither config.toml nor `MONGO_DB_URI`
/// provides one.
pub const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017/";

/// Deployment mode. `Production` turns on HTTPS enforcement at the gateway;
/// everything else leaves plaintext traffic alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    #[default]
    Development,
    Production,
}

impl AppEnv {
    /// Parse an environment value; anything that is not "production" counts
    /// as development.
    pub fn from_str_lossy(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("production") {
            AppEnv::Production
        } else {
            AppEnv::Development
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, AppEnv::Production)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub env: AppEnv,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".into(), port: 5000, worker_threads: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    /// Upper bound on server selection when probing reachability.
    #[serde(default = "default_selection_timeout")]
    pub server_selection_timeout_secs: u64,
}

fn default_selection_timeout() -> u64 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_MONGO_URI.into(),
            server_selection_timeout_secs: default_selection_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed to make credentialed cross-origin requests. Entries
    /// ending in `:*` match any port on that host.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self { allowed_origins: default_allowed_origins() }
    }
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "https://taskmanagement-production-a8c9.up.railway.app".to_string(),
        "http://localhost:*".to_string(),
    ]
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load config.toml when present (defaults otherwise), apply environment
    /// overrides and validate the result.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default().unwrap_or_default();
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Environment wins over the file: `APP_ENV`, `HOST`, `PORT`,
    /// `MONGO_DB_URI`. A present-but-malformed `PORT` is an error, not a
    /// silent fallback.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var("APP_ENV") {
            self.env = AppEnv::from_str_lossy(&raw);
        }
        if let Ok(host) = std::env::var("HOST") {
            if !host.trim().is_empty() {
                self.server.host = host;
            }
        }
        if let Ok(raw) = std::env::var("PORT") {
            self.server.port = parse_port(&raw)?;
        }
        if let Ok(uri) = std::env::var("MONGO_DB_URI") {
            if !uri.trim().is_empty() {
                self.database.uri = uri;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.database.validate()?;
        if self.cors.allowed_origins.is_empty() {
            return Err(anyhow!("cors.allowed_origins must not be empty"));
        }
        Ok(())
    }
}

pub fn parse_port(raw: &str) -> Result<u16> {
    let port = raw
        .trim()
        .parse::<u16>()
        .map_err(|_| anyhow!("PORT must be an integer in 1..=65535, got {raw:?}"))?;
    if port == 0 {
        return Err(anyhow!("PORT must not be 0"));
    }
    Ok(port)
}

impl ServerConfig {
    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(anyhow!("server.host must not be empty"));
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<()> {
        let lower = self.uri.to_lowercase();
        if !(lower.starts_with("mongodb://") || lower.starts_with("mongodb+srv://")) {
            return Err(anyhow!("database.uri must start with mongodb:// or mongodb+srv://"));
        }
        if self.server_selection_timeout_secs == 0 {
            return Err(anyhow!("database.server_selection_timeout_secs must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_contract() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.database.uri, DEFAULT_MONGO_URI);
        assert_eq!(cfg.env, AppEnv::Development);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn default_allow_list_has_production_and_loopback() {
        let cors = CorsConfig::default();
        assert!(cors
            .allowed_origins
            .contains(&"https://taskmanagement-production-a8c9.up.railway.app".to_string()));
        assert!(cors.allowed_origins.contains(&"http://localhost:*".to_string()));
    }

    #[test]
    fn parse_port_accepts_valid_values() {
        assert_eq!(parse_port("5000").unwrap(), 5000);
        assert_eq!(parse_port(" 8080 ").unwrap(), 8080);
    }

    #[test]
    fn parse_port_rejects_garbage_and_zero() {
        assert!(parse_port("five thousand").is_err());
        assert!(parse_port("").is_err());
        assert!(parse_port("0").is_err());
        assert!(parse_port("70000").is_err());
    }

    #[test]
    fn app_env_parsing_is_lossy() {
        assert_eq!(AppEnv::from_str_lossy("production"), AppEnv::Production);
        assert_eq!(AppEnv::from_str_lossy("PRODUCTION"), AppEnv::Production);
        assert_eq!(AppEnv::from_str_lossy("development"), AppEnv::Development);
        assert_eq!(AppEnv::from_str_lossy("staging"), AppEnv::Development);
        assert_eq!(AppEnv::from_str_lossy(""), AppEnv::Development);
    }

    #[test]
    fn validate_rejects_non_mongo_uri() {
        let db = DatabaseConfig { uri: "postgres://localhost/app".into(), ..Default::default() };
        assert!(db.validate().is_err());
        let db = DatabaseConfig { uri: "mongodb+srv://cluster.example.net/".into(), ..Default::default() };
        assert!(db.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            env = "production"

            [server]
            host = "127.0.0.1"
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.env, AppEnv::Production);
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.database.uri, DEFAULT_MONGO_URI);
        assert_eq!(cfg.cors.allowed_origins.len(), 2);
    }
}

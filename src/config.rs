//! Process configuration read from the environment (and `.env` if present)
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error("{0} is set but {1} is missing")]
    Incomplete(&'static str, &'static str),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub data_dir: PathBuf,
    pub public_base_url: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub session_ttl_hours: i64,
    pub max_upload_bytes: usize,
    pub log_json: bool,
}

impl AppConfig {
    /// Defaults suitable for a single local instance rooted at `data_dir`.
    pub fn local(data_dir: impl Into<PathBuf>) -> Self {
        let server_host = "127.0.0.1".to_string();
        let server_port = 3001;
        Self {
            public_base_url: format!("http://localhost:{server_port}"),
            server_host,
            server_port,
            data_dir: data_dir.into(),
            admin_email: None,
            admin_password: None,
            session_ttl_hours: 24,
            max_upload_bytes: 10 * 1024 * 1024,
            log_json: false,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let server_host = var("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let server_port = parse_var("SERVER_PORT", 3001u16)?;
        let data_dir = var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./storefront-data"));
        let public_base_url = var("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://{server_host}:{server_port}"));

        let admin_email = var("ADMIN_EMAIL");
        let admin_password = var("ADMIN_PASSWORD");
        match (&admin_email, &admin_password) {
            (Some(_), None) => return Err(ConfigError::Incomplete("ADMIN_EMAIL", "ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Incomplete("ADMIN_PASSWORD", "ADMIN_EMAIL")),
            _ => {}
        }

        let session_ttl_hours = parse_var("SESSION_TTL_HOURS", 24i64)?;
        if !(1..=24 * 365).contains(&session_ttl_hours) {
            return Err(ConfigError::Invalid {
                var: "SESSION_TTL_HOURS",
                reason: "must be between 1 and 8760".into(),
            });
        }
        let max_upload_bytes = parse_var("MAX_UPLOAD_BYTES", 10 * 1024 * 1024usize)?;
        let log_json = parse_var("LOG_JSON", false)?;

        tracing::info!("Application configuration loaded successfully.");

        Ok(Self {
            server_host,
            server_port,
            data_dir,
            public_base_url,
            admin_email,
            admin_password,
            session_ttl_hours,
            max_upload_bytes,
            log_json,
        })
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

use hocon::HoconLoader;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const PLACEHOLDER_CLIENT_ID: &str = "[[YOUR_CLIENT_ID]]";
pub const PLACEHOLDER_CLIENT_SECRET: &str = "[[YOUR_CLIENT_SECRET]]";

/// Minimum session key length, in bytes, accepted by the cookie signer.
pub const MIN_SESSION_KEY_BYTES: usize = 64;

const MASK: &str = "***MASKED***";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub google: GoogleConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub tasks: TaskConfig,
    #[serde(default)]
    pub app: AppConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally visible base URL. When unset, URLs are derived from the request host.
    #[serde(default)]
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_revoke_url")]
    pub revoke_url: String,
    #[serde(default = "default_userinfo_url")]
    pub userinfo_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MirrorConfig {
    #[serde(default = "default_mirror_base_url")]
    pub base_url: String,
    #[serde(default = "default_mirror_upload_url")]
    pub upload_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Hex-encoded cookie signing key.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default)]
    pub secure: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TaskConfig {
    /// Where deferred tasks are replayed. Defaults to the server's own address.
    #[serde(default)]
    pub dispatch_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_display_name")]
    pub display_name: String,
    #[serde(default = "default_contact_id")]
    pub contact_id: String,
    #[serde(default = "default_contact_image")]
    pub contact_image: String,
    #[serde(default = "default_broadcast_limit")]
    pub broadcast_limit: i64,
    #[serde(default = "default_secure_host_suffix")]
    pub secure_host_suffix: String,
    #[serde(default = "default_message_ttl_secs")]
    pub message_ttl_secs: u64,
    #[serde(default = "default_timeline_page_size")]
    pub timeline_page_size: u32,
}

fn default_scopes() -> Vec<String> {
    vec![
        "https://www.googleapis.com/auth/glass.timeline".to_string(),
        "https://www.googleapis.com/auth/glass.location".to_string(),
        "https://www.googleapis.com/auth/userinfo.profile".to_string(),
    ]
}

fn default_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_url() -> String {
    "https://accounts.google.com/o/oauth2/token".to_string()
}

fn default_revoke_url() -> String {
    "https://accounts.google.com/o/oauth2/revoke".to_string()
}

fn default_userinfo_url() -> String {
    "https://www.googleapis.com/oauth2/v2/userinfo".to_string()
}

fn default_mirror_base_url() -> String {
    "https://www.googleapis.com/mirror/v1".to_string()
}

fn default_mirror_upload_url() -> String {
    "https://www.googleapis.com/upload/mirror/v1".to_string()
}

fn default_cookie_name() -> String {
    "mirror-quickstart".to_string()
}

fn default_display_name() -> String {
    "Mirror Quickstart".to_string()
}

fn default_contact_id() -> String {
    "Mirror_Quickstart".to_string()
}

fn default_contact_image() -> String {
    "/static/images/quickstart.svg".to_string()
}

fn default_broadcast_limit() -> i64 {
    5
}

fn default_secure_host_suffix() -> String {
    "appspot.com".to_string()
}

fn default_message_ttl_secs() -> u64 {
    5
}

fn default_timeline_page_size() -> u32 {
    3
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            base_url: default_mirror_base_url(),
            upload_url: default_mirror_upload_url(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            key: None,
            cookie_name: default_cookie_name(),
            secure: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            display_name: default_display_name(),
            contact_id: default_contact_id(),
            contact_image: default_contact_image(),
            broadcast_limit: default_broadcast_limit(),
            secure_host_suffix: default_secure_host_suffix(),
            message_ttl_secs: default_message_ttl_secs(),
            timeline_page_size: default_timeline_page_size(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        // Try to load from HOCON file first, fall back to environment variables
        Self::from_hocon().unwrap_or_else(|e| {
            tracing::warn!(
                "Failed to load HOCON config: {}. Falling back to environment variables.",
                e
            );
            Self::from_env_fallback()
        })
    }
}

impl Config {
    /// Load configuration from HOCON file with environment variable substitution
    pub fn from_hocon() -> Result<Self, String> {
        Self::from_hocon_path("application.conf")
    }

    /// Load configuration from a specific HOCON file path
    pub fn from_hocon_path<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(format!("Configuration file not found: {}", path.display()));
        }

        let mut config: Config = HoconLoader::new()
            .load_file(path)
            .map_err(|e| format!("Failed to load HOCON file: {}", e))?
            .resolve()
            .map_err(|e| format!("Failed to parse and resolve HOCON: {}", e))?;

        // Secrets usually live outside the config file.
        config.load_secrets_from_env();

        Ok(config)
    }

    /// Load from `QUICKSTART_*` variables with `__` as the section separator,
    /// e.g. `QUICKSTART_GOOGLE__CLIENT_ID`.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("QUICKSTART").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Fallback configuration from flat environment variables
    fn from_env_fallback() -> Self {
        let app_defaults = AppConfig::default();

        Self {
            server: ServerConfig {
                host: std::env::var("QUICKSTART_SERVER_HOST")
                    .unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: std::env::var("QUICKSTART_SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
                public_url: std::env::var("QUICKSTART_PUBLIC_URL").ok(),
            },
            database: DatabaseConfig {
                url: std::env::var("QUICKSTART_DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:quickstart.db?mode=rwc".to_string()),
            },
            google: GoogleConfig {
                client_id: std::env::var("QUICKSTART_GOOGLE_CLIENT_ID")
                    .unwrap_or_else(|_| PLACEHOLDER_CLIENT_ID.to_string()),
                client_secret: std::env::var("QUICKSTART_GOOGLE_CLIENT_SECRET")
                    .unwrap_or_else(|_| PLACEHOLDER_CLIENT_SECRET.to_string()),
                scopes: default_scopes(),
                auth_url: default_auth_url(),
                token_url: default_token_url(),
                revoke_url: default_revoke_url(),
                userinfo_url: default_userinfo_url(),
            },
            mirror: MirrorConfig::default(),
            session: SessionConfig {
                key: std::env::var("QUICKSTART_SESSION_KEY").ok(),
                ..SessionConfig::default()
            },
            tasks: TaskConfig {
                dispatch_base_url: std::env::var("QUICKSTART_TASKS_DISPATCH_URL").ok(),
            },
            app: AppConfig {
                broadcast_limit: std::env::var("QUICKSTART_BROADCAST_LIMIT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(app_defaults.broadcast_limit),
                secure_host_suffix: std::env::var("QUICKSTART_SECURE_HOST_SUFFIX")
                    .unwrap_or(app_defaults.secure_host_suffix.clone()),
                ..app_defaults
            },
        }
    }

    /// Override OAuth client credentials and the session key from the environment
    fn load_secrets_from_env(&mut self) {
        if let Ok(client_id) = std::env::var("QUICKSTART_GOOGLE_CLIENT_ID") {
            self.google.client_id = client_id;
        }
        if let Ok(client_secret) = std::env::var("QUICKSTART_GOOGLE_CLIENT_SECRET") {
            self.google.client_secret = client_secret;
        }
        if let Ok(key) = std::env::var("QUICKSTART_SESSION_KEY") {
            self.session.key = Some(key);
        }
    }

    /// Address deferred tasks are replayed against.
    pub fn task_dispatch_base_url(&self) -> String {
        self.tasks
            .dispatch_base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.server.host, self.server.port))
    }

    /// Validate configuration for production use
    pub fn validate_for_production(&self) -> Result<(), String> {
        if self.google.client_id.trim().is_empty()
            || self.google.client_id == PLACEHOLDER_CLIENT_ID
        {
            return Err("google.client_id must be set (QUICKSTART_GOOGLE_CLIENT_ID). Create one in the API console.".to_string());
        }

        if self.google.client_secret.trim().is_empty()
            || self.google.client_secret == PLACEHOLDER_CLIENT_SECRET
        {
            return Err("google.client_secret must be set (QUICKSTART_GOOGLE_CLIENT_SECRET).".to_string());
        }

        match &self.session.key {
            None => {
                return Err("session.key must be set (QUICKSTART_SESSION_KEY) so sessions survive restarts.".to_string());
            }
            Some(key) if key.len() < MIN_SESSION_KEY_BYTES * 2 => {
                return Err(format!(
                    "session.key must be at least {} hex characters long (current: {} characters)",
                    MIN_SESSION_KEY_BYTES * 2,
                    key.len()
                ));
            }
            Some(_) => {}
        }

        Ok(())
    }

    /// Produce a version safe to log (secrets masked).
    pub fn sanitized(&self) -> Self {
        let mut clone = self.clone();
        clone.google.client_secret = MASK.to_string();
        if clone.session.key.is_some() {
            clone.session.key = Some(MASK.to_string());
        }
        clone
    }
}

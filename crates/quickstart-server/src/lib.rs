//! Server assembly: wires configuration, adapters and routes into one `HttpServer`.

use std::sync::Arc;

use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{cookie::Key, web, App, HttpServer};
use tracing_actix_web::TracingLogger;

use quickstart_actix::{configure, AppSettings, AppState};
use quickstart_config::{Config, MIN_SESSION_KEY_BYTES};
use quickstart_core::QuickstartError;
use quickstart_mirror::MirrorClient;
use quickstart_oauth::GoogleIdentityProvider;
use quickstart_observability::{actix::MetricsMiddleware, Metrics};
use quickstart_tasks::{ActixTaskQueue, HttpTaskDispatcher};

pub const SERVICE_NAME: &str = "mirror-quickstart";

/// Decode the configured hex session key, or generate a throwaway one.
pub fn session_key(hex_key: Option<&str>) -> Result<Key, QuickstartError> {
    match hex_key {
        Some(hex_key) => {
            let bytes = hex::decode(hex_key.trim())
                .map_err(|e| QuickstartError::config(&format!("session.key is not hex: {e}")))?;
            if bytes.len() < MIN_SESSION_KEY_BYTES {
                return Err(QuickstartError::config(&format!(
                    "session.key must decode to at least {MIN_SESSION_KEY_BYTES} bytes (got {})",
                    bytes.len()
                )));
            }
            Key::try_from(bytes.as_slice())
                .map_err(|e| QuickstartError::config(&format!("invalid session.key: {e}")))
        }
        None => {
            tracing::warn!("session.key not set; generated a random key, sessions will not survive restarts");
            Ok(Key::generate())
        }
    }
}

async fn build_state(config: &Config, metrics: Metrics) -> Result<AppState, QuickstartError> {
    let credentials =
        quickstart_storage_factory::create_credential_store(&config.database.url).await?;
    credentials.init().await?;

    let messages = quickstart_storage_factory::create_message_cache();

    let dispatcher = HttpTaskDispatcher::new(config.task_dispatch_base_url())?;
    let tasks = ActixTaskQueue::start(Arc::new(dispatcher), Some(metrics.clone()));

    let mirror = MirrorClient::new(&config.mirror)?;
    let identity = GoogleIdentityProvider::new(&config.google)?;

    AppState::new(
        credentials,
        messages,
        Arc::new(tasks),
        Arc::new(mirror),
        Arc::new(identity),
        metrics,
        AppSettings::from_config(config),
    )
}

/// Run the server until it is stopped.
pub async fn run() -> std::io::Result<()> {
    if let Err(e) = quickstart_observability::init_telemetry(SERVICE_NAME) {
        eprintln!("failed to initialize telemetry: {e}");
    }

    let config = Config::default();
    if let Err(e) = config.validate_for_production() {
        tracing::warn!("configuration is not production ready: {e}");
    }
    tracing::info!(config = ?config.sanitized(), "loaded configuration");

    let metrics = Metrics::new().map_err(std::io::Error::other)?;
    let state = build_state(&config, metrics.clone())
        .await
        .map_err(std::io::Error::other)?;
    let key = session_key(config.session.key.as_deref()).map_err(std::io::Error::other)?;

    let cookie_name = config.session.cookie_name.clone();
    let cookie_secure = config.session.secure;
    let bind = (config.server.host.clone(), config.server.port);
    tracing::info!(host = %bind.0, port = bind.1, "starting Mirror quickstart");

    let result = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), key.clone())
                    .cookie_name(cookie_name.clone())
                    .cookie_secure(cookie_secure)
                    .build(),
            )
            .wrap(MetricsMiddleware::new(metrics.clone()))
            .wrap(TracingLogger::default())
            .service(actix_files::Files::new("/static", "./static"))
            .configure(configure)
    })
    .bind(bind)?
    .run()
    .await;

    quickstart_observability::shutdown_telemetry();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_generated() {
        assert!(session_key(None).is_ok());
    }

    #[test]
    fn hex_key_must_be_long_enough() {
        let short = hex::encode([7u8; 32]);
        let err = session_key(Some(&short)).err().expect("short key rejected");
        assert_eq!(err.error, "config_error");

        let long = hex::encode([7u8; MIN_SESSION_KEY_BYTES]);
        assert!(session_key(Some(&long)).is_ok());
    }

    #[test]
    fn non_hex_key_is_rejected() {
        assert!(session_key(Some("not-hex")).is_err());
    }
}

use std::sync::Arc;
use std::time::Duration;

use quickstart_config::Config;
use quickstart_core::{full_url, public_url, QuickstartError};
use quickstart_observability::Metrics;
use quickstart_ports::{DynCredentialStore, DynIdentityProvider, DynMessageCache, DynMirrorApi};
use quickstart_tasks::DynTaskQueue;
use tera::Tera;

use crate::templates;

/// Application-level knobs the handlers read on every request.
#[derive(Debug, Clone)]
pub struct AppSettings {
    /// When set, absolute URLs are built from this base instead of the request host.
    pub public_url: Option<String>,
    pub secure_host_suffix: String,
    pub display_name: String,
    pub contact_id: String,
    pub contact_image: String,
    pub broadcast_limit: i64,
    pub message_ttl: Duration,
    pub timeline_page_size: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            public_url: None,
            secure_host_suffix: "appspot.com".to_string(),
            display_name: "Mirror Quickstart".to_string(),
            contact_id: "Mirror_Quickstart".to_string(),
            contact_image: "/static/images/quickstart.svg".to_string(),
            broadcast_limit: 5,
            message_ttl: Duration::from_secs(5),
            timeline_page_size: 3,
        }
    }
}

impl AppSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            public_url: config.server.public_url.clone(),
            secure_host_suffix: config.app.secure_host_suffix.clone(),
            display_name: config.app.display_name.clone(),
            contact_id: config.app.contact_id.clone(),
            contact_image: config.app.contact_image.clone(),
            broadcast_limit: config.app.broadcast_limit,
            message_ttl: Duration::from_secs(config.app.message_ttl_secs),
            timeline_page_size: config.app.timeline_page_size,
        }
    }

    /// Absolute URL for `path` as seen by the remote service.
    pub fn full_url(&self, host: &str, path: &str) -> String {
        match &self.public_url {
            Some(base) => public_url(base, path),
            None => full_url(host, path, &self.secure_host_suffix),
        }
    }

    /// Resolve a form-supplied link: site-relative paths become absolute.
    pub fn resolve_link(&self, host: &str, link: &str) -> String {
        if link.starts_with('/') {
            self.full_url(host, link)
        } else {
            link.to_string()
        }
    }
}

/// Shared handler state, registered once as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub credentials: DynCredentialStore,
    pub messages: DynMessageCache,
    pub tasks: DynTaskQueue,
    pub mirror: DynMirrorApi,
    pub identity: DynIdentityProvider,
    pub metrics: Metrics,
    pub settings: Arc<AppSettings>,
    pub templates: Arc<Tera>,
}

impl AppState {
    pub fn new(
        credentials: DynCredentialStore,
        messages: DynMessageCache,
        tasks: DynTaskQueue,
        mirror: DynMirrorApi,
        identity: DynIdentityProvider,
        metrics: Metrics,
        settings: AppSettings,
    ) -> Result<Self, QuickstartError> {
        let templates = templates::load()
            .map_err(|e| QuickstartError::config(&format!("failed to load templates: {e}")))?;

        Ok(Self {
            credentials,
            messages,
            tasks,
            mirror,
            identity,
            metrics,
            settings: Arc::new(settings),
            templates: Arc::new(templates),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_overrides_request_host() {
        let settings = AppSettings {
            public_url: Some("https://glass.example.com".to_string()),
            ..AppSettings::default()
        };
        assert_eq!(
            settings.full_url("localhost:8080", "/notify"),
            "https://glass.example.com/notify"
        );
    }

    #[test]
    fn relative_links_resolve_against_host() {
        let settings = AppSettings::default();
        assert_eq!(
            settings.resolve_link("localhost:8080", "/static/images/quickstart.svg"),
            "http://localhost:8080/static/images/quickstart.svg"
        );
        assert_eq!(
            settings.resolve_link("localhost:8080", "https://cdn.example/cat.png"),
            "https://cdn.example/cat.png"
        );
    }
}

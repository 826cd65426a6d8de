use async_trait::async_trait;
use tracing::{field, Instrument};

use quickstart_core::{Credential, QuickstartError};
use quickstart_ports::{CredentialStore, DynCredentialStore};

use crate::telemetry::annotate_span_with_trace_ids;

/// Wraps a `DynCredentialStore` so every persistence call runs inside a `db` span.
///
/// Request spans from the actix middleware then extend down into storage.
pub struct ObservedCredentialStore {
    inner: DynCredentialStore,
    db_system: String,
}

impl ObservedCredentialStore {
    pub fn new(inner: DynCredentialStore, db_system: String) -> Self {
        Self { inner, db_system }
    }

    fn span(&self, operation: &'static str) -> tracing::Span {
        let span = tracing::info_span!(
            "db",
            trace_id = field::Empty,
            span_id = field::Empty,
            db_system = %self.db_system,
            db_operation = operation
        );
        annotate_span_with_trace_ids(&span);
        span
    }

    fn user_span(&self, operation: &'static str, user_id: &str) -> tracing::Span {
        let span = tracing::info_span!(
            "db",
            trace_id = field::Empty,
            span_id = field::Empty,
            db_system = %self.db_system,
            db_operation = operation,
            user_id = %user_id
        );
        annotate_span_with_trace_ids(&span);
        span
    }

    fn token_prefix(token: &str) -> String {
        token.chars().take(12).collect::<String>()
    }
}

#[async_trait]
impl CredentialStore for ObservedCredentialStore {
    async fn init(&self) -> Result<(), QuickstartError> {
        let span = self.span("init");
        async move { self.inner.init().await }
            .instrument(span)
            .await
    }

    async fn save_credential(&self, credential: &Credential) -> Result<(), QuickstartError> {
        // Never log full tokens.
        let token_prefix = Self::token_prefix(&credential.access_token);
        let span = tracing::info_span!(
            "db",
            trace_id = field::Empty,
            span_id = field::Empty,
            db_system = %self.db_system,
            db_operation = "save_credential",
            user_id = %credential.user_id,
            token_prefix = %token_prefix,
            has_refresh_token = credential.refresh_token.is_some()
        );
        annotate_span_with_trace_ids(&span);
        async move { self.inner.save_credential(credential).await }
            .instrument(span)
            .await
    }

    async fn get_credential(&self, user_id: &str) -> Result<Option<Credential>, QuickstartError> {
        let span = self.user_span("get_credential", user_id);
        async move { self.inner.get_credential(user_id).await }
            .instrument(span)
            .await
    }

    async fn delete_credential(&self, user_id: &str) -> Result<(), QuickstartError> {
        let span = self.user_span("delete_credential", user_id);
        async move { self.inner.delete_credential(user_id).await }
            .instrument(span)
            .await
    }

    async fn count_credentials(&self) -> Result<i64, QuickstartError> {
        let span = self.span("count_credentials");
        async move { self.inner.count_credentials().await }
            .instrument(span)
            .await
    }

    async fn list_credentials(&self) -> Result<Vec<Credential>, QuickstartError> {
        let span = self.span("list_credentials");
        async move { self.inner.list_credentials().await }
            .instrument(span)
            .await
    }

    async fn healthcheck(&self) -> Result<(), QuickstartError> {
        let span = self.span("healthcheck");
        async move { self.inner.healthcheck().await }
            .instrument(span)
            .await
    }
}

pub mod admin;
pub mod attachment;
pub mod auth;
pub mod dashboard;
pub mod notify;

use actix_session::Session;
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};

use quickstart_core::{Credential, QuickstartError};

use crate::{session, AppState};

/// Tokens this close to expiry are refreshed before use.
const REFRESH_LEEWAY_SECS: i64 = 60;

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Host the request was addressed to, as used for callback URLs.
pub fn request_host(req: &HttpRequest) -> String {
    req.connection_info().host().to_string()
}

/// Return a credential whose access token is good for at least the leeway,
/// refreshing and persisting it when needed.
pub async fn ensure_fresh(
    state: &AppState,
    credential: Credential,
) -> Result<Credential, QuickstartError> {
    if !credential.needs_refresh_at(Utc::now(), Duration::seconds(REFRESH_LEEWAY_SECS)) {
        return Ok(credential);
    }

    let refresh_token = credential
        .refresh_token
        .clone()
        .ok_or_else(|| QuickstartError::oauth("credential has no refresh token"))?;

    let tokens = state
        .identity
        .refresh(&refresh_token)
        .await
        .map_err(|e| e.context("Unable to refresh token"))?;

    let credential = credential.refreshed(tokens);
    state
        .credentials
        .save_credential(&credential)
        .await
        .map_err(|e| e.context("Unable to store refreshed credential"))?;
    state.metrics.credentials_refreshed_total.inc();

    tracing::debug!(user_id = %credential.user_id, "refreshed access token");
    Ok(credential)
}

/// A session user with a usable credential.
pub struct SignedIn {
    pub user_id: String,
    pub credential: Credential,
}

/// Resolve the signed-in user. `None` means the browser must go through `/auth`.
pub async fn signed_in(
    state: &AppState,
    session: &Session,
) -> Result<Option<SignedIn>, QuickstartError> {
    let Some(user_id) = session::user_id(session)? else {
        return Ok(None);
    };

    let Some(credential) = state
        .credentials
        .get_credential(&user_id)
        .await
        .map_err(|e| e.context("Unable to retrieve credential"))?
    else {
        return Ok(None);
    };

    match ensure_fresh(state, credential).await {
        Ok(credential) => Ok(Some(SignedIn {
            user_id,
            credential,
        })),
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "credential unusable, re-authorizing");
            Ok(None)
        }
    }
}

/// Register every route of the application.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(dashboard::index))
        .route("/", web::post().to(dashboard::operation))
        .route("/auth", web::get().to(auth::auth))
        .route("/oauth2callback", web::get().to(auth::oauth2callback))
        .route("/signout", web::post().to(auth::signout))
        .route("/signout", web::get().to(auth::signout_page))
        .route("/notify", web::post().to(notify::notify))
        .route(
            "/processnotification",
            web::post().to(notify::process_notification),
        )
        .route("/attachmentproxy", web::get().to(attachment::proxy))
        .route("/health", web::get().to(admin::health))
        .route("/ready", web::get().to(admin::readiness))
        .route("/metrics", web::get().to(admin::system_metrics));
}

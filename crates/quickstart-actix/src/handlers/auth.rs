use actix_session::Session;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use quickstart_core::{
    user_id_for, Contact, Credential, QuickstartError, Subscription, TimelineItem,
    COLLECTION_TIMELINE, LEVEL_DEFAULT,
};

use super::{redirect, request_host};
use crate::{session, AppState};

/// Start the consent flow.
pub async fn auth(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
) -> Result<HttpResponse, QuickstartError> {
    let oauth_state = session::new_oauth_state();
    session::store_oauth_state(&session, &oauth_state)?;

    let redirect_uri = state
        .settings
        .full_url(&request_host(&req), "/oauth2callback");
    let url = state
        .identity
        .authorize_url(&redirect_uri, &oauth_state)
        .map_err(|e| e.context("Unable to build authorization URL"))?;

    Ok(redirect(&url))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Finish the consent flow: exchange the code, remember the user, and bootstrap their timeline.
pub async fn oauth2callback(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<CallbackQuery>,
) -> Result<HttpResponse, QuickstartError> {
    let expected = session::take_oauth_state(&session)?.unwrap_or_default();
    let provided = query.state.as_deref().unwrap_or_default();
    if !session::state_matches(&expected, provided) {
        return Err(QuickstartError::bad_request("OAuth state mismatch"));
    }

    if let Some(error) = &query.error {
        return Err(QuickstartError::oauth(error).context("Authorization was not granted"));
    }
    let code = query
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| QuickstartError::bad_request("Missing authorization code"))?;

    let callback_url = state
        .settings
        .full_url(&request_host(&req), "/oauth2callback");
    let tokens = state
        .identity
        .exchange_code(code, &callback_url)
        .await
        .map_err(|e| e.context("Unable to exchange code"))?;

    let profile = state
        .identity
        .user_info(&tokens.access_token)
        .await
        .map_err(|e| e.context("Unable to fetch user info"))?;
    let user_id = user_id_for(state.identity.client_id(), &profile.id);

    session::store_user_id(&session, &user_id)?;
    let credential = Credential::new(user_id.clone(), tokens);
    state
        .credentials
        .save_credential(&credential)
        .await
        .map_err(|e| e.context("Unable to store credential"))?;

    tracing::info!(user_id = %user_id, "user authorized");
    bootstrap_user(&state, &req, &user_id, &credential, &callback_url).await;

    Ok(redirect("/"))
}

/// First-login setup. Each step is best effort.
async fn bootstrap_user(
    state: &AppState,
    req: &HttpRequest,
    user_id: &str,
    credential: &Credential,
    callback_url: &str,
) {
    let token = credential.access_token.as_str();
    let settings = &state.settings;
    let host = request_host(req);

    if callback_url.starts_with("https") {
        let subscription = Subscription {
            collection: COLLECTION_TIMELINE.to_string(),
            user_token: Some(user_id.to_string()),
            callback_url: Some(settings.full_url(&host, "/notify")),
            ..Subscription::default()
        };
        if let Err(e) = state.mirror.insert_subscription(token, &subscription).await {
            tracing::warn!(user_id = %user_id, error = %e, "unable to subscribe new user");
        }

        let contact = Contact {
            id: Some(settings.contact_id.clone()),
            display_name: Some(settings.display_name.clone()),
            image_urls: vec![settings.resolve_link(&host, &settings.contact_image)],
        };
        if let Err(e) = state.mirror.insert_contact(token, &contact).await {
            tracing::warn!(user_id = %user_id, error = %e, "unable to insert contact for new user");
        }
    } else {
        tracing::info!("Post auth tasks are not supported on staging.");
    }

    let welcome = TimelineItem::text(format!("Welcome to the {}", settings.display_name))
        .with_notification(LEVEL_DEFAULT);
    if let Err(e) = state.mirror.insert_timeline_item(token, &welcome, None).await {
        tracing::warn!(user_id = %user_id, error = %e, "unable to insert welcome item");
    }
}

/// Revoke the user's grant and forget them.
pub async fn signout(
    state: web::Data<AppState>,
    session: Session,
) -> Result<HttpResponse, QuickstartError> {
    let Some(user_id) = session::user_id(&session)? else {
        return Ok(redirect("/auth"));
    };
    let Some(credential) = state
        .credentials
        .get_credential(&user_id)
        .await
        .map_err(|e| e.context("Unable to retrieve credential"))?
    else {
        return Ok(redirect("/auth"));
    };

    state
        .identity
        .revoke(credential.revocable_token())
        .await
        .map_err(|e| e.context("Unable to revoke token"))?;

    session::clear_user_id(&session);
    state
        .credentials
        .delete_credential(&user_id)
        .await
        .map_err(|e| e.context("Unable to delete credential"))?;

    tracing::info!(user_id = %user_id, "user signed out");
    Ok(redirect("/"))
}

pub async fn signout_page() -> HttpResponse {
    HttpResponse::Ok().finish()
}

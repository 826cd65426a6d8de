use actix_session::Session;
use actix_web::{http::header, web, HttpResponse};
use serde::Deserialize;

use quickstart_core::QuickstartError;

use super::{redirect, signed_in, SignedIn};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentQuery {
    pub timeline_item: Option<String>,
    pub attachment: Option<String>,
}

/// Stream an attachment's bytes to the browser with the user's authorization.
pub async fn proxy(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<AttachmentQuery>,
) -> Result<HttpResponse, QuickstartError> {
    let Some(SignedIn { credential, .. }) = signed_in(&state, &session).await? else {
        return Ok(redirect("/auth"));
    };

    let item_id = query.timeline_item.as_deref().filter(|v| !v.is_empty());
    let attachment_id = query.attachment.as_deref().filter(|v| !v.is_empty());
    let (Some(item_id), Some(attachment_id)) = (item_id, attachment_id) else {
        return Ok(HttpResponse::BadRequest().finish());
    };

    let token = credential.access_token.as_str();
    let attachment = state
        .mirror
        .get_attachment(token, item_id, attachment_id)
        .await
        .map_err(|e| e.context("Unable to retrieve attachment"))?;

    let content = state
        .mirror
        .fetch_content(token, &attachment.content_url)
        .await
        .map_err(|e| e.context("Unable to retrieve attachment content"))?;

    let mut response = HttpResponse::Ok();
    if let Some(content_type) = content.content_type.as_deref() {
        response.insert_header((header::CONTENT_TYPE, content_type));
    }
    Ok(response.streaming(content.body))
}

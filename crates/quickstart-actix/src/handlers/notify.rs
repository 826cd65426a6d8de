use actix_web::{web, HttpRequest, HttpResponse};

use quickstart_core::{
    Credential, Notification, NotificationCategory, QuickstartError, TimelineItem, UserAction,
    ACTION_NAVIGATE, ACTION_SHARE, LEVEL_DEFAULT,
};
use quickstart_tasks::Task;

use super::ensure_fresh;
use crate::AppState;

pub const PROCESS_NOTIFICATION_PATH: &str = "/processnotification";

/// Webhook receiver. The payload is handed to a deferred task untouched.
pub async fn notify(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, QuickstartError> {
    state.metrics.notifications_received_total.inc();

    let headers = req.headers().iter().filter_map(|(name, value)| {
        value
            .to_str()
            .ok()
            .map(|v| (name.as_str().to_string(), v.to_string()))
    });
    let task = Task::post(PROCESS_NOTIFICATION_PATH, body.to_vec()).with_headers(headers);

    let task_id = state
        .tasks
        .enqueue(task)
        .await
        .map_err(|e| e.context("Failed to add new task"))?;
    state.metrics.tasks_enqueued_total.inc();

    tracing::debug!(task_id = %task_id, "queued notification");
    Ok(HttpResponse::Ok().finish())
}

/// Deferred task target. Always answers 200 so the task is never retried.
pub async fn process_notification(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let notification: Notification = match serde_json::from_slice(&body) {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(error = %e, "unable to decode notification");
            drop_notification(&state, "decode");
            return HttpResponse::Ok().finish();
        }
    };

    let credential = match state.credentials.get_credential(&notification.user_token).await {
        Ok(Some(credential)) => credential,
        Ok(None) => {
            tracing::warn!(user_token = %notification.user_token, "notification for unknown user");
            drop_notification(&state, "unknown_user");
            return HttpResponse::Ok().finish();
        }
        Err(e) => {
            tracing::error!(user_token = %notification.user_token, error = %e, "unable to load credential");
            drop_notification(&state, "storage");
            return HttpResponse::Ok().finish();
        }
    };

    let credential = match ensure_fresh(&state, credential).await {
        Ok(credential) => credential,
        Err(e) => {
            tracing::warn!(user_token = %notification.user_token, error = %e, "unable to refresh credential");
            drop_notification(&state, "refresh");
            return HttpResponse::Ok().finish();
        }
    };

    let category = notification.category();
    let result = match category {
        NotificationCategory::Locations => handle_location(&state, &notification, &credential).await,
        NotificationCategory::Timeline => handle_timeline(&state, &notification, &credential).await,
        NotificationCategory::Other => {
            tracing::debug!(collection = %notification.collection, "ignoring notification");
            Ok(())
        }
    };

    match result {
        Ok(()) => state
            .metrics
            .notifications_processed_total
            .with_label_values(&[category_label(category)])
            .inc(),
        Err(e) => {
            tracing::error!(
                collection = %notification.collection,
                item_id = %notification.item_id,
                error = %e,
                "unable to process notification"
            );
            drop_notification(&state, "remote_error");
        }
    }

    HttpResponse::Ok().finish()
}

fn drop_notification(state: &AppState, reason: &str) {
    state
        .metrics
        .notifications_dropped_total
        .with_label_values(&[reason])
        .inc();
}

fn category_label(category: NotificationCategory) -> &'static str {
    match category {
        NotificationCategory::Timeline => "timeline",
        NotificationCategory::Locations => "locations",
        NotificationCategory::Other => "other",
    }
}

pub fn location_text(display_name: &str, latitude: f64, longitude: f64) -> String {
    format!("{display_name} says you are at {latitude:.6} by {longitude:.6}.")
}

pub fn shared_photo_text(display_name: &str, original: &str) -> String {
    format!("{display_name} got your photo! {original}")
}

async fn handle_location(
    state: &AppState,
    notification: &Notification,
    credential: &Credential,
) -> Result<(), QuickstartError> {
    let token = credential.access_token.as_str();
    let location = state
        .mirror
        .get_location(token, &notification.item_id)
        .await
        .map_err(|e| e.context("Unable to retrieve location"))?;

    let text = location_text(
        &state.settings.display_name,
        location.latitude,
        location.longitude,
    );
    let mut item = TimelineItem::text(text)
        .with_menu_item(ACTION_NAVIGATE)
        .with_notification(LEVEL_DEFAULT);
    item.location = Some(location);

    state
        .mirror
        .insert_timeline_item(token, &item, None)
        .await
        .map_err(|e| e.context("Unable to insert timeline item"))?;
    Ok(())
}

async fn handle_timeline(
    state: &AppState,
    notification: &Notification,
    credential: &Credential,
) -> Result<(), QuickstartError> {
    let token = credential.access_token.as_str();

    for UserAction { kind, .. } in &notification.user_actions {
        if kind != ACTION_SHARE {
            tracing::info!(action = %kind, "ignoring user action");
            continue;
        }

        let item = state
            .mirror
            .get_timeline_item(token, &notification.item_id)
            .await
            .map_err(|e| e.context("Unable to retrieve timeline item"))?;

        let original = item.text.as_deref().unwrap_or_default();
        let patch = TimelineItem::text(shared_photo_text(&state.settings.display_name, original));
        state
            .mirror
            .patch_timeline_item(token, &notification.item_id, &patch)
            .await
            .map_err(|e| e.context("Unable to patch timeline item"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_text_uses_six_decimals() {
        assert_eq!(
            location_text("Mirror Quickstart", 37.4, -122.1),
            "Mirror Quickstart says you are at 37.400000 by -122.100000."
        );
    }

    #[test]
    fn shared_photo_keeps_original_text() {
        assert_eq!(
            shared_photo_text("Mirror Quickstart", "sunset"),
            "Mirror Quickstart got your photo! sunset"
        );
    }
}

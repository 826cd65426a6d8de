use actix_session::Session;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use quickstart_core::{
    Contact, Credential, QuickstartError, Subscription, TimelineItem, ACTION_REPLY,
    COLLECTION_LOCATIONS, COLLECTION_TIMELINE, LEVEL_AUDIO_ONLY,
};

use super::{ensure_fresh, redirect, request_host, signed_in, SignedIn};
use crate::templates::{render_dashboard, DashboardPage};
use crate::AppState;

const BROADCAST_TEXT: &str = "Hello Everyone!";
const LUNCH_TEXT: &str = "Tell me what you had for lunch :)";

/// Fields posted by the dashboard forms. Each operation reads its own subset.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationForm {
    pub operation: Option<String>,
    pub collection: Option<String>,
    pub subscription_id: Option<String>,
    pub message: Option<String>,
    pub html: Option<String>,
    pub image_url: Option<String>,
    pub name: Option<String>,
    pub id: Option<String>,
    pub item_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    InsertSubscription,
    DeleteSubscription,
    InsertItem,
    InsertItemWithAction,
    InsertItemAllUsers,
    InsertContact,
    DeleteContact,
    DeleteTimelineItem,
}

impl Operation {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "insertSubscription" => Some(Self::InsertSubscription),
            "deleteSubscription" => Some(Self::DeleteSubscription),
            "insertItem" => Some(Self::InsertItem),
            "insertItemWithAction" => Some(Self::InsertItemWithAction),
            "insertItemAllUsers" => Some(Self::InsertItemAllUsers),
            "insertContact" => Some(Self::InsertContact),
            "deleteContact" => Some(Self::DeleteContact),
            "deleteTimelineItem" => Some(Self::DeleteTimelineItem),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsertSubscription => "insertSubscription",
            Self::DeleteSubscription => "deleteSubscription",
            Self::InsertItem => "insertItem",
            Self::InsertItemWithAction => "insertItemWithAction",
            Self::InsertItemAllUsers => "insertItemAllUsers",
            Self::InsertContact => "insertContact",
            Self::DeleteContact => "deleteContact",
            Self::DeleteTimelineItem => "deleteTimelineItem",
        }
    }
}

/// Render the dashboard for the signed-in user.
pub async fn index(
    state: web::Data<AppState>,
    session: Session,
) -> Result<HttpResponse, QuickstartError> {
    let Some(SignedIn {
        user_id,
        credential,
    }) = signed_in(&state, &session).await?
    else {
        return Ok(redirect("/auth"));
    };
    let token = credential.access_token.as_str();
    let settings = &state.settings;

    let timeline_items = state
        .mirror
        .list_timeline(token, settings.timeline_page_size)
        .await
        .map_err(|e| e.context("Unable to retrieve timeline items"))?;

    let contact = match state.mirror.get_contact(token, &settings.contact_id).await {
        Ok(contact) => Some(contact),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e.context("Unable to retrieve contact")),
    };

    let subscriptions = state
        .mirror
        .list_subscriptions(token)
        .await
        .map_err(|e| e.context("Unable to retrieve subscriptions"))?;
    let subscribed = |collection: &str| {
        subscriptions
            .iter()
            .any(|s| s.id.as_deref() == Some(collection) || s.collection == collection)
    };

    let message = match state.messages.take(&user_id).await {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "unable to read flash message");
            None
        }
    };

    let page = DashboardPage {
        display_name: settings.display_name.clone(),
        message,
        timeline_items,
        contact,
        contact_id: settings.contact_id.clone(),
        contact_image: settings.contact_image.clone(),
        timeline_subscription_exists: subscribed(COLLECTION_TIMELINE),
        location_subscription_exists: subscribed(COLLECTION_LOCATIONS),
    };
    let body = render_dashboard(&state.templates, &page)?;

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}

/// Run a dashboard operation, leave the outcome as a flash message, and go back to `/`.
pub async fn operation(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
    form: web::Form<OperationForm>,
) -> Result<HttpResponse, QuickstartError> {
    let Some(SignedIn {
        user_id,
        credential,
    }) = signed_in(&state, &session).await?
    else {
        return Ok(redirect("/auth"));
    };
    let form = form.into_inner();
    let host = request_host(&req);

    let requested = form.operation.clone().unwrap_or_default();
    let op = Operation::parse(&requested);
    state
        .metrics
        .dashboard_operations_total
        .with_label_values(&[op.map(|o| o.as_str()).unwrap_or("unknown")])
        .inc();

    let message = match op {
        Some(op) => run_operation(&state, op, &form, &user_id, &credential, &host).await,
        None => format!("I don't know how to {requested}"),
    };

    if let Err(e) = state
        .messages
        .set(&user_id, &message, state.settings.message_ttl)
        .await
    {
        tracing::warn!(user_id = %user_id, error = %e, "unable to store flash message");
    }

    Ok(redirect("/"))
}

async fn run_operation(
    state: &AppState,
    op: Operation,
    form: &OperationForm,
    user_id: &str,
    credential: &Credential,
    host: &str,
) -> String {
    let token = credential.access_token.as_str();
    let mirror = &state.mirror;
    let settings = &state.settings;

    match op {
        Operation::InsertSubscription => {
            let collection = form
                .collection
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| COLLECTION_TIMELINE.to_string());
            let subscription = Subscription {
                collection,
                user_token: Some(user_id.to_string()),
                callback_url: Some(settings.full_url(host, "/notify")),
                ..Subscription::default()
            };
            match mirror.insert_subscription(token, &subscription).await {
                Ok(_) => "Application is now subscribed to updates.".to_string(),
                Err(e) => format!("Unable to subscribe: {e}"),
            }
        }
        Operation::DeleteSubscription => {
            let id = form.subscription_id.as_deref().unwrap_or_default();
            match mirror.delete_subscription(token, id).await {
                Ok(()) => "Application has been unsubscribed.".to_string(),
                Err(e) => format!("Unable to unsubscribe: {e}"),
            }
        }
        Operation::InsertItem => {
            let message = form.message.clone().unwrap_or_default();
            let mut item = TimelineItem::default().with_notification(LEVEL_AUDIO_ONLY);
            if form.html.as_deref() == Some("on") {
                item.html = Some(message);
            } else {
                item.text = Some(message);
            }

            let media = match form.image_url.as_deref().filter(|u| !u.is_empty()) {
                Some(link) => {
                    let url = settings.resolve_link(host, link);
                    match mirror.download_media(&url).await {
                        Ok(media) => Some(media),
                        Err(e) => {
                            tracing::warn!(url = %url, error = %e, "unable to download media, inserting without it");
                            None
                        }
                    }
                }
                None => None,
            };

            match mirror.insert_timeline_item(token, &item, media).await {
                Ok(_) => "A timeline item has been inserted.".to_string(),
                Err(e) => format!("Unable to insert timeline item: {e}"),
            }
        }
        Operation::InsertItemWithAction => {
            let mut item = TimelineItem::text(LUNCH_TEXT)
                .with_notification(LEVEL_AUDIO_ONLY)
                .with_menu_item(ACTION_REPLY);
            item.creator = Some(Contact {
                display_name: Some(settings.display_name.clone()),
                ..Contact::default()
            });
            match mirror.insert_timeline_item(token, &item, None).await {
                Ok(_) => "A timeline item with action has been inserted.".to_string(),
                Err(e) => format!("Unable to insert timeline item: {e}"),
            }
        }
        Operation::InsertItemAllUsers => broadcast(state).await,
        Operation::InsertContact => {
            let name = form.name.as_deref().filter(|n| !n.is_empty());
            let image = form.image_url.as_deref().filter(|u| !u.is_empty());
            let (Some(name), Some(image)) = (name, image) else {
                return "Must specify imageUrl and name to insert contact".to_string();
            };
            let contact = Contact {
                id: Some(Contact::id_from_name(name)),
                display_name: Some(name.to_string()),
                image_urls: vec![settings.resolve_link(host, image)],
            };
            match mirror.insert_contact(token, &contact).await {
                Ok(_) => format!("Inserted contact: {name}"),
                Err(e) => format!("Unable to insert contact: {e}"),
            }
        }
        Operation::DeleteContact => {
            let id = Contact::id_from_name(form.id.as_deref().unwrap_or_default());
            match mirror.delete_contact(token, &id).await {
                Ok(()) => "Contact has been deleted.".to_string(),
                Err(e) => format!("Unable to delete contact: {e}"),
            }
        }
        Operation::DeleteTimelineItem => {
            let id = form.item_id.as_deref().unwrap_or_default();
            match mirror.delete_timeline_item(token, id).await {
                Ok(()) => "A timeline item has been deleted.".to_string(),
                Err(e) => format!("An error occurred: {e}"),
            }
        }
    }
}

/// Send the greeting card to every stored user, unless there are too many of them.
async fn broadcast(state: &AppState) -> String {
    let total = match state.credentials.count_credentials().await {
        Ok(total) => total,
        Err(e) => return format!("Unable to fetch users: {e}"),
    };
    if total > state.settings.broadcast_limit {
        return format!("Total user count is {total}. Aborting broadcast to save your quota");
    }

    let credentials = match state.credentials.list_credentials().await {
        Ok(credentials) => credentials,
        Err(e) => return format!("Unable to fetch users: {e}"),
    };

    let item = TimelineItem::text(BROADCAST_TEXT).with_notification(LEVEL_AUDIO_ONLY);
    let mut failed = 0usize;
    for credential in &credentials {
        let user_id = credential.user_id.clone();
        let result = match ensure_fresh(state, credential.clone()).await {
            Ok(fresh) => state
                .mirror
                .insert_timeline_item(&fresh.access_token, &item, None)
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(user_id = %user_id, error = %e, "broadcast insert failed");
            state.metrics.broadcast_failures_total.inc();
            failed += 1;
        }
    }

    format!("Sent cards to {} ({failed} failed).", credentials.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_parse_by_form_name() {
        for name in [
            "insertSubscription",
            "deleteSubscription",
            "insertItem",
            "insertItemWithAction",
            "insertItemAllUsers",
            "insertContact",
            "deleteContact",
            "deleteTimelineItem",
        ] {
            let op = Operation::parse(name).expect("known operation");
            assert_eq!(op.as_str(), name);
        }
        assert_eq!(Operation::parse("dance"), None);
        assert_eq!(Operation::parse(""), None);
    }

    #[test]
    fn form_uses_camel_case_names() {
        let form: OperationForm = decode_form(
            "operation=deleteTimelineItem&itemId=abc&subscriptionId=timeline&imageUrl=%2Fx.png",
        );
        assert_eq!(form.operation.as_deref(), Some("deleteTimelineItem"));
        assert_eq!(form.item_id.as_deref(), Some("abc"));
        assert_eq!(form.subscription_id.as_deref(), Some("timeline"));
        assert_eq!(form.image_url.as_deref(), Some("/x.png"));
        assert!(form.name.is_none());
    }

    fn decode_form(raw: &str) -> OperationForm {
        web::Query::<OperationForm>::from_query(raw)
            .expect("decode form")
            .into_inner()
    }
}

//! Resources of the remote timeline service, in its JSON wire shape.

use serde::{Deserialize, Serialize};

pub const COLLECTION_TIMELINE: &str = "timeline";
pub const COLLECTION_LOCATIONS: &str = "locations";

pub const LEVEL_DEFAULT: &str = "DEFAULT";
pub const LEVEL_AUDIO_ONLY: &str = "AUDIO_ONLY";

pub const ACTION_REPLY: &str = "REPLY";
pub const ACTION_NAVIGATE: &str = "NAVIGATE";
pub const ACTION_SHARE: &str = "SHARE";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationConfig {
    pub level: String,
}

impl NotificationConfig {
    pub fn level(level: &str) -> Self {
        Self {
            level: level.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub action: String,
}

impl MenuItem {
    pub fn action(action: &str) -> Self {
        Self {
            id: None,
            action: action.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,
}

impl Contact {
    /// Contact ids cannot contain spaces; the demo derives them from display names.
    pub fn id_from_name(name: &str) -> String {
        name.replace(' ', "_")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub content_url: String,
    #[serde(default)]
    pub is_processing_content: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub menu_items: Vec<MenuItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

impl TimelineItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_notification(mut self, level: &str) -> Self {
        self.notification = Some(NotificationConfig::level(level));
        self
    }

    pub fn with_menu_item(mut self, action: &str) -> Self {
        self.menu_items.push(MenuItem::action(action));
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_token: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operation: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

/// Push notification body posted by the remote service to `/notify`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub collection: String,
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub user_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_token: Option<String>,
    #[serde(default)]
    pub user_actions: Vec<UserAction>,
}

/// Which handler a notification belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationCategory {
    Timeline,
    Locations,
    Other,
}

impl Notification {
    pub fn category(&self) -> NotificationCategory {
        match self.collection.as_str() {
            COLLECTION_TIMELINE => NotificationCategory::Timeline,
            COLLECTION_LOCATIONS => NotificationCategory::Locations,
            _ => NotificationCategory::Other,
        }
    }
}

/// Profile returned by the identity provider's userinfo endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineList {
    #[serde(default)]
    pub items: Vec<TimelineItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionList {
    #[serde(default)]
    pub items: Vec<Subscription>,
}

/// Binary payload uploaded alongside a timeline item.
#[derive(Debug, Clone, PartialEq)]
pub struct Media {
    pub content_type: String,
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_decodes_wire_format() {
        let raw = r#"{
            "collection": "timeline",
            "itemId": "item-1",
            "operation": "UPDATE",
            "userToken": "app_42",
            "verifyToken": "v",
            "userActions": [{"type": "SHARE"}, {"type": "REPLY", "payload": "x"}]
        }"#;
        let n: Notification = serde_json::from_str(raw).expect("decode");
        assert_eq!(n.category(), NotificationCategory::Timeline);
        assert_eq!(n.item_id, "item-1");
        assert_eq!(n.user_token, "app_42");
        assert_eq!(n.user_actions.len(), 2);
        assert_eq!(n.user_actions[0].kind, ACTION_SHARE);
    }

    #[test]
    fn unknown_collection_is_other() {
        let n = Notification {
            collection: "contacts".to_string(),
            ..Notification::default()
        };
        assert_eq!(n.category(), NotificationCategory::Other);
    }

    #[test]
    fn timeline_item_omits_empty_fields() {
        let item = TimelineItem::text("hi")
            .with_notification(LEVEL_AUDIO_ONLY)
            .with_menu_item(ACTION_REPLY);
        let json = serde_json::to_value(&item).expect("encode");
        assert_eq!(json["text"], "hi");
        assert_eq!(json["notification"]["level"], "AUDIO_ONLY");
        assert_eq!(json["menuItems"][0]["action"], "REPLY");
        assert!(json.get("html").is_none());
        assert!(json.get("attachments").is_none());
    }

    #[test]
    fn contact_id_replaces_spaces() {
        assert_eq!(Contact::id_from_name("Mirror Quick Start"), "Mirror_Quick_Start");
    }
}

//! In-process stand-ins for the remote collaborators.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use quickstart_core::{
    Attachment, Contact, Location, Media, OAuthTokens, QuickstartError, Subscription,
    TimelineItem, UserInfo,
};
use quickstart_ports::{IdentityProvider, MirrorApi, RemoteContent};
use quickstart_tasks::{Task, TaskQueue};

pub const CLIENT_ID: &str = "1234.apps.googleusercontent.com";
pub const SUBJECT_ID: &str = "42";
pub const USER_ID: &str = "1234_42";
pub const ATTACHMENT_BYTES: &[u8] = b"\xff\xd8jpeg-bytes";

#[derive(Debug, Clone, PartialEq)]
pub enum MirrorCall {
    ListTimeline,
    GetItem(String),
    InsertItem {
        token: String,
        item: TimelineItem,
        media: Option<Media>,
    },
    PatchItem {
        id: String,
        patch: TimelineItem,
    },
    DeleteItem(String),
    GetAttachment {
        item_id: String,
        attachment_id: String,
    },
    GetContact(String),
    InsertContact(Contact),
    DeleteContact(String),
    ListSubscriptions,
    InsertSubscription(Subscription),
    DeleteSubscription(String),
    GetLocation(String),
    FetchContent(String),
    DownloadMedia(String),
}

pub struct FakeMirror {
    pub calls: Mutex<Vec<MirrorCall>>,
    pub contact_exists: AtomicBool,
    pub subscriptions: Mutex<Vec<Subscription>>,
    pub item_text: String,
    pub location: Location,
}

impl Default for FakeMirror {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            contact_exists: AtomicBool::new(false),
            subscriptions: Mutex::new(Vec::new()),
            item_text: "original".to_string(),
            location: Location {
                id: Some("latest".to_string()),
                latitude: 37.422,
                longitude: -122.084,
                ..Location::default()
            },
        }
    }
}

impl FakeMirror {
    fn record(&self, call: MirrorCall) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<MirrorCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn inserted_items(&self) -> Vec<(String, TimelineItem, Option<Media>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MirrorCall::InsertItem { token, item, media } => Some((token, item, media)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl MirrorApi for FakeMirror {
    async fn list_timeline(
        &self,
        _access_token: &str,
        _max_results: u32,
    ) -> Result<Vec<TimelineItem>, QuickstartError> {
        self.record(MirrorCall::ListTimeline);
        Ok(vec![TimelineItem {
            id: Some("item-1".to_string()),
            text: Some("card on the timeline".to_string()),
            ..TimelineItem::default()
        }])
    }

    async fn get_timeline_item(
        &self,
        _access_token: &str,
        item_id: &str,
    ) -> Result<TimelineItem, QuickstartError> {
        self.record(MirrorCall::GetItem(item_id.to_string()));
        Ok(TimelineItem {
            id: Some(item_id.to_string()),
            text: Some(self.item_text.clone()),
            ..TimelineItem::default()
        })
    }

    async fn insert_timeline_item(
        &self,
        access_token: &str,
        item: &TimelineItem,
        media: Option<Media>,
    ) -> Result<TimelineItem, QuickstartError> {
        self.record(MirrorCall::InsertItem {
            token: access_token.to_string(),
            item: item.clone(),
            media,
        });
        Ok(TimelineItem {
            id: Some("new-item".to_string()),
            ..item.clone()
        })
    }

    async fn patch_timeline_item(
        &self,
        _access_token: &str,
        item_id: &str,
        patch: &TimelineItem,
    ) -> Result<TimelineItem, QuickstartError> {
        self.record(MirrorCall::PatchItem {
            id: item_id.to_string(),
            patch: patch.clone(),
        });
        Ok(patch.clone())
    }

    async fn delete_timeline_item(
        &self,
        _access_token: &str,
        item_id: &str,
    ) -> Result<(), QuickstartError> {
        self.record(MirrorCall::DeleteItem(item_id.to_string()));
        Ok(())
    }

    async fn get_attachment(
        &self,
        _access_token: &str,
        item_id: &str,
        attachment_id: &str,
    ) -> Result<Attachment, QuickstartError> {
        self.record(MirrorCall::GetAttachment {
            item_id: item_id.to_string(),
            attachment_id: attachment_id.to_string(),
        });
        Ok(Attachment {
            id: attachment_id.to_string(),
            content_type: "image/jpeg".to_string(),
            content_url: format!("https://mirror.example/content/{attachment_id}"),
            is_processing_content: false,
        })
    }

    async fn get_contact(
        &self,
        _access_token: &str,
        contact_id: &str,
    ) -> Result<Contact, QuickstartError> {
        self.record(MirrorCall::GetContact(contact_id.to_string()));
        if self.contact_exists.load(Ordering::SeqCst) {
            Ok(Contact {
                id: Some(contact_id.to_string()),
                display_name: Some("Mirror Quickstart".to_string()),
                image_urls: Vec::new(),
            })
        } else {
            Err(QuickstartError::remote(Some(404), "contact not found"))
        }
    }

    async fn insert_contact(
        &self,
        _access_token: &str,
        contact: &Contact,
    ) -> Result<Contact, QuickstartError> {
        self.record(MirrorCall::InsertContact(contact.clone()));
        Ok(contact.clone())
    }

    async fn delete_contact(
        &self,
        _access_token: &str,
        contact_id: &str,
    ) -> Result<(), QuickstartError> {
        self.record(MirrorCall::DeleteContact(contact_id.to_string()));
        Ok(())
    }

    async fn list_subscriptions(
        &self,
        _access_token: &str,
    ) -> Result<Vec<Subscription>, QuickstartError> {
        self.record(MirrorCall::ListSubscriptions);
        Ok(self.subscriptions.lock().unwrap().clone())
    }

    async fn insert_subscription(
        &self,
        _access_token: &str,
        subscription: &Subscription,
    ) -> Result<Subscription, QuickstartError> {
        self.record(MirrorCall::InsertSubscription(subscription.clone()));
        Ok(subscription.clone())
    }

    async fn delete_subscription(
        &self,
        _access_token: &str,
        subscription_id: &str,
    ) -> Result<(), QuickstartError> {
        self.record(MirrorCall::DeleteSubscription(subscription_id.to_string()));
        Ok(())
    }

    async fn get_location(
        &self,
        _access_token: &str,
        location_id: &str,
    ) -> Result<Location, QuickstartError> {
        self.record(MirrorCall::GetLocation(location_id.to_string()));
        Ok(self.location.clone())
    }

    async fn fetch_content(
        &self,
        _access_token: &str,
        url: &str,
    ) -> Result<RemoteContent, QuickstartError> {
        self.record(MirrorCall::FetchContent(url.to_string()));
        let chunk: Result<Bytes, QuickstartError> = Ok(Bytes::from_static(ATTACHMENT_BYTES));
        Ok(RemoteContent {
            content_type: Some("image/jpeg".to_string()),
            body: futures::stream::iter(vec![chunk]).boxed(),
        })
    }

    async fn download_media(&self, url: &str) -> Result<Media, QuickstartError> {
        self.record(MirrorCall::DownloadMedia(url.to_string()));
        Ok(Media {
            content_type: "image/svg+xml".to_string(),
            data: b"<svg/>".to_vec(),
        })
    }
}

#[derive(Default)]
pub struct FakeIdentity {
    pub revoked: Mutex<Vec<String>>,
    pub refreshed: Mutex<Vec<String>>,
    pub fail_revoke: AtomicBool,
    pub fail_refresh: AtomicBool,
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    fn client_id(&self) -> &str {
        CLIENT_ID
    }

    fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<String, QuickstartError> {
        Ok(format!(
            "https://accounts.example/auth?redirect_uri={redirect_uri}&state={state}&access_type=offline"
        ))
    }

    async fn exchange_code(
        &self,
        code: &str,
        _redirect_uri: &str,
    ) -> Result<OAuthTokens, QuickstartError> {
        Ok(OAuthTokens::new(
            format!("access-{code}"),
            Some(format!("refresh-{code}")),
            Some(3600),
        ))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens, QuickstartError> {
        self.refreshed.lock().unwrap().push(refresh_token.to_string());
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(QuickstartError::oauth("invalid_grant"));
        }
        Ok(OAuthTokens::new("access-refreshed".to_string(), None, Some(3600)))
    }

    async fn revoke(&self, token: &str) -> Result<(), QuickstartError> {
        if self.fail_revoke.load(Ordering::SeqCst) {
            return Err(QuickstartError::oauth("revocation endpoint unavailable"));
        }
        self.revoked.lock().unwrap().push(token.to_string());
        Ok(())
    }

    async fn user_info(&self, _access_token: &str) -> Result<UserInfo, QuickstartError> {
        Ok(UserInfo {
            id: SUBJECT_ID.to_string(),
            name: Some("Test User".to_string()),
            ..UserInfo::default()
        })
    }
}

#[derive(Default)]
pub struct FakeTaskQueue {
    pub tasks: Mutex<Vec<Task>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl TaskQueue for FakeTaskQueue {
    async fn enqueue(&self, task: Task) -> Result<String, QuickstartError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(QuickstartError::task_queue("queue is closed"));
        }
        let id = task.id.clone();
        self.tasks.lock().unwrap().push(task);
        Ok(id)
    }
}

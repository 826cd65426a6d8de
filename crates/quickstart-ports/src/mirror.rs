use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::sync::Arc;

use quickstart_core::{
    Attachment, Contact, Location, Media, QuickstartError, Subscription, TimelineItem,
};

/// Raw bytes fetched from the remote service on the user's behalf.
pub struct RemoteContent {
    pub content_type: Option<String>,
    pub body: BoxStream<'static, Result<Bytes, QuickstartError>>,
}

/// The remote timeline REST API.
///
/// Every call is made on behalf of one user and carries that user's access token.
#[async_trait]
pub trait MirrorApi: Send + Sync {
    async fn list_timeline(
        &self,
        access_token: &str,
        max_results: u32,
    ) -> Result<Vec<TimelineItem>, QuickstartError>;

    async fn get_timeline_item(
        &self,
        access_token: &str,
        item_id: &str,
    ) -> Result<TimelineItem, QuickstartError>;

    /// Insert an item, uploading `media` alongside it when present.
    async fn insert_timeline_item(
        &self,
        access_token: &str,
        item: &TimelineItem,
        media: Option<Media>,
    ) -> Result<TimelineItem, QuickstartError>;

    async fn patch_timeline_item(
        &self,
        access_token: &str,
        item_id: &str,
        patch: &TimelineItem,
    ) -> Result<TimelineItem, QuickstartError>;

    async fn delete_timeline_item(
        &self,
        access_token: &str,
        item_id: &str,
    ) -> Result<(), QuickstartError>;

    async fn get_attachment(
        &self,
        access_token: &str,
        item_id: &str,
        attachment_id: &str,
    ) -> Result<Attachment, QuickstartError>;

    async fn get_contact(
        &self,
        access_token: &str,
        contact_id: &str,
    ) -> Result<Contact, QuickstartError>;

    async fn insert_contact(
        &self,
        access_token: &str,
        contact: &Contact,
    ) -> Result<Contact, QuickstartError>;

    async fn delete_contact(
        &self,
        access_token: &str,
        contact_id: &str,
    ) -> Result<(), QuickstartError>;

    async fn list_subscriptions(
        &self,
        access_token: &str,
    ) -> Result<Vec<Subscription>, QuickstartError>;

    async fn insert_subscription(
        &self,
        access_token: &str,
        subscription: &Subscription,
    ) -> Result<Subscription, QuickstartError>;

    async fn delete_subscription(
        &self,
        access_token: &str,
        subscription_id: &str,
    ) -> Result<(), QuickstartError>;

    async fn get_location(
        &self,
        access_token: &str,
        location_id: &str,
    ) -> Result<Location, QuickstartError>;

    /// Stream an authorized URL (attachment content) back to the caller.
    async fn fetch_content(
        &self,
        access_token: &str,
        url: &str,
    ) -> Result<RemoteContent, QuickstartError>;

    /// Download a public URL to attach as media. No authorization is sent.
    async fn download_media(&self, url: &str) -> Result<Media, QuickstartError>;
}

pub type DynMirrorApi = Arc<dyn MirrorApi>;

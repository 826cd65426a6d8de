use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::{header::CONTENT_TYPE, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use quickstart_config::MirrorConfig;
use quickstart_core::{
    Attachment, Contact, Location, Media, QuickstartError, Subscription, SubscriptionList,
    TimelineItem, TimelineList,
};
use quickstart_ports::{MirrorApi, RemoteContent};

use crate::multipart::related_body;

const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// `MirrorApi` over HTTPS. One instance is shared by all users; the access token
/// travels with each call.
pub struct MirrorClient {
    http: reqwest::Client,
    base_url: Url,
    upload_url: Url,
}

impl MirrorClient {
    pub fn new(config: &MirrorConfig) -> Result<Self, QuickstartError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| QuickstartError::remote(None, &format!("failed to build HTTP client: {e}")))?;
        Self::with_client(http, &config.base_url, &config.upload_url)
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        upload_url: &str,
    ) -> Result<Self, QuickstartError> {
        let parse = |raw: &str, name: &str| {
            Url::parse(raw).map_err(|e| QuickstartError::config(&format!("invalid {name}: {e}")))
        };
        Ok(Self {
            http,
            base_url: parse(base_url, "mirror.base_url")?,
            upload_url: parse(upload_url, "mirror.upload_url")?,
        })
    }

    /// `base` joined with percent-encoded path segments.
    fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, QuickstartError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| QuickstartError::config("mirror base url cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn api(&self, segments: &[&str]) -> Result<Url, QuickstartError> {
        Self::endpoint(&self.base_url, segments)
    }

    fn authorized(&self, method: Method, url: Url, access_token: &str) -> RequestBuilder {
        self.http.request(method, url).bearer_auth(access_token)
    }

    /// Non-2xx responses become `remote` errors carrying the upstream status and body.
    async fn checked(request: RequestBuilder) -> Result<Response, QuickstartError> {
        let response = request
            .send()
            .await
            .map_err(|e| QuickstartError::remote(None, &e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = %status, "remote call failed");
        let description = if body.is_empty() {
            status.to_string()
        } else {
            body
        };
        Err(QuickstartError::remote(Some(status.as_u16()), &description))
    }

    async fn json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, QuickstartError> {
        Self::checked(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| QuickstartError::remote(None, &format!("invalid response body: {e}")))
    }

    fn content_type_of(response: &Response) -> Option<String> {
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

#[async_trait]
impl MirrorApi for MirrorClient {
    async fn list_timeline(
        &self,
        access_token: &str,
        max_results: u32,
    ) -> Result<Vec<TimelineItem>, QuickstartError> {
        let mut url = self.api(&["timeline"])?;
        url.query_pairs_mut()
            .append_pair("maxResults", &max_results.to_string());

        let list: TimelineList =
            Self::json(self.authorized(Method::GET, url, access_token)).await?;
        Ok(list.items)
    }

    async fn get_timeline_item(
        &self,
        access_token: &str,
        item_id: &str,
    ) -> Result<TimelineItem, QuickstartError> {
        let url = self.api(&["timeline", item_id])?;
        Self::json(self.authorized(Method::GET, url, access_token)).await
    }

    async fn insert_timeline_item(
        &self,
        access_token: &str,
        item: &TimelineItem,
        media: Option<Media>,
    ) -> Result<TimelineItem, QuickstartError> {
        match media {
            None => {
                let url = self.api(&["timeline"])?;
                Self::json(self.authorized(Method::POST, url, access_token).json(item)).await
            }
            Some(media) => {
                let mut url = Self::endpoint(&self.upload_url, &["timeline"])?;
                url.query_pairs_mut().append_pair("uploadType", "multipart");

                let boundary = uuid::Uuid::new_v4().simple().to_string();
                let related = related_body(item, &media, &boundary)?;
                Self::json(
                    self.authorized(Method::POST, url, access_token)
                        .header(CONTENT_TYPE, related.content_type)
                        .body(related.body),
                )
                .await
            }
        }
    }

    async fn patch_timeline_item(
        &self,
        access_token: &str,
        item_id: &str,
        patch: &TimelineItem,
    ) -> Result<TimelineItem, QuickstartError> {
        let url = self.api(&["timeline", item_id])?;
        Self::json(self.authorized(Method::PATCH, url, access_token).json(patch)).await
    }

    async fn delete_timeline_item(
        &self,
        access_token: &str,
        item_id: &str,
    ) -> Result<(), QuickstartError> {
        let url = self.api(&["timeline", item_id])?;
        Self::checked(self.authorized(Method::DELETE, url, access_token)).await?;
        Ok(())
    }

    async fn get_attachment(
        &self,
        access_token: &str,
        item_id: &str,
        attachment_id: &str,
    ) -> Result<Attachment, QuickstartError> {
        let url = self.api(&["timeline", item_id, "attachments", attachment_id])?;
        Self::json(self.authorized(Method::GET, url, access_token)).await
    }

    async fn get_contact(
        &self,
        access_token: &str,
        contact_id: &str,
    ) -> Result<Contact, QuickstartError> {
        let url = self.api(&["contacts", contact_id])?;
        Self::json(self.authorized(Method::GET, url, access_token)).await
    }

    async fn insert_contact(
        &self,
        access_token: &str,
        contact: &Contact,
    ) -> Result<Contact, QuickstartError> {
        let url = self.api(&["contacts"])?;
        Self::json(self.authorized(Method::POST, url, access_token).json(contact)).await
    }

    async fn delete_contact(
        &self,
        access_token: &str,
        contact_id: &str,
    ) -> Result<(), QuickstartError> {
        let url = self.api(&["contacts", contact_id])?;
        Self::checked(self.authorized(Method::DELETE, url, access_token)).await?;
        Ok(())
    }

    async fn list_subscriptions(
        &self,
        access_token: &str,
    ) -> Result<Vec<Subscription>, QuickstartError> {
        let url = self.api(&["subscriptions"])?;
        let list: SubscriptionList =
            Self::json(self.authorized(Method::GET, url, access_token)).await?;
        Ok(list.items)
    }

    async fn insert_subscription(
        &self,
        access_token: &str,
        subscription: &Subscription,
    ) -> Result<Subscription, QuickstartError> {
        let url = self.api(&["subscriptions"])?;
        Self::json(self.authorized(Method::POST, url, access_token).json(subscription)).await
    }

    async fn delete_subscription(
        &self,
        access_token: &str,
        subscription_id: &str,
    ) -> Result<(), QuickstartError> {
        let url = self.api(&["subscriptions", subscription_id])?;
        Self::checked(self.authorized(Method::DELETE, url, access_token)).await?;
        Ok(())
    }

    async fn get_location(
        &self,
        access_token: &str,
        location_id: &str,
    ) -> Result<Location, QuickstartError> {
        let url = self.api(&["locations", location_id])?;
        Self::json(self.authorized(Method::GET, url, access_token)).await
    }

    async fn fetch_content(
        &self,
        access_token: &str,
        url: &str,
    ) -> Result<RemoteContent, QuickstartError> {
        let url = Url::parse(url)
            .map_err(|e| QuickstartError::remote(None, &format!("invalid content url: {e}")))?;
        let response = Self::checked(self.authorized(Method::GET, url, access_token)).await?;

        let content_type = Self::content_type_of(&response);
        let body = response
            .bytes_stream()
            .map_err(|e| QuickstartError::remote(None, &e.to_string()))
            .boxed();

        Ok(RemoteContent { content_type, body })
    }

    async fn download_media(&self, url: &str) -> Result<Media, QuickstartError> {
        let response = Self::checked(self.http.get(url)).await?;
        let content_type = Self::content_type_of(&response)
            .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string());
        let data = response
            .bytes()
            .await
            .map_err(|e| QuickstartError::remote(None, &e.to_string()))?;

        Ok(Media {
            content_type,
            data: data.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_encoded_segments() {
        let base = Url::parse("https://www.googleapis.com/mirror/v1").unwrap();
        let url = MirrorClient::endpoint(&base, &["contacts", "Mirror Quickstart/1"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/mirror/v1/contacts/Mirror%20Quickstart%2F1"
        );
    }

    #[test]
    fn trailing_slash_on_base_is_tolerated() {
        let base = Url::parse("http://127.0.0.1:9000/mirror/v1/").unwrap();
        let url = MirrorClient::endpoint(&base, &["timeline"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/mirror/v1/timeline");
    }

    #[test]
    fn bad_base_url_is_a_config_error() {
        let err = match MirrorClient::with_client(reqwest::Client::new(), "nope", "nope") {
            Ok(_) => panic!("expected error"),
            Err(err) => err,
        };
        assert_eq!(err.error, "config_error");
    }
}

use quickstart_core::{Media, QuickstartError, TimelineItem};

/// A `multipart/related` upload: JSON metadata part followed by the media part.
pub(crate) struct RelatedBody {
    pub content_type: String,
    pub body: Vec<u8>,
}

pub(crate) fn related_body(
    item: &TimelineItem,
    media: &Media,
    boundary: &str,
) -> Result<RelatedBody, QuickstartError> {
    let metadata = serde_json::to_vec(item)
        .map_err(|e| QuickstartError::remote(None, &format!("failed to encode item: {e}")))?;

    let mut body = Vec::with_capacity(metadata.len() + media.data.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(&metadata);
    body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", media.content_type).as_bytes());
    body.extend_from_slice(&media.data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Ok(RelatedBody {
        content_type: format!("multipart/related; boundary={boundary}"),
        body,
    })
}

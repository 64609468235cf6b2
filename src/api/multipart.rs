//! `multipart/form-data` uploads, parsed with `multer`.
//!
//! The server reads the whole body before parsing, so the buffered bytes are
//! handed to `multer` as a single-chunk stream and driven to completion on
//! the worker thread.

use anyhow::{anyhow, Result};
use bytes::Bytes;
use futures::executor::block_on;
use futures::stream;

/// One form part.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub name: Option<String>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Extract the boundary parameter from a `Content-Type` header value.
pub fn boundary(content_type: &str) -> Option<String> {
    multer::parse_boundary(content_type).ok()
}

/// Split a buffered multipart body into its parts.
pub fn parse(body: Vec<u8>, boundary: &str) -> Result<Vec<Part>> {
    block_on(collect_parts(body, boundary.to_string()))
}

async fn collect_parts(body: Vec<u8>, boundary: String) -> Result<Vec<Part>> {
    let chunk = Bytes::from(body);
    let source = stream::once(async move { Ok::<Bytes, std::convert::Infallible>(chunk) });
    let mut multipart = multer::Multipart::new(source, boundary);

    let mut parts = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| anyhow!("malformed multipart body: {}", e))?
    {
        let name = field.name().map(str::to_string);
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(|mime| mime.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| anyhow!("malformed multipart part: {}", e))?;
        parts.push(Part {
            name,
            filename,
            content_type,
            data,
        });
    }
    Ok(parts)
}

/// First part whose field name is one of `names`, in `names` order.
pub fn find_field<'p>(parts: &'p [Part], names: &[&str]) -> Option<&'p Part> {
    names
        .iter()
        .find_map(|name| parts.iter().find(|p| p.name.as_deref() == Some(*name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(b"--XyZ\r\n");
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"note\"\r\n\r\n");
        body.extend_from_slice(b"hello\r\n");
        body.extend_from_slice(b"--XyZ\r\n");
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"file\"; filename=\"leaf.png\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
        body.extend_from_slice(b"\x89PNG\r\n--not-the-boundary\r\n");
        body.extend_from_slice(b"\r\n--XyZ--\r\n");
        body
    }

    #[test]
    fn parses_boundary_parameter() {
        assert_eq!(
            boundary("multipart/form-data; boundary=XyZ").as_deref(),
            Some("XyZ")
        );
        assert_eq!(
            boundary("multipart/form-data; charset=utf-8; boundary=abc123").as_deref(),
            Some("abc123")
        );
        assert!(boundary("image/png").is_none());
        assert!(boundary("multipart/form-data").is_none());
    }

    #[test]
    fn splits_parts_and_keeps_binary_payload() {
        let parts = parse(body(), "XyZ").unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].name.as_deref(), Some("note"));
        assert_eq!(&parts[0].data[..], b"hello");

        let file = find_field(&parts, &["file", "image"]).unwrap();
        assert_eq!(file.filename.as_deref(), Some("leaf.png"));
        assert_eq!(file.content_type.as_deref(), Some("image/png"));
        assert_eq!(&file.data[..], b"\x89PNG\r\n--not-the-boundary\r\n");
    }

    #[test]
    fn field_lookup_follows_name_priority() {
        let mut body = Vec::new();
        body.extend_from_slice(b"--XyZ\r\n");
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"image\"\r\n\r\n");
        body.extend_from_slice(b"second\r\n");
        body.extend_from_slice(b"--XyZ\r\n");
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"file\"\r\n\r\n");
        body.extend_from_slice(b"first\r\n");
        body.extend_from_slice(b"--XyZ--\r\n");
        let parts = parse(body, "XyZ").unwrap();
        assert_eq!(&find_field(&parts, &["file", "image"]).unwrap().data[..], b"first");
        assert!(find_field(&parts, &["upload"]).is_none());
    }

    #[test]
    fn rejects_truncated_bodies() {
        let body = b"--XyZ\r\nContent-Disposition: form-data; name=\"file\"\r\n\r\nabc".to_vec();
        assert!(parse(body, "XyZ").is_err());
    }
}

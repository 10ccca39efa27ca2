//! Transport boundary
//!
//! The delivery service hands a fully-formed [`TransportRequest`] to a
//! [`Transport`] and treats the result as fire-and-forget: no retry or
//! backoff is attempted here. [`HttpTransport`] is the bundled
//! implementation, a blocking `multipart/form-data` POST.

use crate::error::{CourierError, CourierResult};

/// One upload: a named payload plus ordered form fields
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Destination URL
    pub endpoint: String,
    /// Multipart field name carrying the payload
    pub field_name: String,
    /// File name reported for the payload
    pub file_name: String,
    /// Payload bytes
    pub payload: Vec<u8>,
    /// Additional form fields, sent in order
    pub form_fields: Vec<(String, String)>,
}

/// Something that can push a request to the collection endpoint
pub trait Transport: Send + Sync {
    /// Deliver the request. Failures are opaque to the caller; the dedup
    /// gate has already recorded the artifact by the time this runs.
    fn send(&self, request: &TransportRequest) -> CourierResult<()>;
}

impl<T: Transport> Transport for std::sync::Arc<T> {
    fn send(&self, request: &TransportRequest) -> CourierResult<()> {
        (**self).send(request)
    }
}

/// Blocking HTTP transport posting `multipart/form-data`
#[derive(Debug, Default)]
pub struct HttpTransport;

impl Transport for HttpTransport {
    fn send(&self, request: &TransportRequest) -> CourierResult<()> {
        let boundary = boundary();
        let body = multipart_body(request, &boundary);
        let content_type = format!("multipart/form-data; boundary={boundary}");

        ureq::post(request.endpoint.as_str())
            .header("Content-Type", content_type.as_str())
            .send(&body[..])
            .map_err(|e| CourierError::transport(&request.endpoint, e.to_string()))?;

        Ok(())
    }
}

fn boundary() -> String {
    format!(
        "courier-{:016x}{:016x}",
        rand::random::<u64>(),
        rand::random::<u64>()
    )
}

/// Encode the request as a multipart/form-data body: text fields first, in
/// order, then the payload part.
fn multipart_body(request: &TransportRequest, boundary: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(request.payload.len() + 512);

    for (key, value) in &request.form_fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{key}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }

    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            request.field_name, request.file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(&request.payload);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TransportRequest {
        TransportRequest {
            endpoint: "https://collect.example/upload".to_string(),
            field_name: "document".to_string(),
            file_name: "report.txt".to_string(),
            payload: b"payload-bytes".to_vec(),
            form_fields: vec![
                ("channel".to_string(), "42".to_string()),
                ("caption".to_string(), "nightly".to_string()),
            ],
        }
    }

    #[test]
    fn body_contains_fields_in_order() {
        let body = multipart_body(&request(), "B");
        let text = String::from_utf8(body).unwrap();

        let channel = text.find("name=\"channel\"").unwrap();
        let caption = text.find("name=\"caption\"").unwrap();
        let document = text.find("name=\"document\"").unwrap();
        assert!(channel < caption);
        assert!(caption < document);
        assert!(text.contains("\r\n\r\n42\r\n"));
    }

    #[test]
    fn body_carries_payload_and_filename() {
        let body = multipart_body(&request(), "B");
        let text = String::from_utf8(body).unwrap();

        assert!(text.contains("filename=\"report.txt\""));
        assert!(text.contains("Content-Type: application/octet-stream"));
        assert!(text.contains("payload-bytes"));
        assert!(text.ends_with("\r\n--B--\r\n"));
    }

    #[test]
    fn boundaries_are_unique() {
        assert_ne!(boundary(), boundary());
    }
}

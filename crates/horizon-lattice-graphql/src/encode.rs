//! Wire encoding of GraphQL requests.
//!
//! Two body shapes are produced:
//!
//! - **JSON**: the operation object `{"query", "variables"}` as the whole body.
//! - **Multipart**: a `multipart/form-data` form following the GraphQL
//!   multipart request layout. The operation JSON goes in the `operations`
//!   field, followed by `query` and `variables` text fields for servers that
//!   read the older field layout, then one file part per attachment.
//!
//! Every attachment is read to the end before the form is handed over, so a
//! failed read never produces a partial request.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use tokio::io::AsyncReadExt;

use crate::error::{ClientError, Result};
use crate::request::GraphQLRequest;

const APPLICATION_JSON: &str = "application/json";
const OCTET_STREAM: &str = "application/octet-stream";

/// An encoded request body.
pub(crate) enum Payload {
    /// `application/json` body bytes.
    Json(Bytes),
    /// A complete multipart form; the boundary is chosen by the form.
    Multipart(Form),
}

impl Payload {
    /// Attach the body, and its content type, to an outbound request.
    pub(crate) fn apply(self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Payload::Json(body) => builder.header(CONTENT_TYPE, APPLICATION_JSON).body(body),
            Payload::Multipart(form) => builder.multipart(form),
        }
    }

    /// Body size, when known up front.
    pub(crate) fn known_len(&self) -> Option<usize> {
        match self {
            Payload::Json(body) => Some(body.len()),
            Payload::Multipart(_) => None,
        }
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Json(body) => f.debug_tuple("Json").field(&body.len()).finish(),
            Payload::Multipart(form) => f.debug_tuple("Multipart").field(&form.boundary()).finish(),
        }
    }
}

/// Encode `request` as a JSON body.
///
/// Fails if the request has attachments, which only multipart can carry.
pub(crate) fn encode_json(request: &GraphQLRequest) -> Result<Payload> {
    if !request.files().is_empty() {
        return Err(ClientError::InvalidRequest(
            "file attachments require multipart encoding".into(),
        ));
    }
    request.check_vars()?;

    let body = serde_json::to_vec(&request.operation()).map_err(ClientError::Serialize)?;
    tracing::trace!(
        target: "horizon_lattice_graphql::encode",
        bytes = body.len(),
        "encoded JSON body"
    );
    Ok(Payload::Json(Bytes::from(body)))
}

/// Encode `request` as a `multipart/form-data` form.
///
/// Each attachment stream is read to the end, in order, exactly once.
pub(crate) async fn encode_multipart(request: &mut GraphQLRequest) -> Result<Payload> {
    request.check_vars()?;

    let operation = serde_json::to_string(&request.operation()).map_err(ClientError::Serialize)?;
    let mut form = Form::new()
        .text("operations", operation)
        .text("query", request.query().to_owned())
        .text("variables", variables_field(request)?);

    for attachment in request.files_mut() {
        let mut buf = Vec::new();
        attachment
            .source
            .read_to_end(&mut buf)
            .await
            .map_err(|source| ClientError::Attachment {
                field: attachment.field.clone(),
                source,
            })?;
        tracing::trace!(
            target: "horizon_lattice_graphql::encode",
            field = %attachment.field,
            file = %attachment.name,
            bytes = buf.len(),
            "read attachment"
        );

        let part = Part::bytes(buf)
            .file_name(attachment.name.clone())
            .mime_str(OCTET_STREAM)
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;
        form = form.part(attachment.field.clone(), part);
    }

    Ok(Payload::Multipart(form))
}

/// The `variables` text field: the JSON object followed by a newline.
fn variables_field(request: &GraphQLRequest) -> Result<String> {
    let mut variables = serde_json::to_string(request.vars()).map_err(ClientError::Serialize)?;
    variables.push('\n');
    Ok(variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, ReadBuf};

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream gone")))
        }
    }

    fn json_body(payload: Payload) -> Bytes {
        match payload {
            Payload::Json(body) => body,
            other => panic!("expected a JSON payload, got {other:?}"),
        }
    }

    #[test]
    fn test_json_body() {
        let mut request = GraphQLRequest::new("query {}", "");
        request.var("username", "matryer");

        let body = json_body(encode_json(&request).unwrap());
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"query": "query {}", "variables": {"username": "matryer"}})
        );
    }

    #[test]
    fn test_json_empty_variables() {
        let request = GraphQLRequest::new("{ a }", "");
        let body = json_body(encode_json(&request).unwrap());
        assert_eq!(&body[..], br#"{"query":"{ a }","variables":{}}"#);
    }

    #[test]
    fn test_json_rejects_files() {
        let mut request = GraphQLRequest::new("{ a }", "");
        request.file("file", "a.txt", &b"a"[..]);
        let err = encode_json(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
    }

    #[test]
    fn test_variables_field_ends_with_newline() {
        let mut request = GraphQLRequest::new("query {}", "");
        request.var("username", "matryer");
        assert_eq!(
            variables_field(&request).unwrap(),
            "{\"username\":\"matryer\"}\n"
        );
    }

    #[test]
    fn test_json_payload_sets_content_type() {
        let request = GraphQLRequest::new("{ a }", "");
        let payload = encode_json(&request).unwrap();
        assert_eq!(payload.known_len(), Some(br#"{"query":"{ a }","variables":{}}"#.len()));

        let built = payload
            .apply(reqwest::Client::new().post("http://localhost/"))
            .build()
            .unwrap();
        assert_eq!(built.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(
            built.body().and_then(|b| b.as_bytes()),
            Some(&br#"{"query":"{ a }","variables":{}}"#[..])
        );
    }

    #[tokio::test]
    async fn test_multipart_payload_sets_boundary() {
        let mut request = GraphQLRequest::new("query {}", "");
        request.var("username", "matryer");
        request.file("file", "filename.txt", &b"This is a file"[..]);
        request.file("file", "second.bin", &b"\x00\x9f\x92\x96"[..]);

        let payload = encode_multipart(&mut request).await.unwrap();
        let boundary = match &payload {
            Payload::Multipart(form) => form.boundary().to_owned(),
            other => panic!("expected a multipart payload, got {other:?}"),
        };

        let built = payload
            .apply(reqwest::Client::new().post("http://localhost/"))
            .build()
            .unwrap();
        assert_eq!(
            built.headers()[CONTENT_TYPE].to_str().unwrap(),
            format!("multipart/form-data; boundary={boundary}")
        );
    }

    #[tokio::test]
    async fn test_multipart_read_failure_aborts() {
        let mut request = GraphQLRequest::new("query {}", "");
        request.file("ok", "ok.txt", &b"fine"[..]);
        request.file("broken", "broken.txt", FailingReader);

        let err = encode_multipart(&mut request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
        match err {
            ClientError::Attachment { field, source } => {
                assert_eq!(field, "broken");
                assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

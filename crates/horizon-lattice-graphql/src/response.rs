//! GraphQL response envelope and decoding.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::{ClientError, Result};

/// A GraphQL error returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    /// The error message.
    pub message: String,

    /// Locations in the document where the error occurred.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<GraphQLLocation>,

    /// Path to the field that caused the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,

    /// Additional error metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQLError {
    /// Create an error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: None,
            extensions: None,
        }
    }
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref path) = self.path {
            write!(f, " (at ")?;
            for (i, segment) in path.iter().enumerate() {
                match segment {
                    PathSegment::Field(name) if i > 0 => write!(f, ".{name}")?,
                    PathSegment::Field(name) => write!(f, "{name}")?,
                    PathSegment::Index(idx) => write!(f, "[{idx}]")?,
                }
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl std::error::Error for GraphQLError {}

/// A location in a GraphQL document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQLLocation {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

/// A segment in an error path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// A field name.
    Field(String),
    /// A list index.
    Index(usize),
}

/// The response envelope returned by a GraphQL server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQLResponse {
    /// The data returned by the operation. `None` when the key is absent.
    #[serde(default)]
    pub data: Option<Value>,

    /// Errors that occurred during execution.
    #[serde(default, deserialize_with = "nullable_errors")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,

    /// Additional response metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

// Some servers send `"errors": null` on success.
fn nullable_errors<'de, D>(deserializer: D) -> std::result::Result<Vec<GraphQLError>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<GraphQLError>>::deserialize(deserializer)?.unwrap_or_default())
}

impl GraphQLResponse {
    /// Check if the response contains errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Convert the envelope into a result.
    ///
    /// Any reported error fails the whole response, even when `data` is
    /// partially populated.
    pub fn into_result(self) -> Result<Self> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(ClientError::GraphQL(self.errors))
        }
    }

    /// Deserialize `data` into `target`.
    ///
    /// Leaves `target` untouched when `data` is absent or when deserialization
    /// fails.
    pub fn bind<T: DeserializeOwned>(self, target: &mut T) -> Result<()> {
        if let Some(data) = self.data {
            *target = serde_json::from_value(data).map_err(ClientError::Decode)?;
        }
        Ok(())
    }

    /// Deserialize `data` into a new value, treating an absent `data` as null.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(self.data.unwrap_or(Value::Null)).map_err(ClientError::Decode)
    }
}

/// Classify a raw HTTP response.
///
/// A non-2xx status wins over anything in the body; otherwise the body must be
/// a valid envelope with no errors.
pub(crate) fn decode(response: http::Response<Bytes>) -> Result<GraphQLResponse> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
        });
    }

    let envelope: GraphQLResponse =
        serde_json::from_slice(response.body()).map_err(ClientError::Decode)?;
    envelope.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use std::collections::HashMap;

    fn response(status: u16, body: &str) -> http::Response<Bytes> {
        http::Response::builder()
            .status(status)
            .body(Bytes::copy_from_slice(body.as_bytes()))
            .unwrap()
    }

    #[test]
    fn test_decode_success() {
        let envelope = decode(response(200, r#"{"data":{"value":"x"}}"#)).unwrap();
        assert_eq!(envelope.data, Some(json!({"value": "x"})));
        assert!(!envelope.has_errors());
    }

    #[test]
    fn test_status_wins_over_unparseable_body() {
        let err = decode(response(500, "Internal Server Error")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Status);
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_status_wins_over_error_envelope() {
        let err = decode(response(400, r#"{"errors":[{"message":"bad"}]}"#)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Status);
    }

    #[test]
    fn test_invalid_json_is_decode_error() {
        let err = decode(response(200, "<html>")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_partial_data_with_errors_fails() {
        let body = r#"{
            "data": {"user": null},
            "errors": [
                {"message": "Permission denied", "path": ["user"], "locations": [{"line": 1, "column": 3}]},
                {"message": "Quota exceeded"}
            ]
        }"#;
        let err = decode(response(200, body)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GraphQL);
        let errors = err.graphql_errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].locations, vec![GraphQLLocation { line: 1, column: 3 }]);
        assert_eq!(errors[0].to_string(), "Permission denied (at user)");
    }

    #[test]
    fn test_null_errors_is_success() {
        let envelope = decode(response(200, r#"{"data":{"ok":true},"errors":null}"#)).unwrap();
        assert!(!envelope.has_errors());
    }

    #[test]
    fn test_bind_leaves_target_on_failure() {
        let envelope = GraphQLResponse {
            data: Some(json!({"value": 42})),
            ..Default::default()
        };
        let mut target: HashMap<String, String> = HashMap::new();
        target.insert("keep".into(), "me".into());

        let err = envelope.bind(&mut target).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert_eq!(target.get("keep").map(String::as_str), Some("me"));
    }

    #[test]
    fn test_bind_without_data_is_noop() {
        let mut target = vec![1, 2, 3];
        GraphQLResponse::default().bind(&mut target).unwrap();
        assert_eq!(target, vec![1, 2, 3]);
    }

    #[test]
    fn test_error_path_display() {
        let error = GraphQLError {
            message: "boom".into(),
            locations: vec![],
            path: Some(vec![
                PathSegment::Field("users".into()),
                PathSegment::Index(2),
                PathSegment::Field("name".into()),
            ]),
            extensions: None,
        };
        assert_eq!(error.to_string(), "boom (at users[2].name)");
    }
}

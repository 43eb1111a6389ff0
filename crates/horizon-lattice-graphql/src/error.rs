//! Error types for the GraphQL client.

use thiserror::Error;

use crate::response::GraphQLError;

/// A boxed error returned by a [`Transport`](crate::Transport).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The category a [`ClientError`] belongs to.
///
/// Every failed call reports exactly one category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No response was obtained (network failure, cancellation, deadline).
    Transport,
    /// The request could not be encoded; nothing was sent.
    Encoding,
    /// The server answered with a status outside the 2xx range.
    Status,
    /// The response body or its `data` could not be decoded.
    Decode,
    /// The server reported GraphQL errors in the response envelope.
    GraphQL,
}

/// Errors returned by [`GraphQLClient::run`](crate::GraphQLClient::run).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport failed before a response was obtained.
    #[error("graphql: transport error: {0}")]
    Transport(#[source] BoxError),

    /// The call's context was cancelled.
    #[error("graphql: request cancelled")]
    Cancelled,

    /// The call's context deadline passed.
    #[error("graphql: context deadline exceeded")]
    DeadlineExceeded,

    /// The operation or a variable could not be serialized.
    #[error("graphql: encode operation: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Reading a file attachment failed.
    #[error("graphql: read attachment {field:?}: {source}")]
    Attachment {
        /// Form field name of the failing attachment.
        field: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The outbound HTTP request could not be built (bad URL or header).
    #[error("graphql: invalid request: {0}")]
    InvalidRequest(String),

    /// The server returned a non-2xx status code.
    #[error("graphql: server returned a non-200 status code: {status}")]
    Status {
        /// The HTTP status code.
        status: u16,
    },

    /// The response body or `data` could not be decoded.
    #[error("graphql: decoding response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The response carried one or more GraphQL errors.
    #[error("graphql: {}", join_messages(.0))]
    GraphQL(Vec<GraphQLError>),
}

fn join_messages(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ClientError {
    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::Cancelled | Self::DeadlineExceeded => ErrorKind::Transport,
            Self::Serialize(_) | Self::Attachment { .. } | Self::InvalidRequest(_) => {
                ErrorKind::Encoding
            }
            Self::Status { .. } => ErrorKind::Status,
            Self::Decode(_) => ErrorKind::Decode,
            Self::GraphQL(_) => ErrorKind::GraphQL,
        }
    }

    /// The HTTP status code, for [`ErrorKind::Status`] errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }

    /// The GraphQL errors reported by the server, if any.
    pub fn graphql_errors(&self) -> &[GraphQLError] {
        match self {
            Self::GraphQL(errors) => errors,
            _ => &[],
        }
    }

    /// Whether the call's context was cancelled or timed out.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidRequest(format!("invalid endpoint URL: {err}"))
    }
}

impl From<http::header::InvalidHeaderName> for ClientError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for ClientError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

/// A specialized Result type for GraphQL client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message() {
        let err = ClientError::Status { status: 500 };
        assert_eq!(
            err.to_string(),
            "graphql: server returned a non-200 status code: 500"
        );
        assert_eq!(err.kind(), ErrorKind::Status);
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_graphql_message_joins_all_errors() {
        let err = ClientError::GraphQL(vec![
            GraphQLError::new("first failure"),
            GraphQLError::new("second failure"),
        ]);
        assert_eq!(err.to_string(), "graphql: first failure; second failure");
        assert_eq!(err.graphql_errors().len(), 2);
        assert_eq!(err.kind(), ErrorKind::GraphQL);
    }

    #[test]
    fn test_cancellation_is_transport() {
        assert_eq!(ClientError::Cancelled.kind(), ErrorKind::Transport);
        assert_eq!(ClientError::DeadlineExceeded.kind(), ErrorKind::Transport);
        assert!(ClientError::DeadlineExceeded.is_cancelled());
    }

    #[test]
    fn test_url_error_is_encoding() {
        let err: ClientError = url::Url::parse("not a url").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Encoding);
    }
}

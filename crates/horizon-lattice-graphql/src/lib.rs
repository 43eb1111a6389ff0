//! GraphQL over HTTP for Horizon Lattice.
//!
//! This crate issues GraphQL queries and mutations over HTTP:
//!
//! - **JSON requests**: `{"query", "variables"}` posted as `application/json`
//! - **File uploads**: `multipart/form-data` requests carrying the operation
//!   and one part per attached file
//! - **Cancellation**: every call runs under a [`Context`] carrying a
//!   cancellation token and an optional deadline
//! - **Typed errors**: transport, encoding, status, decode and GraphQL
//!   failures are distinguished by [`ErrorKind`]
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use horizon_lattice_graphql::{Context, GraphQLClient, GraphQLRequest};
//!
//! #[derive(serde::Deserialize)]
//! struct Upload {
//!     upload: UploadResult,
//! }
//!
//! let client = GraphQLClient::builder()
//!     .bearer_auth("my-token")
//!     .build()?;
//!
//! let mut request = GraphQLRequest::new(
//!     "mutation ($file: Upload!) { upload(file: $file) { id } }",
//!     "https://api.example.com/graphql",
//! );
//! request.var("file", serde_json::Value::Null);
//! request.file("file", "report.pdf", tokio::fs::File::open("report.pdf").await?);
//!
//! let ctx = Context::background().with_timeout(Duration::from_secs(10));
//! let mut data: Option<Upload> = None;
//! client.run(&ctx, &mut request, Some(&mut data)).await?;
//! ```
//!
//! # Transports
//!
//! The HTTP exchange itself is delegated to a [`Transport`]. The default is
//! [`HttpTransport`], a pooled `reqwest` client; any `reqwest::Client` or async
//! closure taking a `reqwest::Request` works as well:
//!
//! ```ignore
//! let client = GraphQLClient::builder()
//!     .transport(|request: reqwest::Request| async move {
//!         Ok(http::Response::new(bytes::Bytes::from_static(br#"{"data":{}}"#)))
//!     })
//!     .build()?;
//! ```

mod client;
mod context;
mod encode;
mod error;
mod request;
mod response;
mod transport;

pub use client::{GraphQLClient, GraphQLClientBuilder};
pub use context::Context;
pub use error::{BoxError, ClientError, ErrorKind, Result};
pub use request::{FileAttachment, GraphQLRequest, UploadSource};
pub use response::{GraphQLError, GraphQLLocation, GraphQLResponse, PathSegment};
pub use transport::{HttpTransport, Transport};

pub use tokio_util::sync::CancellationToken;

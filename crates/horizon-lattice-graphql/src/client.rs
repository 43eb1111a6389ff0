//! GraphQL client implementation.

use std::sync::Arc;

use http::header::{ACCEPT, CONNECTION, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::encode::{Payload, encode_json, encode_multipart};
use crate::error::{ClientError, Result};
use crate::request::GraphQLRequest;
use crate::response::{self, GraphQLResponse};
use crate::transport::{HttpTransport, Transport};

const ACCEPT_JSON: &str = "application/json; charset=utf-8";

/// Builder for creating a GraphQL client.
///
/// Configuration is fixed once [`build`](Self::build) returns.
#[derive(Default)]
pub struct GraphQLClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    use_multipart_form: bool,
    immediately_close_request_body: bool,
    default_headers: Vec<(String, String)>,
}

impl GraphQLClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given transport instead of a default [`HttpTransport`].
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Use a transport already shared with other clients.
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Always send `multipart/form-data`, even without file attachments.
    ///
    /// Requests with attachments use multipart regardless of this setting.
    pub fn use_multipart_form(mut self) -> Self {
        self.use_multipart_form = true;
        self
    }

    /// Send every request with `Connection: close`.
    ///
    /// The connection, and the request body with it, is released once the
    /// exchange ends instead of being returned to the pool.
    pub fn immediately_close_request_body(mut self) -> Self {
        self.immediately_close_request_body = true;
        self
    }

    /// Add a default header to all requests.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Add multiple default headers.
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.default_headers.extend(headers);
        self
    }

    /// Set bearer token authentication on every request.
    pub fn bearer_auth(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.header("Authorization", value)
    }

    /// Build the client.
    pub fn build(self) -> Result<GraphQLClient> {
        let mut default_headers = HeaderMap::new();
        insert_headers(&mut default_headers, &self.default_headers)?;

        let (transport, requests): (Arc<dyn Transport>, reqwest::Client) = match self.transport {
            Some(transport) => {
                let requests = reqwest::Client::builder()
                    .build()
                    .map_err(|e| ClientError::Transport(Box::new(e)))?;
                (transport, requests)
            }
            None => {
                let transport = HttpTransport::new()?;
                let requests = transport.client().clone();
                (Arc::new(transport), requests)
            }
        };

        Ok(GraphQLClient {
            inner: Arc::new(GraphQLClientInner {
                transport,
                requests,
                use_multipart_form: self.use_multipart_form,
                immediately_close_request_body: self.immediately_close_request_body,
                default_headers,
            }),
        })
    }
}

struct GraphQLClientInner {
    transport: Arc<dyn Transport>,
    /// Builds outbound requests; only the transport sends them.
    requests: reqwest::Client,
    use_multipart_form: bool,
    immediately_close_request_body: bool,
    default_headers: HeaderMap,
}

/// A GraphQL client for queries and mutations, including file uploads.
///
/// The client is cheaply cloneable and safe to share between tasks; every
/// call is independent.
///
/// # Example
///
/// ```ignore
/// use horizon_lattice_graphql::{Context, GraphQLClient, GraphQLRequest};
///
/// let client = GraphQLClient::builder().use_multipart_form().build()?;
///
/// let mut request = GraphQLRequest::new("query ($id: ID!) { user(id: $id) { name } }", url);
/// request.var("id", "123");
///
/// let mut data = serde_json::Value::Null;
/// client.run(&Context::background(), &mut request, Some(&mut data)).await?;
/// ```
#[derive(Clone)]
pub struct GraphQLClient {
    inner: Arc<GraphQLClientInner>,
}

impl GraphQLClient {
    /// Create a client with default settings and the default transport.
    pub fn new() -> Result<Self> {
        GraphQLClientBuilder::new().build()
    }

    /// Create a builder for configuring a client.
    pub fn builder() -> GraphQLClientBuilder {
        GraphQLClientBuilder::new()
    }

    /// Whether every request is sent as multipart.
    pub fn uses_multipart_form(&self) -> bool {
        self.inner.use_multipart_form
    }

    /// Whether requests are sent with `Connection: close`.
    pub fn closes_request_body_immediately(&self) -> bool {
        self.inner.immediately_close_request_body
    }

    /// Run `request` and bind the response `data` into `target`.
    ///
    /// Exactly one HTTP call is made. On any error `target` is left as it was.
    /// Pass `None` to only check for success.
    pub async fn run<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        request: &mut GraphQLRequest,
        target: Option<&mut T>,
    ) -> Result<()> {
        let envelope = self.execute(ctx, request).await?;
        match target {
            Some(target) => envelope.bind(target),
            None => Ok(()),
        }
    }

    /// Run `request` and return the response `data` deserialized as `T`.
    pub async fn query<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        request: &mut GraphQLRequest,
    ) -> Result<T> {
        self.execute(ctx, request).await?.into_data()
    }

    /// Run `request` and return the raw, error-free response envelope.
    pub async fn execute(
        &self,
        ctx: &Context,
        request: &mut GraphQLRequest,
    ) -> Result<GraphQLResponse> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }

        let multipart = self.inner.use_multipart_form || !request.files().is_empty();
        let pending = &mut *request;
        let payload = ctx
            .run_until_done(async move {
                if multipart {
                    encode_multipart(pending).await
                } else {
                    encode_json(pending)
                }
            })
            .await?;

        let body_len = payload.known_len();
        let http_request = self.build_http_request(request, payload)?;

        tracing::debug!(
            target: "horizon_lattice_graphql::client",
            endpoint = %request.endpoint(),
            multipart,
            bytes = ?body_len,
            "sending GraphQL request"
        );

        let response = ctx
            .run_until_done(async {
                self.inner
                    .transport
                    .send(http_request)
                    .await
                    .map_err(ClientError::Transport)
            })
            .await?;

        tracing::debug!(
            target: "horizon_lattice_graphql::client",
            status = response.status().as_u16(),
            bytes = response.body().len(),
            "received GraphQL response"
        );

        response::decode(response)
    }

    fn build_http_request(
        &self,
        request: &GraphQLRequest,
        payload: Payload,
    ) -> Result<reqwest::Request> {
        let url = url::Url::parse(request.endpoint())?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));
        for (name, value) in &self.inner.default_headers {
            headers.insert(name.clone(), value.clone());
        }
        insert_headers(&mut headers, request.headers())?;
        if self.inner.immediately_close_request_body {
            headers.insert(CONNECTION, HeaderValue::from_static("close"));
        }

        payload
            .apply(self.inner.requests.post(url))
            .headers(headers)
            .build()
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))
    }
}

/// Insert `(name, value)` pairs, replacing existing values with the same name.
fn insert_headers(map: &mut HeaderMap, headers: &[(String, String)]) -> Result<()> {
    for (name, value) in headers {
        let name = HeaderName::try_from(name.as_str())?;
        let value = HeaderValue::try_from(value.as_str())?;
        map.insert(name, value);
    }
    Ok(())
}

impl std::fmt::Debug for GraphQLClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphQLClient")
            .field("use_multipart_form", &self.inner.use_multipart_form)
            .field(
                "immediately_close_request_body",
                &self.inner.immediately_close_request_body,
            )
            .field("default_headers", &self.inner.default_headers.len())
            .finish_non_exhaustive()
    }
}

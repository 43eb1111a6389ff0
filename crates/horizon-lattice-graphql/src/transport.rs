//! HTTP transports.
//!
//! The client hands a fully built `reqwest::Request` to a [`Transport`] and
//! expects back the complete response. Connection pooling, TLS and proxies
//! belong to the transport.

use std::future::Future;

use bytes::Bytes;
use futures_util::future::BoxFuture;

use crate::error::{BoxError, ClientError, Result};

/// Sends one HTTP request and returns the complete response.
///
/// Implementations must be safe to share between concurrent calls.
pub trait Transport: Send + Sync + 'static {
    /// Perform the exchange.
    fn send(
        &self,
        request: reqwest::Request,
    ) -> BoxFuture<'_, std::result::Result<http::Response<Bytes>, BoxError>>;
}

impl<F, Fut> Transport for F
where
    F: Fn(reqwest::Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<http::Response<Bytes>, BoxError>> + Send + 'static,
{
    fn send(
        &self,
        request: reqwest::Request,
    ) -> BoxFuture<'_, std::result::Result<http::Response<Bytes>, BoxError>> {
        Box::pin(self(request))
    }
}

impl Transport for reqwest::Client {
    fn send(
        &self,
        request: reqwest::Request,
    ) -> BoxFuture<'_, std::result::Result<http::Response<Bytes>, BoxError>> {
        Box::pin(async move {
            let response = self.execute(request).await?;

            let mut builder = http::Response::builder()
                .status(response.status())
                .version(response.version());
            if let Some(headers) = builder.headers_mut() {
                headers.extend(response.headers().clone());
            }
            let body = response.bytes().await?;
            Ok::<_, BoxError>(builder.body(body)?)
        })
    }
}

/// The default transport, backed by a pooled `reqwest` client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a fresh connection pool.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("HorizonLattice-GraphQL/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Transport(Box::new(e)))?;
        Ok(Self { client })
    }

    /// Wrap an already configured `reqwest` client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// The underlying `reqwest` client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        request: reqwest::Request,
    ) -> BoxFuture<'_, std::result::Result<http::Response<Bytes>, BoxError>> {
        Transport::send(&self.client, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closure_transport() {
        let transport = |request: reqwest::Request| async move {
            assert_eq!(request.method(), http::Method::POST);
            Ok::<_, BoxError>(
                http::Response::builder()
                    .status(204)
                    .body(Bytes::new())
                    .unwrap(),
            )
        };

        let request = reqwest::Client::new()
            .post("http://localhost/")
            .build()
            .unwrap();
        let response = Transport::send(&transport, request).await.unwrap();
        assert_eq!(response.status(), 204);
    }

    #[test]
    fn test_from_client() {
        let client = reqwest::Client::new();
        let transport = HttpTransport::from_client(client);
        let clone = transport.clone();
        let built = clone.client().post("http://localhost/").build().unwrap();
        assert_eq!(built.url().as_str(), "http://localhost/");
    }
}

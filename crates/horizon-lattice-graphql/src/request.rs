//! GraphQL request description.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::io::AsyncRead;

use crate::error::{ClientError, Result};

/// A readable source for a file attachment.
///
/// Anything that yields bytes sequentially works: an open `tokio::fs::File`,
/// an in-memory `&[u8]` or `Cursor`, a socket half.
pub type UploadSource = Box<dyn AsyncRead + Send + Unpin>;

/// A file sent alongside the operation in a multipart request.
pub struct FileAttachment {
    /// Multipart field name.
    pub field: String,
    /// File name reported to the server.
    pub name: String,
    /// The byte stream to upload.
    pub source: UploadSource,
}

impl fmt::Debug for FileAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileAttachment")
            .field("field", &self.field)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A GraphQL request.
///
/// # Example
///
/// ```ignore
/// use horizon_lattice_graphql::GraphQLRequest;
///
/// let mut request = GraphQLRequest::new(
///     "mutation ($file: Upload!) { upload(file: $file) { id } }",
///     "https://api.example.com/graphql",
/// );
/// request.var("file", serde_json::Value::Null);
/// request.file("file", "avatar.png", tokio::fs::File::open("avatar.png").await?);
/// request.header("Authorization", "Bearer token");
/// ```
#[derive(Debug)]
pub struct GraphQLRequest {
    query: String,
    endpoint: String,
    operation_name: Option<String>,
    vars: Map<String, Value>,
    var_errors: BTreeMap<String, String>,
    files: Vec<FileAttachment>,
    headers: Vec<(String, String)>,
}

impl GraphQLRequest {
    /// Create a request for `query` against `endpoint`.
    pub fn new(query: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            endpoint: endpoint.into(),
            operation_name: None,
            vars: Map::new(),
            var_errors: BTreeMap::new(),
            files: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// Set a variable, replacing any previous value with the same name.
    ///
    /// A value that fails to serialize makes every `run` of this request fail
    /// with an encoding error, until the variable is set to a value that
    /// serializes.
    pub fn var(&mut self, name: impl Into<String>, value: impl Serialize) -> &mut Self {
        let name = name.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.var_errors.remove(&name);
                self.vars.insert(name, value);
            }
            Err(e) => {
                self.vars.remove(&name);
                self.var_errors.insert(name, e.to_string());
            }
        }
        self
    }

    /// Attach a file. Attachments are sent in the order they were added;
    /// repeated field names are kept.
    pub fn file(
        &mut self,
        field: impl Into<String>,
        name: impl Into<String>,
        source: impl AsyncRead + Send + Unpin + 'static,
    ) -> &mut Self {
        self.files.push(FileAttachment {
            field: field.into(),
            name: name.into(),
            source: Box::new(source),
        });
        self
    }

    /// Add a header. Request headers override client defaults with the same name.
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the operation name.
    ///
    /// Required when the query document contains multiple operations.
    pub fn operation_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.operation_name = Some(name.into());
        self
    }

    /// The query text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The variables set so far.
    pub fn vars(&self) -> &Map<String, Value> {
        &self.vars
    }

    /// The attached files.
    pub fn files(&self) -> &[FileAttachment] {
        &self.files
    }

    /// The request-specific headers, in insertion order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Remove and return the attachments so the caller can reuse or close them.
    pub fn take_files(&mut self) -> Vec<FileAttachment> {
        std::mem::take(&mut self.files)
    }

    pub(crate) fn files_mut(&mut self) -> &mut [FileAttachment] {
        &mut self.files
    }

    /// Fail if any variable could not be serialized.
    pub(crate) fn check_vars(&self) -> Result<()> {
        match self.var_errors.iter().next() {
            Some((name, message)) => Err(ClientError::Serialize(serde::ser::Error::custom(
                format!("variable {name:?}: {message}"),
            ))),
            None => Ok(()),
        }
    }

    pub(crate) fn operation(&self) -> Operation<'_> {
        Operation {
            query: &self.query,
            variables: &self.vars,
            operation_name: self.operation_name.as_deref(),
        }
    }
}

/// The JSON operation object sent to the server.
#[derive(Debug, Serialize)]
pub(crate) struct Operation<'a> {
    pub query: &'a str,
    pub variables: &'a Map<String, Value>,
    #[serde(rename = "operationName", skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<&'a str>,
}

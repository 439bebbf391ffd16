use crate::query::QueryFailed;
use thiserror::Error;

/// The error type for all operations of the [`Client`], [`NodeResource`] and associated structs and traits.
///
/// Every failure is classified by category so that callers can tell a missing document from a rejected query or an
/// unreachable server.
///
/// [`Client`]: crate::Client
/// [`NodeResource`]: crate::NodeResource
#[derive(Debug, Error)]
pub enum ClientError {
    /// The connection parameters are invalid.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// The server could not be reached or the exchange was aborted.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    /// The query was refused locally or rejected by the server.
    #[error(transparent)]
    Query(#[from] QueryError),
    /// A create, read, update or delete operation on a resource failed.
    #[error(transparent)]
    Resource(#[from] ResourceError),
    /// The node implementation failed to parse or serialize XML.
    #[error(transparent)]
    Node(#[from] NodeError),
    /// The provided credentials for authorizing are invalid.
    #[error("access denied")]
    Auth,
}

/// Invalid connection parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The host is neither a domain name nor an IP address.
    #[error("invalid host `{host}`: {reason}")]
    InvalidHost {
        /// The rejected host.
        host: String,
        /// Why the host could not be parsed.
        reason: String,
    },
    /// Port `0` was given.
    #[error("invalid port {port}")]
    InvalidPort {
        /// The rejected port.
        port: u16,
    },
    /// The root collection is relative or contains `.` or `..` segments.
    #[error("root collection `{path}` must be an absolute collection path")]
    InvalidRootCollection {
        /// The rejected collection path.
        path: String,
    },
    /// The path prefix contains whitespace, empty segments or one of `?`, `#`, `@`, `:`.
    #[error("invalid path prefix `{prefix}`")]
    InvalidPrefix {
        /// The rejected prefix.
        prefix: String,
    },
    /// The connection URL cannot be parsed or names no host.
    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why the URL was rejected.
        reason: String,
    },
    /// Only `existdb`, `existdb+http` and `existdb+https` URLs are understood.
    #[error("unsupported URL scheme `{scheme}`")]
    UnsupportedScheme {
        /// The scheme of the rejected URL.
        scheme: String,
    },
}

/// Network level failures. There are no retries; a timed out write may or may not have been applied by the server.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The configured timeout elapsed.
    #[error("request to {url} timed out")]
    Timeout {
        /// URL of the request.
        url: String,
    },
    /// The connection was refused or broke before a response arrived.
    #[error("cannot reach {url}: {message}")]
    Unreachable {
        /// URL of the request.
        url: String,
        /// Message of the underlying HTTP client.
        message: String,
    },
    /// The HTTP client could not be built.
    #[error("cannot set up the HTTP transport: {message}")]
    Setup {
        /// Message of the underlying HTTP client.
        message: String,
    },
}

/// Query failures, either refused before sending or rejected by the server.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The expression was empty; nothing was sent.
    #[error("the query expression is empty")]
    EmptyExpression,
    /// The server refused the query.
    #[error(transparent)]
    Failed(#[from] QueryFailed),
    /// The response is not a result envelope.
    #[error("unexpected query response: {reason}")]
    UnexpectedResponse {
        /// What was wrong with the response body.
        reason: String,
    },
}

/// Failures of resource operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The document or node does not exist.
    #[error("resource `{path}` not found")]
    NotFound {
        /// Absolute path of the document.
        path: String,
    },
    /// The server refused to write at the path, or the document exists and must not be replaced.
    #[error("cannot write `{path}`: {message}")]
    Conflict {
        /// Absolute path of the document.
        path: String,
        /// The server's explanation, if any.
        message: String,
    },
    /// The resource was deleted through this handle.
    #[error("resource `{path}` has been deleted")]
    Stale {
        /// Absolute path of the document.
        path: String,
    },
    /// There is no node to write back.
    #[error("resource `{path}` holds no node; retrieve it first")]
    Unresolved {
        /// Absolute path of the document.
        path: String,
    },
    /// A query result or node id could not be interpreted.
    #[error("malformed result for `{path}`: {reason}")]
    Malformed {
        /// Absolute path of the document.
        path: String,
        /// What could not be interpreted.
        reason: String,
    },
    /// The path is empty, escapes the root collection, contains `.` or `..` segments, or names a collection where a
    /// document was expected.
    #[error("invalid resource path `{path}`")]
    InvalidPath {
        /// Absolute path of the document.
        path: String,
    },
    /// Any other non-success status.
    #[error("server answered {status} for `{path}`: {message}")]
    Rejected {
        /// Absolute path of the document.
        path: String,
        /// The HTTP status.
        status: u16,
        /// The response body.
        message: String,
    },
}

/// Error raised by an [`XmlNode`] implementation.
///
/// [`XmlNode`]: crate::XmlNode
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct NodeError {
    message: String,
}

impl NodeError {
    /// Wraps any displayable error of the underlying XML library.
    pub fn new(message: impl ToString) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

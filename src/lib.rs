#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![warn(unused)]
#![warn(rustdoc::broken_intra_doc_links)]
#![warn(rustdoc::private_intra_doc_links)]
#![warn(rustdoc::private_doc_tests)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_codeblock_attributes)]
#![warn(rustdoc::invalid_html_tags)]
#![warn(rustdoc::invalid_rust_codeblocks)]
#![warn(rustdoc::bare_urls)]
//! Client for the [eXist-db](https://exist-db.org) REST interface.
//!
//! Start with [`Client::connect`], find nodes with [`Client::retrieve_resources`] and write them back through the
//! returned [`NodeResource`]s.
mod client;
mod config;
mod connection;
mod errors;
mod node;
mod query;
mod transport;
#[cfg(test)]
mod tests;

pub use client::{Client, NodeResource, QueryResults, StoreMode};
pub use config::{
    Config, ConfigBuilder, DeletePolicy, Scheme, DEFAULT_HOST, DEFAULT_PASSWORD, DEFAULT_PORT, DEFAULT_PREFIX,
    DEFAULT_ROOT_COLLECTION, DEFAULT_USER,
};
pub use connection::Connection;
pub use errors::{ClientError, ConfigurationError, ConnectionError, NodeError, QueryError, ResourceError};
pub use node::{XmlNode, XotNode};
pub use query::{
    Attribute, NodeAddress, ParseError, QueryFailed, QueryOptions, SerializationOptions, ToAttribute, EXIST_NAMESPACE,
    RESULT_NAMESPACE,
};
pub use transport::{Credentials, HttpTransport, Method, Request, Response, Transport};

/// A [`Result`] with its [`Err`] variant set to [`ClientError`].
///
/// [`Result`]: std::result::Result
/// [`Err`]: std::result::Result::Err
/// [`ClientError`]: crate::errors::ClientError
pub type Result<T> = std::result::Result<T, ClientError>;

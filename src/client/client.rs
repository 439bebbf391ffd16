use crate::client::{NodeResource, QueryResults};
use crate::config::{Config, DeletePolicy};
use crate::errors::{QueryError, ResourceError};
use crate::node::{XmlNode, XotNode};
use crate::query::{is_collection_listing, parse_envelope, payload, xpath, NodeAddress, QueryFailed, QueryOptions};
use crate::transport::{Credentials, HttpTransport, Response, Transport};
use crate::{ClientError, Connection, Result};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;
use tracing::{debug, info};
use url::Url;

/// How [`Client::store_with`] treats a document that already exists at the target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreMode {
    /// Replaces the existing document.
    #[default]
    Overwrite,
    /// Refuses to touch an existing document with [`ResourceError::Conflict`].
    CreateNew,
}

#[derive(Debug)]
struct Inner<T>
where
    T: Transport,
{
    connection: Connection<T>,
    config: RefCell<Config>,
}

/// Represents an interface to one database instance through its [REST interface](https://exist-db.org/exist/apps/doc/devguide_rest),
/// scoped to a root collection. Every query runs on that collection and every document path is resolved below it.
///
/// The client holds no open connection or cursor. Clones are cheap and share the connection and configuration, so a
/// root collection reassigned through one clone is seen by every other one, including the clones held by
/// [`NodeResource`]s. Resources already resolved keep their document paths.
///
/// Nodes are represented by `D`, any [`XmlNode`] implementation, [`XotNode`] by default.
///
/// # Examples
///
/// ```no_run
/// # use existdb::{Client, ClientError, Config, XmlNode};
/// # fn main() -> Result<(), ClientError> {
/// let client = Client::connect(Config::builder().root_collection("/db/manifests").build()?)?;
///
/// for resource in client.retrieve_resources("//head")? {
///     let resource = resource?;
///     println!("{}: {}", resource.document_path(), resource.node().map(XmlNode::full_text).unwrap_or_default());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Client<T = HttpTransport, D = XotNode>
where
    T: Transport,
    D: XmlNode,
{
    inner: Rc<Inner<T>>,
    node: PhantomData<fn() -> D>,
}

impl<T, D> Clone for Client<T, D>
where
    T: Transport,
    D: XmlNode,
{
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            node: PhantomData,
        }
    }
}

impl Client<HttpTransport, XotNode> {
    /// Creates a client talking HTTP(S) to the instance described by `config`. No request is sent until the first
    /// operation.
    ///
    /// # Examples
    ///
    /// ```
    /// # use existdb::{Client, ClientError, Config};
    /// # fn main() -> Result<(), ClientError> {
    /// let client = Client::connect(Config::default())?;
    /// assert_eq!("http://localhost:8080/exist/rest/db", client.root_collection_url());
    /// # Ok(())
    /// # }
    /// ```
    pub fn connect(config: Config) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T, D> Client<T, D>
where
    T: Transport,
    D: XmlNode,
{
    /// Creates a client sending every request through `transport`.
    ///
    /// Typically, you only need this for a custom transport or node type; tests use it with in-memory transports.
    /// For regular usage, refer to [`Client::connect`].
    pub fn with_transport(config: Config, transport: T) -> Self {
        let credentials = Credentials::new(config.user(), config.password());

        Self {
            inner: Rc::new(Inner {
                connection: Connection::new(transport, credentials),
                config: RefCell::new(config),
            }),
            node: PhantomData,
        }
    }

    /// A snapshot of the current configuration.
    pub fn config(&self) -> Config {
        self.inner.config.borrow().clone()
    }

    /// The URL of the REST interface.
    pub fn base_url(&self) -> String {
        self.inner.config.borrow().base_url()
    }

    /// The collection queries run on and document paths are resolved in.
    pub fn root_collection(&self) -> String {
        self.inner.config.borrow().root_collection().to_owned()
    }

    /// The URL queries are posted to.
    pub fn root_collection_url(&self) -> String {
        self.inner.config.borrow().root_collection_url()
    }

    /// Reassigns the root collection for all subsequent operations of this client and its clones.
    ///
    /// # Examples
    ///
    /// ```
    /// # use existdb::{Client, ClientError, Config};
    /// # fn main() -> Result<(), ClientError> {
    /// let client = Client::connect(Config::default())?;
    /// client.set_root_collection("/db/manifests")?;
    /// assert_eq!("/db/manifests", client.root_collection());
    /// assert!(client.set_root_collection("manifests").is_err());
    /// # Ok(())
    /// # }
    /// ```
    pub fn set_root_collection(&self, path: &str) -> Result<()> {
        let mut config = self.inner.config.borrow_mut();
        config.set_root_collection(path)?;
        info!(root_collection = config.root_collection(), "root collection changed");
        Ok(())
    }

    /// Runs an arbitrary XQuery on the root collection and returns the serialized result as the server sent it.
    pub fn query(&self, query: &str) -> Result<String> {
        self.query_with(query, &QueryOptions::default())
    }

    /// Runs an arbitrary XQuery with paging and serialization options.
    pub fn query_with(&self, query: &str, options: &QueryOptions) -> Result<String> {
        if query.trim().is_empty() {
            return Err(QueryError::EmptyExpression.into());
        }

        Ok(self.post_query(query, options)?.text())
    }

    /// Finds all nodes matching `expression` within the root collection.
    ///
    /// The matches are returned in the order the server reports them, each as a resolved [`NodeResource`] addressing
    /// the node by id, so it can later be pushed back or deleted. A query without matches yields an empty sequence.
    pub fn retrieve_resources(&self, expression: &str) -> Result<QueryResults<T, D>> {
        self.retrieve_resources_with(expression, &QueryOptions::default())
    }

    /// Like [`Client::retrieve_resources`] but returns only the page selected by `options`.
    /// [`QueryResults::hits`] still reports the total number of matches.
    pub fn retrieve_resources_with(&self, expression: &str, options: &QueryOptions) -> Result<QueryResults<T, D>> {
        let query = xpath(expression)?;
        let response = self.post_query(&query, &options.wrapped())?;
        let envelope = parse_envelope(&response.text())?;
        debug!(
            expression,
            hits = envelope.hits,
            returned = envelope.entries.len(),
            "resources retrieved"
        );

        Ok(QueryResults::new(self.clone(), envelope))
    }

    /// Retrieves a single node by the absolute resource id of its document and its node id.
    pub fn retrieve_resource(&self, absolute_id: &str, node_id: &str) -> Result<NodeResource<T, D>> {
        let address = NodeAddress::new(absolute_id, node_id)?;
        self.retrieve_addressed(&address)
    }

    /// Creates a handle for the document at `path` without contacting the server. The node is fetched on the first
    /// [`NodeResource::retrieve`].
    ///
    /// Relative paths are resolved below the root collection. Absolute paths must lie within it.
    pub fn resource(&self, path: &str) -> Result<NodeResource<T, D>> {
        Ok(NodeResource::unresolved(self.clone(), self.absolute_path(path)?))
    }

    /// Fetches the document at `path`.
    pub fn retrieve_document(&self, path: &str) -> Result<NodeResource<T, D>> {
        let mut resource = self.resource(path)?;
        resource.retrieve()?;
        Ok(resource)
    }

    /// Stores `node` as the document at `path`, replacing any existing document.
    pub fn store(&self, node: D, path: &str) -> Result<NodeResource<T, D>> {
        self.store_with(node, path, StoreMode::Overwrite)
    }

    /// Stores `node` as the document at `path`. Returns a resolved handle owning the node.
    ///
    /// Fails with [`ResourceError::Conflict`] when the server refuses the path, for example because it names a
    /// collection, or when `mode` is [`StoreMode::CreateNew`] and the document exists.
    pub fn store_with(&self, node: D, path: &str, mode: StoreMode) -> Result<NodeResource<T, D>> {
        let path = self.absolute_path(path)?;

        if mode == StoreMode::CreateNew && self.document_exists(&path)? {
            return Err(ResourceError::Conflict {
                path,
                message: "document already exists".to_owned(),
            }
            .into());
        }

        self.put_document(&path, &node)?;
        debug!(path = %path, ?mode, "document stored");

        Ok(NodeResource::stored(self.clone(), path, node))
    }

    /// Tells whether a document exists at `path`.
    pub fn exists(&self, path: &str) -> Result<bool> {
        self.document_exists(&self.absolute_path(path)?)
    }

    /// Deletes the document at `path`. A missing document is handled according to the configured [`DeletePolicy`].
    pub fn delete_document(&self, path: &str) -> Result<()> {
        self.remove_document(&self.absolute_path(path)?)
    }

    /// Replaces the addressed node with `node`. Fails with [`ResourceError::NotFound`] when the node no longer exists.
    pub fn update_node(&self, address: &NodeAddress, node: &D) -> Result<()> {
        let query = address.replace(&node.serialize()?);
        match self.run_update(&query)? {
            true => Ok(()),
            false => Err(not_found(address.to_string())),
        }
    }

    /// Deletes the addressed node. A missing node is handled according to the configured [`DeletePolicy`].
    pub fn delete_node(&self, address: &NodeAddress) -> Result<()> {
        match self.run_update(&address.delete())? {
            true => Ok(()),
            false => self.missing_on_delete(address.to_string()),
        }
    }

    pub(crate) fn retrieve_addressed(&self, address: &NodeAddress) -> Result<NodeResource<T, D>> {
        match self.retrieve_resources(&address.locate())?.next() {
            Some(resource) => resource,
            None => Err(not_found(address.to_string())),
        }
    }

    pub(crate) fn fetch_document(&self, path: &str) -> Result<D> {
        let url = self.url_for(path)?;
        let response = self.inner.connection.get(&url)?;

        match response.status {
            200..=299 => {
                let text = response.text();
                if is_collection_listing(&text) {
                    return Err(ResourceError::InvalidPath { path: path.to_owned() }.into());
                }
                let mut node = D::parse(&text)?;
                node.set_source_url(url.as_str());
                Ok(node)
            }
            404 => Err(not_found(path.to_owned())),
            _ => Err(rejected(path, &response)),
        }
    }

    /// Overwrites the document at `path`, failing when it does not exist anymore.
    pub(crate) fn replace_document(&self, path: &str, node: &D) -> Result<()> {
        if !self.document_exists(path)? {
            return Err(not_found(path.to_owned()));
        }
        self.put_document(path, node)
    }

    pub(crate) fn remove_document(&self, path: &str) -> Result<()> {
        let url = self.url_for(path)?;
        let response = self.inner.connection.delete(&url)?;

        match response.status {
            200..=299 => Ok(()),
            404 => self.missing_on_delete(path.to_owned()),
            _ => Err(rejected(path, &response)),
        }
    }

    fn document_exists(&self, path: &str) -> Result<bool> {
        let url = self.url_for(path)?;
        let response = self.inner.connection.head(&url)?;

        match response.status {
            200..=299 => Ok(true),
            404 => Ok(false),
            _ => Err(rejected(path, &response)),
        }
    }

    fn put_document(&self, path: &str, node: &D) -> Result<()> {
        let url = self.url_for(path)?;
        let response = self.inner.connection.put(&url, node.serialize()?)?;

        match response.status {
            200..=299 => Ok(()),
            400 | 409 => Err(ResourceError::Conflict {
                path: path.to_owned(),
                message: response.text(),
            }
            .into()),
            404 => Err(not_found(path.to_owned())),
            _ => Err(rejected(path, &response)),
        }
    }

    /// Runs an update expression that yields an item only when its target exists.
    fn run_update(&self, query: &str) -> Result<bool> {
        let response = self.post_query(query, &QueryOptions::default().wrapped())?;
        Ok(parse_envelope(&response.text())?.hits > 0)
    }

    fn missing_on_delete(&self, path: String) -> Result<()> {
        match self.inner.config.borrow().delete_policy() {
            DeletePolicy::Strict => Err(not_found(path)),
            DeletePolicy::Lenient => {
                debug!(path = %path, "deleted resource was already gone");
                Ok(())
            }
        }
    }

    fn post_query(&self, query: &str, options: &QueryOptions) -> Result<Response> {
        let url = {
            let config = self.inner.config.borrow();
            config.url_for(config.root_collection())?
        };
        let body = payload(query, options);
        let response = self.inner.connection.post(&url, body.clone())?;

        match response.is_success() {
            true => Ok(response),
            false => Err(QueryError::Failed(QueryFailed::new(response.status, response.text(), body)).into()),
        }
    }

    pub(crate) fn url_for(&self, path: &str) -> Result<Url> {
        Ok(self.inner.config.borrow().url_for(path)?)
    }

    /// Resolves `path` below the root collection.
    fn absolute_path(&self, path: &str) -> Result<String> {
        let root = self.root_collection();
        let invalid = || ResourceError::InvalidPath { path: path.to_owned() };

        let relative = match path.strip_prefix('/') {
            Some(rest) if root == "/" => rest,
            Some(_) => path
                .strip_prefix(root.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .ok_or_else(invalid)?,
            None => path,
        };

        let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() || segments.iter().any(|s| *s == "." || *s == "..") {
            return Err(invalid().into());
        }

        Ok(match root.as_str() {
            "/" => format!("/{}", segments.join("/")),
            root => format!("{}/{}", root, segments.join("/")),
        })
    }
}

fn not_found(path: String) -> ClientError {
    ResourceError::NotFound { path }.into()
}

fn rejected(path: &str, response: &Response) -> ClientError {
    ResourceError::Rejected {
        path: path.to_owned(),
        status: response.status,
        message: response.text(),
    }
    .into()
}

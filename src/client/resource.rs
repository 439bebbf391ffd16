use crate::client::Client;
use crate::errors::ResourceError;
use crate::node::{XmlNode, XotNode};
use crate::query::NodeAddress;
use crate::transport::{HttpTransport, Transport};
use crate::{ClientError, Result};
use std::fmt::{Display, Formatter};
use tracing::debug;

/// How the resource is found on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Identity {
    /// The whole document at the resource's path.
    Document,
    /// A node inside the document, found by id.
    Node(NodeAddress),
}

#[derive(Debug)]
enum State<D> {
    Unresolved,
    Resolved(D),
    Deleted,
}

/// Handle binding a document or a node inside one to its in-memory [`XmlNode`].
///
/// A resource is either created by a query, already holding its node and addressing it by id, or created from a
/// document path, holding nothing until [`NodeResource::retrieve`] fetches it. The node may be mutated freely; the
/// server is only changed by an explicit [`NodeResource::update_push`] or [`NodeResource::delete`]. After a successful
/// delete the resource is stale and every further operation fails with [`ResourceError::Stale`].
///
/// # Examples
///
/// ```no_run
/// # use existdb::{Client, ClientError, Config};
/// # fn main() -> Result<(), ClientError> {
/// let client = Client::connect(Config::default())?;
/// let mut resource = client.resource("manifests/dada_manifest.xml")?;
///
/// resource.retrieve()?.append_text(" & Emmy Hennings")?;
/// resource.update_push()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct NodeResource<T = HttpTransport, D = XotNode>
where
    T: Transport,
    D: XmlNode,
{
    client: Client<T, D>,
    document_path: String,
    identity: Identity,
    state: State<D>,
}

impl<T, D> NodeResource<T, D>
where
    T: Transport,
    D: XmlNode,
{
    pub(crate) fn unresolved(client: Client<T, D>, document_path: String) -> Self {
        Self {
            client,
            document_path,
            identity: Identity::Document,
            state: State::Unresolved,
        }
    }

    pub(crate) fn stored(client: Client<T, D>, document_path: String, node: D) -> Self {
        Self {
            client,
            document_path,
            identity: Identity::Document,
            state: State::Resolved(node),
        }
    }

    pub(crate) fn found(client: Client<T, D>, document_path: String, address: NodeAddress, node: D) -> Self {
        Self {
            client,
            document_path,
            identity: Identity::Node(address),
            state: State::Resolved(node),
        }
    }

    /// Returns the node, fetching it first if the resource has not been resolved yet.
    pub fn retrieve(&mut self) -> Result<&mut D> {
        if let State::Unresolved = self.state {
            self.update_pull()?;
        }

        match &mut self.state {
            State::Resolved(node) => Ok(node),
            State::Unresolved => Err(ResourceError::Unresolved {
                path: self.document_path.clone(),
            }
            .into()),
            State::Deleted => Err(ResourceError::Stale {
                path: self.document_path.clone(),
            }
            .into()),
        }
    }

    /// Fetches the node again, discarding local changes.
    pub fn update_pull(&mut self) -> Result<()> {
        if self.is_deleted() {
            return Err(self.stale());
        }

        let node = match &self.identity {
            Identity::Document => self.client.fetch_document(&self.document_path)?,
            Identity::Node(address) => self.client.retrieve_addressed(address)?.into_node()?,
        };
        debug!(path = %self.document_path, "resource resolved");
        self.state = State::Resolved(node);

        Ok(())
    }

    /// Writes the current node back, replacing the remote document or node.
    ///
    /// Fails with [`ResourceError::Unresolved`] when there is no node to write and with [`ResourceError::NotFound`]
    /// when the remote document or node is gone.
    pub fn update_push(&self) -> Result<()> {
        let node = match &self.state {
            State::Resolved(node) => node,
            State::Unresolved => {
                return Err(ResourceError::Unresolved {
                    path: self.document_path.clone(),
                }
                .into())
            }
            State::Deleted => return Err(self.stale()),
        };

        match &self.identity {
            Identity::Document => self.client.replace_document(&self.document_path, node)?,
            Identity::Node(address) => self.client.update_node(address, node)?,
        }
        debug!(path = %self.document_path, "resource pushed");

        Ok(())
    }

    /// Deletes the remote document or node. The local node is dropped and the resource becomes stale.
    pub fn delete(&mut self) -> Result<()> {
        if self.is_deleted() {
            return Err(self.stale());
        }

        match &self.identity {
            Identity::Document => self.client.remove_document(&self.document_path)?,
            Identity::Node(address) => self.client.delete_node(address)?,
        }
        self.state = State::Deleted;

        Ok(())
    }

    /// The node, if resolved.
    pub fn node(&self) -> Option<&D> {
        match &self.state {
            State::Resolved(node) => Some(node),
            _ => None,
        }
    }

    /// Mutable access to the node, if resolved. Changes stay local until pushed.
    pub fn node_mut(&mut self) -> Option<&mut D> {
        match &mut self.state {
            State::Resolved(node) => Some(node),
            _ => None,
        }
    }

    /// Detaches the node from the resource.
    pub fn into_node(self) -> Result<D> {
        match self.state {
            State::Resolved(node) => Ok(node),
            State::Unresolved => Err(ResourceError::Unresolved {
                path: self.document_path,
            }
            .into()),
            State::Deleted => Err(ResourceError::Stale {
                path: self.document_path,
            }
            .into()),
        }
    }

    /// The absolute path of the document holding the resource.
    pub fn document_path(&self) -> &str {
        &self.document_path
    }

    /// The id of the node within the database, for resources found by a query.
    pub fn address(&self) -> Option<&NodeAddress> {
        match &self.identity {
            Identity::Node(address) => Some(address),
            Identity::Document => None,
        }
    }

    /// The absolute resource id of the containing document, for resources found by a query.
    pub fn absolute_id(&self) -> Option<&str> {
        self.address().map(NodeAddress::absolute_id)
    }

    /// The node id inside the document, for resources found by a query.
    pub fn node_id(&self) -> Option<&str> {
        self.address().map(NodeAddress::node_id)
    }

    /// Whether the node is held in memory.
    pub fn is_resolved(&self) -> bool {
        matches!(self.state, State::Resolved(_))
    }

    /// Whether the resource was deleted.
    pub fn is_deleted(&self) -> bool {
        matches!(self.state, State::Deleted)
    }

    /// The client this resource operates through.
    pub fn client(&self) -> &Client<T, D> {
        &self.client
    }

    fn stale(&self) -> ClientError {
        ResourceError::Stale {
            path: self.document_path.clone(),
        }
        .into()
    }
}

/// Writes the serialized node, or the document path of a resource holding none.
impl<T, D> Display for NodeResource<T, D>
where
    T: Transport,
    D: XmlNode,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            State::Resolved(node) => f.write_str(&node.serialize().map_err(|_| std::fmt::Error)?),
            State::Unresolved => write!(f, "{} (unresolved)", self.document_path),
            State::Deleted => write!(f, "{} (deleted)", self.document_path),
        }
    }
}

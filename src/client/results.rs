use crate::client::{Client, NodeResource};
use crate::errors::ResourceError;
use crate::node::{XmlNode, XotNode};
use crate::query::{Entry, Envelope, NodeAddress};
use crate::transport::{HttpTransport, Transport};
use crate::Result;
use std::iter::FusedIterator;
use std::vec::IntoIter;
use tracing::warn;

/// Sequence of the resources matched by one query, in the order reported by the server.
///
/// Each entry is parsed into a [`NodeResource`] only when it is reached. An entry that cannot be parsed yields
/// [`ResourceError::Malformed`] and iteration continues with the next one; collect into a `Result<Vec<_>>` to stop at
/// the first bad entry instead.
///
/// The sequence is consumed by iterating. Running the query again sends a new request.
#[derive(Debug)]
pub struct QueryResults<T = HttpTransport, D = XotNode>
where
    T: Transport,
    D: XmlNode,
{
    client: Client<T, D>,
    hits: usize,
    entries: IntoIter<Entry>,
}

impl<T, D> QueryResults<T, D>
where
    T: Transport,
    D: XmlNode,
{
    pub(crate) fn new(client: Client<T, D>, envelope: Envelope) -> Self {
        Self {
            client,
            hits: envelope.hits,
            entries: envelope.entries.into_iter(),
        }
    }

    /// The total number of matches, including those outside the requested page.
    pub fn hits(&self) -> usize {
        self.hits
    }

    fn resolve(&self, entry: Entry) -> Result<NodeResource<T, D>> {
        let path = entry.path.ok_or_else(|| ResourceError::Malformed {
            path: String::new(),
            reason: "result carries no document path".to_owned(),
        })?;
        let malformed = |reason: String| ResourceError::Malformed {
            path: path.clone(),
            reason,
        };

        let (absolute_id, node_id) = match (entry.absolute_id, entry.node_id) {
            (Some(absolute_id), Some(node_id)) => (absolute_id, node_id),
            _ => return Err(malformed("result carries no node id".to_owned()).into()),
        };
        let address = NodeAddress::new(absolute_id, node_id)?;
        let mut node = D::parse(&entry.fragment).map_err(|e| malformed(e.message().to_owned()))?;
        if let Ok(url) = self.client.url_for(&path) {
            node.set_source_url(url.as_str());
        }

        Ok(NodeResource::found(self.client.clone(), path, address, node))
    }
}

impl<T, D> Iterator for QueryResults<T, D>
where
    T: Transport,
    D: XmlNode,
{
    type Item = Result<NodeResource<T, D>>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.next()?;

        Some(self.resolve(entry).inspect_err(|error| {
            warn!(%error, "skipping unresolvable query result");
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<T, D> ExactSizeIterator for QueryResults<T, D>
where
    T: Transport,
    D: XmlNode,
{
}

impl<T, D> FusedIterator for QueryResults<T, D>
where
    T: Transport,
    D: XmlNode,
{
}

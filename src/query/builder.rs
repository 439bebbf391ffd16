use super::escape::{cdata, string_literal};
use super::options::QueryOptions;
use crate::errors::{QueryError, ResourceError};
use std::fmt::{Display, Formatter};

/// Namespace of the REST interface's request and response envelopes.
pub const EXIST_NAMESPACE: &str = "http://exist.sourceforge.net/NS/exist";
/// Namespace of the elements wrapping every match of a resource query.
pub const RESULT_NAMESPACE: &str = "https://docs.rs/existdb/result";

/// Builds the body of a query request: the query text plus paging and serialization parameters.
pub(crate) fn payload(query: &str, options: &QueryOptions) -> String {
    format!(
        r#"<query xmlns="{}" start="{}" max="{}" cache="{}"><text>{}</text><properties>{}</properties></query>"#,
        EXIST_NAMESPACE,
        options.start_index(),
        options.max_items(),
        if options.is_cached() { "yes" } else { "no" },
        cdata(query),
        options.serialization_options().to_properties(),
    )
}

/// Wraps an XPath expression so every match comes back tagged with its node id, the absolute id of its document and
/// the document path.
///
/// The expression itself is not validated; it is evaluated by the server with the collection the request is posted
/// to as context.
pub(crate) fn xpath(expression: &str) -> Result<String, QueryError> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Err(QueryError::EmptyExpression);
    }

    Ok(format!(
        r#"for $node in ({})
return <rsc:result xmlns:rsc="{}" rsc:nodeid="{{util:node-id($node)}}" rsc:absid="{{util:absolute-resource-id($node)}}" rsc:path="{{util:collection-name($node) || '/' || util:document-name($node)}}">{{$node}}</rsc:result>"#,
        expression, RESULT_NAMESPACE
    ))
}

/// Identifies a node within the database: the absolute resource id of its document and its node id inside it.
///
/// Both ids are checked to consist of digits (the node id of dot-separated digit groups) because they are embedded
/// into queries verbatim.
///
/// # Examples
///
/// ```
/// # use existdb::NodeAddress;
/// let address = NodeAddress::new("4295229440", "1.2.3").unwrap();
/// assert_eq!("4295229440", address.absolute_id());
/// assert_eq!("1.2.3", address.node_id());
/// assert!(NodeAddress::new("42", "1.x").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeAddress {
    absolute_id: String,
    node_id: String,
}

impl NodeAddress {
    /// Validates and creates an address.
    pub fn new(absolute_id: impl Into<String>, node_id: impl Into<String>) -> Result<Self, ResourceError> {
        let address = Self {
            absolute_id: absolute_id.into(),
            node_id: node_id.into(),
        };

        let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !digits(&address.absolute_id) {
            return Err(address.malformed("absolute resource id must be numeric"));
        }
        if !address.node_id.split('.').all(digits) {
            return Err(address.malformed("node id must be dot-separated numbers"));
        }

        Ok(address)
    }

    /// The absolute resource id of the containing document.
    pub fn absolute_id(&self) -> &str {
        &self.absolute_id
    }

    /// The node id locating the node inside its document.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Expression evaluating to the addressed node.
    pub(crate) fn locate(&self) -> String {
        format!(
            r#"util:node-by-id(util:get-resource-by-absolute-id({}), "{}")"#,
            self.absolute_id, self.node_id
        )
    }

    /// Update expression replacing the addressed node with `data`. Yields one item when the node was replaced and
    /// none when it does not exist.
    pub(crate) fn replace(&self, data: &str) -> String {
        self.update(&format!("update replace $node with parse-xml({})/*", string_literal(data)))
    }

    /// Update expression deleting the addressed node. Yields one item when the node was deleted and none when it
    /// does not exist.
    pub(crate) fn delete(&self) -> String {
        self.update("update delete $node")
    }

    fn update(&self, statement: &str) -> String {
        format!(
            r#"let $document := util:get-resource-by-absolute-id({})
let $node := if (empty($document)) then () else util:node-by-id($document, "{}")
return if (empty($node)) then () else ({}, true())"#,
            self.absolute_id, self.node_id, statement
        )
    }

    fn malformed(&self, reason: &str) -> ResourceError {
        ResourceError::Malformed {
            path: self.to_string(),
            reason: reason.to_owned(),
        }
    }
}

impl Display for NodeAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.absolute_id, self.node_id)
    }
}

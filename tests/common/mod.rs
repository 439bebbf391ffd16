#![allow(dead_code)]

use existdb::{Client, Config, ConnectionError, DeletePolicy, Method, Request, Response, Transport};
use roxmltree::{Document, Node};
use rust_embed::RustEmbed;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ops::Range;
use std::rc::Rc;

#[derive(RustEmbed)]
#[folder = "tests/assets/"]
pub struct Asset;

/// Reads a fixture as text.
pub fn asset(name: &str) -> String {
    let file = Asset::get(name).unwrap();
    String::from_utf8(file.data.into_owned()).unwrap()
}

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn client(exist: &FakeExist, root_collection: &str) -> Client<FakeExist> {
    init_logging();
    let config = Config::builder().root_collection(root_collection).build().unwrap();
    Client::with_transport(config, exist.clone())
}

pub fn lenient_client(exist: &FakeExist, root_collection: &str) -> Client<FakeExist> {
    init_logging();
    let config = Config::builder()
        .root_collection(root_collection)
        .delete_policy(DeletePolicy::Lenient)
        .build()
        .unwrap();
    Client::with_transport(config, exist.clone())
}

/// Asserts that both documents have the same elements, attributes and non-blank text.
pub fn assert_same_xml(expected: &str, actual: &str) {
    let expected_document = Document::parse(expected).unwrap();
    let actual_document = Document::parse(actual).unwrap();

    assert_eq!(
        shape(expected_document.root_element()),
        shape(actual_document.root_element()),
        "expected {} but got {}",
        expected,
        actual
    );
}

fn shape(node: Node<'_, '_>) -> Vec<String> {
    node.descendants()
        .filter_map(|n| {
            if n.is_element() {
                let mut attributes: Vec<String> = n
                    .attributes()
                    .map(|a| format!("{}={}", a.name(), a.value()))
                    .collect();
                attributes.sort();
                Some(format!("<{} {}>", n.tag_name().name(), attributes.join(" ")))
            } else {
                n.text().map(str::trim).filter(|t| !t.is_empty()).map(str::to_owned)
            }
        })
        .collect()
}

const BASE_URL: &str = "http://localhost:8080/exist/rest";
const EXIST_NAMESPACE: &str = "http://exist.sourceforge.net/NS/exist";

#[derive(Debug, Clone)]
struct Stored {
    absolute_id: u64,
    xml: String,
}

#[derive(Debug, Default)]
struct State {
    documents: BTreeMap<String, Stored>,
    next_id: u64,
    requests: Vec<Request>,
}

/// In-memory stand-in for the REST interface of an eXist-db instance, accepting `admin` with an empty password.
///
/// Queries understand the wrapped resource queries and node updates sent by the client for the expressions `//name`
/// and node lookups by id. Element children are numbered from 1, so the document element has node id `1` and its
/// second element child `1.2`.
#[derive(Debug, Clone, Default)]
pub struct FakeExist {
    state: Rc<RefCell<State>>,
}

impl FakeExist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, path: &str, xml: &str) -> Self {
        self.insert(path, xml.to_owned());
        self
    }

    pub fn with_asset(self, path: &str, name: &str) -> Self {
        self.insert(path, asset(name));
        self
    }

    pub fn document(&self, path: &str) -> Option<String> {
        self.state.borrow().documents.get(path).map(|d| d.xml.clone())
    }

    pub fn absolute_id(&self, path: &str) -> Option<u64> {
        self.state.borrow().documents.get(path).map(|d| d.absolute_id)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.borrow().requests.clone()
    }

    fn insert(&self, path: &str, xml: String) {
        let mut state = self.state.borrow_mut();
        let absolute_id = match state.documents.get(path) {
            Some(existing) => existing.absolute_id,
            None => {
                state.next_id += 1;
                state.next_id
            }
        };
        state.documents.insert(path.to_owned(), Stored { absolute_id, xml });
    }

    fn is_collection(&self, path: &str) -> bool {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        self.state.borrow().documents.keys().any(|p| p.starts_with(&prefix))
    }

    fn get(&self, path: &str) -> Response {
        if let Some(xml) = self.document(path) {
            return Response::new(200, xml);
        }
        if self.is_collection(path) {
            return Response::new(
                200,
                format!(r#"<exist:result xmlns:exist="{}"><exist:collection name="{}"/></exist:result>"#, EXIST_NAMESPACE, path),
            );
        }
        not_found(path)
    }

    fn head(&self, path: &str) -> Response {
        match self.document(path).is_some() || self.is_collection(path) {
            true => Response::new(200, ""),
            false => Response::new(404, ""),
        }
    }

    fn put(&self, path: &str, body: Option<&str>) -> Response {
        if self.is_collection(path) {
            return exception(409, path, &format!("{} is a collection", path));
        }
        let body = body.unwrap_or_default();
        if let Err(e) = Document::parse(body) {
            return exception(400, path, &e.to_string());
        }
        self.insert(path, body.to_owned());
        Response::new(201, "")
    }

    fn delete(&self, path: &str) -> Response {
        let prefix = format!("{}/", path);
        let mut state = self.state.borrow_mut();
        let before = state.documents.len();
        state.documents.retain(|p, _| p != path && !p.starts_with(&prefix));

        match state.documents.len() < before {
            true => Response::new(200, ""),
            false => not_found(path),
        }
    }

    fn post(&self, collection: &str, body: Option<&str>) -> Response {
        let body = body.unwrap_or_default();
        let envelope = match Document::parse(body) {
            Ok(envelope) => envelope,
            Err(e) => return exception(400, collection, &e.to_string()),
        };
        let root = envelope.root_element();
        let query = envelope
            .descendants()
            .find(|n| n.tag_name().name() == "text")
            .and_then(|n| n.text())
            .unwrap_or_default()
            .to_owned();
        let start: usize = root.attribute("start").and_then(|s| s.parse().ok()).unwrap_or(1);
        let max: usize = root.attribute("max").and_then(|s| s.parse().ok()).unwrap_or(0);

        if let Some(rest) = query.strip_prefix("for $node in (") {
            let expression = match rest.find(")\nreturn ") {
                Some(end) => &rest[..end],
                None => return syntax_error(collection),
            };
            return match self.evaluate(collection, expression) {
                Some(matches) => wrapped(matches, start, max),
                None => syntax_error(collection),
            };
        }
        if query.contains("update replace $node") || query.contains("update delete $node") {
            return self.update(collection, &query);
        }

        syntax_error(collection)
    }

    fn evaluate(&self, collection: &str, expression: &str) -> Option<Vec<Match>> {
        if let Some(name) = expression.strip_prefix("//") {
            if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
                return None;
            }
            let prefix = format!("{}/", collection.trim_end_matches('/'));
            let state = self.state.borrow();
            let mut matches = vec![];
            for (path, stored) in state.documents.iter().filter(|(p, _)| p.starts_with(&prefix)) {
                let document = Document::parse(&stored.xml).ok()?;
                for node in document.descendants().filter(|n| n.is_element() && n.tag_name().name() == name) {
                    matches.push(Match {
                        path: path.clone(),
                        absolute_id: stored.absolute_id,
                        node_id: node_id(node),
                        fragment: stored.xml[node.range()].to_owned(),
                    });
                }
            }
            return Some(matches);
        }

        let absolute_id = between(expression, "util:get-resource-by-absolute-id(", ")")?.parse().ok()?;
        let node_id = between(expression, "), \"", "\")")?;
        Some(self.locate(absolute_id, node_id).map(|(m, _)| vec![m]).unwrap_or_default())
    }

    fn update(&self, collection: &str, query: &str) -> Response {
        let absolute_id = match between(query, "util:get-resource-by-absolute-id(", ")").and_then(|s| s.parse().ok()) {
            Some(id) => id,
            None => return syntax_error(collection),
        };
        let node_id = match between(query, "util:node-by-id($document, \"", "\")") {
            Some(id) => id,
            None => return syntax_error(collection),
        };
        let replacement = match between(query, "parse-xml(\"", "\")/*") {
            Some(literal) => literal.replace("&quot;", "\"").replace("&amp;", "&"),
            None => String::new(),
        };

        let (found, range) = match self.locate(absolute_id, node_id) {
            Some(located) => located,
            None => return Response::new(200, envelope(0, 0, "")),
        };
        let xml = self.document(&found.path).unwrap_or_default();
        let updated = format!("{}{}{}", &xml[..range.start], replacement, &xml[range.end..]);
        self.insert(&found.path, updated);

        Response::new(200, envelope(1, 1, "true"))
    }

    fn locate(&self, absolute_id: u64, node_id: &str) -> Option<(Match, Range<usize>)> {
        let state = self.state.borrow();
        let (path, stored) = state.documents.iter().find(|(_, d)| d.absolute_id == absolute_id)?;
        let document = Document::parse(&stored.xml).ok()?;
        let node = document
            .descendants()
            .find(|n| n.is_element() && self::node_id(*n) == node_id)?;

        Some((
            Match {
                path: path.clone(),
                absolute_id,
                node_id: node_id.to_owned(),
                fragment: stored.xml[node.range()].to_owned(),
            },
            node.range(),
        ))
    }
}

impl Transport for FakeExist {
    fn execute(&self, request: &Request) -> Result<Response, ConnectionError> {
        self.state.borrow_mut().requests.push(request.clone());

        if request.credentials.user() != "admin" || !request.credentials.password().is_empty() {
            return Ok(Response::new(401, ""));
        }
        let path = match request.url.strip_prefix(BASE_URL) {
            Some("") => "/",
            Some(path) => path,
            None => {
                return Err(ConnectionError::Unreachable {
                    url: request.url.clone(),
                    message: "unknown host".to_owned(),
                })
            }
        };
        let body = request.body.as_deref();

        Ok(match request.method {
            Method::Get => self.get(path),
            Method::Head => self.head(path),
            Method::Put => self.put(path, body),
            Method::Delete => self.delete(path),
            Method::Post => self.post(path, body),
        })
    }
}

struct Match {
    path: String,
    absolute_id: u64,
    node_id: String,
    fragment: String,
}

fn node_id(node: Node<'_, '_>) -> String {
    let mut positions = vec![];
    let mut current = node;
    while let Some(parent) = current.parent_element() {
        let position = parent
            .children()
            .filter(|c| c.is_element())
            .position(|c| c == current)
            .unwrap_or_default();
        positions.push((position + 1).to_string());
        current = parent;
    }
    positions.push("1".to_owned());
    positions.reverse();
    positions.join(".")
}

fn between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = text.find(start)? + start.len();
    let to = text[from..].find(end)? + from;
    Some(&text[from..to])
}

fn wrapped(matches: Vec<Match>, start: usize, max: usize) -> Response {
    let hits = matches.len();
    let page: Vec<Match> = matches
        .into_iter()
        .skip(start.saturating_sub(1))
        .take(if max == 0 { usize::MAX } else { max })
        .collect();
    let content: String = page
        .iter()
        .map(|m| {
            format!(
                r#"<rsc:result xmlns:rsc="https://docs.rs/existdb/result" rsc:nodeid="{}" rsc:absid="{}" rsc:path="{}">{}</rsc:result>"#,
                m.node_id, m.absolute_id, m.path, m.fragment
            )
        })
        .collect();

    Response::new(200, envelope(hits, page.len(), &content))
}

fn envelope(hits: usize, count: usize, content: &str) -> String {
    match content.is_empty() {
        true => format!(
            r#"<exist:result xmlns:exist="{}" exist:hits="{}" exist:start="1" exist:count="{}"/>"#,
            EXIST_NAMESPACE, hits, count
        ),
        false => format!(
            r#"<exist:result xmlns:exist="{}" exist:hits="{}" exist:start="1" exist:count="{}">{}</exist:result>"#,
            EXIST_NAMESPACE, hits, count, content
        ),
    }
}

fn exception(status: u16, path: &str, message: &str) -> Response {
    Response::new(
        status,
        format!("<exception><path>{}</path><message>{}</message></exception>", path, message),
    )
}

fn syntax_error(collection: &str) -> Response {
    exception(
        400,
        collection,
        "err:XPST0003 Cannot compile xquery: unexpected token [at line 1, column 1]",
    )
}

fn not_found(path: &str) -> Response {
    Response::new(
        404,
        format!("<exception><path>{}</path><message>Document {} not found</message></exception>", path, path),
    )
}

use crate::errors::QueryError;
use crate::query::EXIST_NAMESPACE;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::{NsReader, Reader};

/// One wrapped match of a resource query. The fragment is the raw XML text of the matched node, not yet parsed.
///
/// Identity attributes are kept optional here; a missing one makes only this entry unresolvable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Entry {
    pub(crate) absolute_id: Option<String>,
    pub(crate) node_id: Option<String>,
    pub(crate) path: Option<String>,
    pub(crate) fragment: String,
}

/// The `exist:result` envelope of a wrapped query response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Envelope {
    /// Total number of items the query produced, regardless of paging.
    pub(crate) hits: usize,
    /// The wrapped matches in the order reported by the server.
    pub(crate) entries: Vec<Entry>,
}

/// Splits a wrapped query response into its entries without parsing the matched nodes themselves.
///
/// A body that ends before the envelope is closed, or that holds fewer items than its `exist:count` announces, is
/// rejected rather than returned as a shorter sequence.
pub(crate) fn parse_envelope(raw: &str) -> Result<Envelope, QueryError> {
    let mut reader = Reader::from_str(raw);
    let mut depth = 0usize;
    let mut root = None;
    let mut items = 0usize;
    let mut open: Option<(Entry, usize)> = None;
    let mut entries = vec![];

    loop {
        let position = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| unexpected(format!("malformed envelope at byte {}: {}", position, e)))?;

        match event {
            Event::Start(e) => {
                depth += 1;
                match depth {
                    1 => root = Some(read_root(&e)?),
                    2 => {
                        items += 1;
                        if is_result(&e) {
                            open = Some((read_entry(&e)?, reader.buffer_position() as usize));
                        }
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => match depth + 1 {
                1 => root = Some(read_root(&e)?),
                2 => {
                    items += 1;
                    if is_result(&e) {
                        entries.push(read_entry(&e)?);
                    }
                }
                _ => {}
            },
            Event::Text(t) if depth == 1 && !t.iter().all(u8::is_ascii_whitespace) => items += 1,
            Event::End(_) => {
                if depth == 2 {
                    if let Some((mut entry, start)) = open.take() {
                        entry.fragment = raw[start..position].to_owned();
                        entries.push(entry);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let (hits, count) = root.ok_or_else(|| unexpected("response holds no result element".to_owned()))?;
    if depth != 0 || open.is_some() {
        return Err(unexpected(format!(
            "envelope ends inside an open element after {} complete entries",
            entries.len()
        )));
    }
    if let Some(count) = count.filter(|&count| count != items) {
        return Err(unexpected(format!("envelope announces {} items but holds {}", count, items)));
    }

    Ok(Envelope {
        hits: hits.unwrap_or(entries.len()),
        entries,
    })
}

/// Whether `raw` is the collection listing the server answers a GET on a collection with.
pub(crate) fn is_collection_listing(raw: &str) -> bool {
    let mut reader = NsReader::from_str(raw);
    loop {
        match reader.read_resolved_event() {
            Ok((namespace, Event::Start(e) | Event::Empty(e))) => {
                let in_exist_namespace =
                    matches!(namespace, ResolveResult::Bound(ns) if ns.as_ref() == EXIST_NAMESPACE.as_bytes());
                return in_exist_namespace && is_result(&e);
            }
            Ok((_, Event::Eof)) | Err(_) => return false,
            Ok(_) => {}
        }
    }
}

fn is_result(element: &BytesStart<'_>) -> bool {
    element.local_name().as_ref() == b"result"
}

/// Reads the `hits` and `count` attributes of the envelope root.
fn read_root(element: &BytesStart<'_>) -> Result<(Option<usize>, Option<usize>), QueryError> {
    if !is_result(element) {
        return Err(unexpected(format!(
            "expected a result envelope, found `{}`",
            String::from_utf8_lossy(element.name().as_ref())
        )));
    }

    Ok((count_attribute(element, b"hits")?, count_attribute(element, b"count")?))
}

fn count_attribute(element: &BytesStart<'_>, local_name: &[u8]) -> Result<Option<usize>, QueryError> {
    attribute(element, local_name)?
        .map(|value| {
            value.parse::<usize>().map_err(|_| {
                unexpected(format!(
                    "invalid {} `{}`",
                    String::from_utf8_lossy(local_name),
                    value
                ))
            })
        })
        .transpose()
}

fn read_entry(element: &BytesStart<'_>) -> Result<Entry, QueryError> {
    Ok(Entry {
        absolute_id: attribute(element, b"absid")?,
        node_id: attribute(element, b"nodeid")?,
        path: attribute(element, b"path")?,
        fragment: String::new(),
    })
}

fn attribute(element: &BytesStart<'_>, local_name: &[u8]) -> Result<Option<String>, QueryError> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| unexpected(e.to_string()))?;
        if attribute.key.local_name().as_ref() == local_name {
            let value = attribute.unescape_value().map_err(|e| unexpected(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn unexpected(reason: String) -> QueryError {
    QueryError::UnexpectedResponse { reason }
}

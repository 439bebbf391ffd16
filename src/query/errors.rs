use quick_xml::events::Event;
use quick_xml::Reader;
use std::fmt::{Display, Formatter};

/// The error type for a query rejected by the server.
///
/// The REST interface answers rejected queries with an `<exception>` document naming the collection the query ran on
/// and one or more diagnostic messages. Bodies of any other shape are kept as a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFailed {
    status: u16,
    raw: String,
    path: Option<String>,
    messages: Vec<String>,
    code: Option<String>,
    payload: String,
}

impl QueryFailed {
    pub(crate) fn new(status: u16, raw: String, payload: String) -> Self {
        let (path, messages) = parse_exception(&raw).unwrap_or_else(|| {
            let message = raw.trim();
            match message.is_empty() {
                true => (None, vec![]),
                false => (None, vec![message.to_owned()]),
            }
        });
        let code = messages.first().and_then(|m| error_code(m));

        Self {
            status,
            raw,
            path,
            messages,
            code,
            payload,
        }
    }

    /// The HTTP status the server answered with.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The unparsed response body.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The collection the query was evaluated on, when reported.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// All diagnostic messages.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// The first diagnostic message, or an empty string.
    pub fn message(&self) -> &str {
        self.messages.first().map(String::as_str).unwrap_or_default()
    }

    /// The XQuery [error code](https://www.w3.org/TR/xquery-31/#id-identifying-errors) of the first message, like
    /// `err:XPST0003`.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// The request body that was rejected.
    pub fn payload(&self) -> &str {
        &self.payload
    }
}

impl Display for QueryFailed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "query failed with status {}", self.status)?;
        if let Some(path) = &self.path {
            write!(f, " on collection `{}`", path)?;
        }
        if !self.messages.is_empty() {
            write!(f, ": {}", self.messages.join("; "))?;
        }
        Ok(())
    }
}

impl std::error::Error for QueryFailed {}

enum Field {
    Path,
    Message,
}

fn parse_exception(raw: &str) -> Option<(Option<String>, Vec<String>)> {
    let mut reader = Reader::from_str(raw);
    let mut is_exception = false;
    let mut depth = 0usize;
    let mut field: Option<(Field, usize)> = None;
    let mut text = String::new();
    let mut path = None;
    let mut messages = vec![];

    loop {
        match reader.read_event().ok()? {
            Event::Start(e) => {
                depth += 1;
                if field.is_none() {
                    match e.local_name().as_ref() {
                        b"exception" => is_exception = true,
                        b"path" => field = Some((Field::Path, depth)),
                        b"message" => field = Some((Field::Message, depth)),
                        _ => {}
                    }
                }
            }
            Event::Text(t) if field.is_some() => text.push_str(&t.unescape().ok()?),
            Event::CData(c) if field.is_some() => text.push_str(&String::from_utf8_lossy(&c)),
            Event::End(_) => {
                if matches!(field, Some((_, opened)) if opened == depth) {
                    match field.take() {
                        Some((Field::Path, _)) => path = Some(text.trim().to_owned()),
                        Some((Field::Message, _)) => messages.push(text.trim().to_owned()),
                        None => {}
                    }
                    text.clear();
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    is_exception.then_some((path, messages))
}

fn error_code(message: &str) -> Option<String> {
    message
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != ':'))
        .find(|token| match token.split_once(':') {
            Some((prefix, code)) => {
                prefix.ends_with("err") && !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric())
            }
            None => false,
        })
        .map(str::to_owned)
}

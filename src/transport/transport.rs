use crate::errors::ConnectionError;
use std::fmt::{Debug, Display, Formatter};

/// HTTP methods used by the REST interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Reads a document or collection listing.
    Get,
    /// Checks that a document exists.
    Head,
    /// Runs a query.
    Post,
    /// Stores a document.
    Put,
    /// Removes a document.
    Delete,
}

impl Method {
    /// The method name as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Basic authentication credentials attached to every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    /// Creates credentials for `user`.
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// The user name.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The password.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// One HTTP exchange as seen by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Absolute, percent-encoded URL.
    pub url: String,
    /// Sent as basic authentication.
    pub credentials: Credentials,
    /// `Content-Type` of the body, set together with it.
    pub content_type: Option<&'static str>,
    /// Request body, if any.
    pub body: Option<String>,
}

impl Request {
    /// Creates a request without body.
    pub fn new(method: Method, url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            method,
            url: url.into(),
            credentials,
            content_type: None,
            body: None,
        }
    }

    /// Attaches an XML body.
    pub fn with_xml(mut self, body: impl Into<String>) -> Self {
        self.content_type = Some("application/xml");
        self.body = Some(body.into());
        self
    }
}

/// The answer of the server to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header, if the server sent one.
    pub content_type: Option<String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl Response {
    /// Creates a response with the given status and body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    /// Whether the status is in the `2xx` range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Represents a channel usable for talking to the database's REST interface.
///
/// Each call performs exactly one blocking request/response exchange and keeps no state between calls. Retries are
/// left to the caller. Implementations only fail for network level problems; every HTTP status, including errors, is
/// returned as a [`Response`].
pub trait Transport: Debug {
    /// Performs the exchange.
    fn execute(&self, request: &Request) -> Result<Response, ConnectionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_hides_password() {
        let credentials = Credentials::new("admin", "secret");

        assert!(!format!("{:?}", credentials).contains("secret"));
    }

    #[test]
    fn test_request_with_xml_sets_content_type() {
        let request = Request::new(Method::Put, "http://localhost", Credentials::new("admin", "")).with_xml("<a/>");

        assert_eq!(Some("application/xml"), request.content_type);
        assert_eq!(Some("<a/>".to_owned()), request.body);
    }

    #[test]
    fn test_response_success_range() {
        assert!(Response::new(201, "").is_success());
        assert!(!Response::new(404, "").is_success());
        assert!(!Response::new(199, "").is_success());
    }

    #[test]
    fn test_response_text_replaces_invalid_utf8() {
        let response = Response::new(200, vec![b'a', 0xa0, b'b']);

        assert_eq!("a\u{fffd}b", response.text());
    }

    #[test]
    fn test_method_displays_wire_name() {
        assert_eq!("DELETE", Method::Delete.to_string());
    }
}

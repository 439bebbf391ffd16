use crate::transport::{Credentials, Method, Request, Response, Transport};
use crate::{ClientError, Result};
use tracing::{debug, trace};
use url::Url;

/// Responsible for low-level communication through the [`Transport`]. It attaches the credentials to every request,
/// logs the exchange and turns a refused authorization into [`ClientError::Auth`].
///
/// As opposed to the [`Client`], connection does not understand what requests do or how to parse responses. It only
/// sends them and hands back whatever status the server answered with.
///
/// [`Client`]: crate::Client
#[derive(Debug)]
pub struct Connection<T>
where
    T: Transport,
{
    transport: T,
    credentials: Credentials,
}

impl<T> Connection<T>
where
    T: Transport,
{
    /// Creates a connection that talks to the database through `transport`, authenticating as `credentials`.
    pub fn new(transport: T, credentials: Credentials) -> Self {
        Self { transport, credentials }
    }

    /// The credentials sent with each request.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub(crate) fn get(&self, url: &Url) -> Result<Response> {
        self.send(Request::new(Method::Get, url.as_str(), self.credentials.clone()))
    }

    pub(crate) fn head(&self, url: &Url) -> Result<Response> {
        self.send(Request::new(Method::Head, url.as_str(), self.credentials.clone()))
    }

    pub(crate) fn delete(&self, url: &Url) -> Result<Response> {
        self.send(Request::new(Method::Delete, url.as_str(), self.credentials.clone()))
    }

    pub(crate) fn put(&self, url: &Url, body: String) -> Result<Response> {
        self.send(Request::new(Method::Put, url.as_str(), self.credentials.clone()).with_xml(body))
    }

    pub(crate) fn post(&self, url: &Url, body: String) -> Result<Response> {
        self.send(Request::new(Method::Post, url.as_str(), self.credentials.clone()).with_xml(body))
    }

    fn send(&self, request: Request) -> Result<Response> {
        if let Some(body) = &request.body {
            trace!(method = %request.method, url = %request.url, body = %body, "sending request");
        }

        let response = self.transport.execute(&request)?;
        debug!(method = %request.method, url = %request.url, status = response.status, "request finished");

        match response.status {
            401 => Err(ClientError::Auth),
            _ => Ok(response),
        }
    }
}

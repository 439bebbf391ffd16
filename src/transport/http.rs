use super::{Method, Request, Response, Transport};
use crate::config::Config;
use crate::errors::ConnectionError;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

/// [`Transport`] over HTTP(S) backed by a blocking [`reqwest`] client.
///
/// Connection reuse is left to `reqwest`; no pool is managed here.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport honoring the timeout of `config`.
    pub fn new(config: &Config) -> Result<Self, ConnectionError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| ConnectionError::Setup {
            message: e.to_string(),
        })?;

        Ok(Self { client })
    }

    /// Wraps an already configured `reqwest` client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }

    fn classify(url: &str, error: reqwest::Error) -> ConnectionError {
        match error.is_timeout() {
            true => ConnectionError::Timeout { url: url.to_owned() },
            false => ConnectionError::Unreachable {
                url: url.to_owned(),
                message: error.to_string(),
            },
        }
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &Request) -> Result<Response, ConnectionError> {
        let mut builder = self
            .client
            .request(Self::method(request.method), &request.url)
            .basic_auth(request.credentials.user(), Some(request.credentials.password()));

        if let Some(content_type) = request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().map_err(|e| Self::classify(&request.url, e))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().map_err(|e| Self::classify(&request.url, e))?;

        Ok(Response {
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}

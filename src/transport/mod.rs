mod http;
#[allow(clippy::module_inception)]
mod transport;

pub use self::http::HttpTransport;
pub use self::transport::{Credentials, Method, Request, Response, Transport};

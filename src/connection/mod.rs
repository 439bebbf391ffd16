#[allow(clippy::module_inception)]
mod connection;

pub use self::connection::Connection;

mod builder;
mod errors;
mod escape;
mod options;
mod response;

pub use self::builder::{NodeAddress, EXIST_NAMESPACE, RESULT_NAMESPACE};
pub use self::errors::QueryFailed;
pub use self::options::{Attribute, ParseError, QueryOptions, SerializationOptions, ToAttribute};

pub(crate) use self::builder::{payload, xpath};
pub(crate) use self::response::{is_collection_listing, parse_envelope, Entry, Envelope};

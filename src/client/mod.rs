#[allow(clippy::module_inception)]
mod client;
mod resource;
mod results;

pub use self::client::{Client, StoreMode};
pub use self::resource::NodeResource;
pub use self::results::QueryResults;

mod key_value_store;
mod resolver;
mod upstream_client;

pub use key_value_store::KeyValueStore;
pub use resolver::Resolver;
pub use upstream_client::{TransportError, UpstreamClient, UpstreamResponse};

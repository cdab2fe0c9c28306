mod dashmap_kv_store;
mod http_upstream_client;

pub use dashmap_kv_store::DashMapKeyValueStore;
pub use http_upstream_client::{HttpUpstreamClient, UpstreamConfig, ACCEPT_VERSION};

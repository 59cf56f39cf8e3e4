pub mod auth;
pub mod cipher;
pub mod dirs;
pub mod handlers;
pub mod server;
pub mod share;
pub mod store;
pub mod validate;

/// Shared application state threaded through axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: store::Store,
    /// Password cipher under the process-wide key.
    pub cipher: cipher::Cipher,
    /// Share-link signer under the process-wide salt.
    pub shares: share::ShareSigner,
    /// Default TTL in seconds for newly issued share links.
    pub share_ttl: u64,
    /// Optional API key write-protecting the vault endpoints.
    pub api_key: Option<String>,
}

pub use server::{resolve_data_dir, router, run, ServerConfig};

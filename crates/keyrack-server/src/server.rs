use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    auth::require_api_key,
    cipher::Cipher,
    handlers::{
        create_entry, delete_entry, get_entry, health, list_entries, share_entry,
        update_entry, view_shared_entry,
    },
    share::{ShareSigner, DEFAULT_SHARE_TTL},
    store::Store,
    AppState,
};

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub data_dir: Option<PathBuf>,
    /// Hex-encoded cipher key (16, 24, or 32 bytes decoded). When unset,
    /// the key is loaded from (or generated into) `keyrack.key`.
    pub cipher_key: Option<String>,
    /// Share-link salt. When unset, loaded from (or generated into)
    /// `keyrack.salt`.
    pub share_salt: Option<String>,
    pub share_ttl: u64,
    pub cors_origins: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("KEYRACK_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("KEYRACK_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8806),
            api_key: std::env::var("KEYRACK_API_KEY").ok(),
            data_dir: std::env::var("KEYRACK_DATA_DIR").ok().map(PathBuf::from),
            cipher_key: std::env::var("KEYRACK_CIPHER_KEY").ok(),
            share_salt: std::env::var("KEYRACK_SHARE_SALT").ok(),
            share_ttl: std::env::var("KEYRACK_SHARE_TTL")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(DEFAULT_SHARE_TTL),
            cors_origins: std::env::var("KEYRACK_CORS_ORIGINS").ok(),
        }
    }
}

pub async fn run(cfg: ServerConfig) -> Result<()> {
    let data_dir = resolve_data_dir(cfg.data_dir.as_ref())?;
    info!(data_dir = %data_dir.display(), "using data directory");

    // Key and salt are fixed for the process lifetime; everything
    // downstream treats them as immutable configuration.
    let key = load_or_create_cipher_key(cfg.cipher_key.as_deref(), &data_dir)?;
    let cipher = Cipher::new(&key).map_err(|e| anyhow::anyhow!("cipher key: {e}"))?;
    let salt = load_or_create_salt(cfg.share_salt, &data_dir)?;

    let db_path = data_dir.join("keyrack.db");
    let store = Store::open(&db_path).context("open store")?;

    let state = AppState {
        store,
        cipher,
        shares: ShareSigner::new(salt),
        share_ttl: cfg.share_ttl,
        api_key: cfg.api_key,
    };

    let cors = build_cors(cfg.cors_origins.as_deref());

    let app = router(state).layer(cors).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid host/port")?;

    info!(%addr, "keyrack server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind listener")?;

    axum::serve(listener, app).await.context("server error")
}

/// Builds the application router. Split out from `run` so tests can drive
/// it without binding a socket.
pub fn router(state: AppState) -> Router {
    // Share-link views are the one unauthenticated window into the vault;
    // both the canonical trailing-slash form and the bare form resolve.
    let public = Router::new()
        .route("/health", get(health))
        .route(
            "/entry/share/{digest}/{expires_at}/{id}/",
            get(view_shared_entry),
        )
        .route(
            "/entry/share/{digest}/{expires_at}/{id}",
            get(view_shared_entry),
        );

    let protected = Router::new()
        .route("/entries", get(list_entries))
        .route("/entries", post(create_entry))
        .route("/entries/{id}", get(get_entry))
        .route("/entries/{id}", put(update_entry))
        .route("/entries/{id}", delete(delete_entry))
        .route("/entries/{id}/share", post(share_entry))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new().merge(public).merge(protected).with_state(state)
}

pub fn resolve_data_dir(configured: Option<&PathBuf>) -> Result<PathBuf> {
    match configured {
        Some(d) => {
            std::fs::create_dir_all(d).context("create data dir")?;
            Ok(d.clone())
        }
        None => crate::dirs::data_dir(),
    }
}

/// Resolves the cipher key: explicit hex config wins, otherwise the raw
/// key file, otherwise a fresh 32-byte key written on first run.
fn load_or_create_cipher_key(configured: Option<&str>, data_dir: &Path) -> Result<Vec<u8>> {
    if let Some(hex_key) = configured {
        return hex::decode(hex_key.trim())
            .context("KEYRACK_CIPHER_KEY is not valid hex");
    }

    let key_path = data_dir.join("keyrack.key");
    if key_path.exists() {
        std::fs::read(&key_path).context("read keyrack.key")
    } else {
        let key: [u8; 32] = rand::random();
        std::fs::write(&key_path, key).context("write keyrack.key")?;
        info!("generated new cipher key");
        Ok(key.to_vec())
    }
}

fn load_or_create_salt(configured: Option<String>, data_dir: &Path) -> Result<String> {
    if let Some(salt) = configured {
        return Ok(salt);
    }

    let salt_path = data_dir.join("keyrack.salt");
    if salt_path.exists() {
        let salt = std::fs::read_to_string(&salt_path).context("read keyrack.salt")?;
        Ok(salt.trim().to_owned())
    } else {
        let bytes: [u8; 16] = rand::random();
        let salt = hex::encode(bytes);
        std::fs::write(&salt_path, &salt).context("write keyrack.salt")?;
        info!("generated new share-link salt");
        Ok(salt)
    }
}

fn build_cors(origins: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::DELETE,
            http::Method::OPTIONS,
        ])
        .allow_headers(Any);

    match origins {
        Some(o) => {
            let origins: Vec<_> = o
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            cors.allow_origin(origins)
        }
        None => cors.allow_origin(Any),
    }
}

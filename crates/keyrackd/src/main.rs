use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

// ── CLI definition ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "keyrackd",
    about = "Keyrackd — personal credential vault server daemon",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Keyrack HTTP server
    Serve {
        /// Port to listen on (default: $KEYRACK_PORT or 8806)
        #[arg(long, env = "KEYRACK_PORT", default_value = "8806")]
        port: u16,
        /// Host to bind (default: $KEYRACK_HOST or 0.0.0.0)
        #[arg(long, env = "KEYRACK_HOST", default_value = "0.0.0.0")]
        host: String,
        /// Log level: error, warn, info, debug, verbose (default: $KEYRACK_LOG_LEVEL or warn)
        #[arg(long, env = "KEYRACK_LOG_LEVEL")]
        log_level: Option<String>,
    },
    /// Generate a fresh cipher key and share-link salt and print them as
    /// environment assignments. Run once, then inject the values at startup.
    Keygen,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let effective_log_level = if let Commands::Serve { ref log_level, .. } = cli.command {
        let raw = log_level
            .clone()
            .or_else(|| std::env::var("KEYRACK_LOG_LEVEL").ok())
            .unwrap_or_else(|| "warn".into());
        if raw.eq_ignore_ascii_case("verbose") {
            "debug".to_owned()
        } else {
            raw
        }
    } else {
        std::env::var("KEYRACK_LOG_LEVEL").unwrap_or_else(|_| "warn".into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&effective_log_level))
        .init();

    match cli.command {
        Commands::Serve {
            port,
            host,
            log_level: _,
        } => cmd_serve(host, port).await,

        Commands::Keygen => cmd_keygen(),
    }
}

// ── Command implementations ───────────────────────────────────────────────────

async fn cmd_serve(host: String, port: u16) -> Result<()> {
    let cfg = keyrack_server::ServerConfig {
        host,
        port,
        ..Default::default()
    };

    keyrack_server::run(cfg).await
}

fn cmd_keygen() -> Result<()> {
    let key: [u8; 32] = rand::random();
    let salt: [u8; 16] = rand::random();

    println!("KEYRACK_CIPHER_KEY={}", hex::encode(key));
    println!("KEYRACK_SHARE_SALT={}", hex::encode(salt));
    Ok(())
}

//! Imreview Server Binary
//!
//! Environment:
//! - `IMREVIEW_ADDR`: listen address (default `127.0.0.1:8080`)
//! - `IMREVIEW_DB`: SQLite path; state is restored at startup and saved after each change
//! - `IMREVIEW_ADMIN_EMAIL`: administrator to create if missing
//! - `IMREVIEW_CONFIG`: config file to use instead of the standard layers
//!   (`~/.imreview/config.toml`, then `./.imreview/config.toml`)
//! - `RUST_LOG`: log filter (default `info,imreview=debug`)

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use imreview_core::{EditorialOffice, ReviewConfig};
use imreview_server::{serve, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,imreview=debug")),
        )
        .init();

    let config = match std::env::var("IMREVIEW_CONFIG") {
        Ok(path) => ReviewConfig::load_file(Path::new(&path))?,
        Err(_) => ReviewConfig::load_standard(Some(&std::env::current_dir()?))?,
    };
    let state = match std::env::var("IMREVIEW_DB") {
        Ok(path) => AppState::with_persistence(config, path)?,
        Err(_) => AppState::new(EditorialOffice::new(config)),
    };

    if let Ok(email) = std::env::var("IMREVIEW_ADMIN_EMAIL") {
        if state.office.find_user_by_email(&email)?.is_none() {
            let admin = state.office.bootstrap_admin(&email, "Administrator")?;
            tracing::info!(user_id = %admin.id, "Administrator created");
            state.save_state()?;
        }
    }

    let addr = std::env::var("IMREVIEW_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    serve(&addr, Arc::new(state)).await
}

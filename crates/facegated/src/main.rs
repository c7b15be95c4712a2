use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod service;
mod store;

pub const BUS_NAME: &str = "org.freedesktop.Facegate1";
pub const OBJECT_PATH: &str = "/org/freedesktop/Facegate1";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("facegated starting");

    let config = config::Config::from_env();
    let policy = config.load_policy().context("failed to load policy")?;

    let store = store::GalleryStore::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open gallery at {}", config.db_path.display()))?;
    let service = Arc::new(service::AuthService::new(store, policy.matching));
    tracing::info!(
        db = %config.db_path.display(),
        encodings = service.store().count_all().await?,
        "gallery ready"
    );
    let iface = dbus_interface::FacegateService::new(service);

    let builder = if config.session_bus {
        zbus::connection::Builder::session()?
    } else {
        zbus::connection::Builder::system()?
    };
    let _conn = builder
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, iface)?
        .build()
        .await
        .context("failed to register on D-Bus")?;

    tracing::info!(
        bus = if config.session_bus { "session" } else { "system" },
        name = BUS_NAME,
        "facegated ready"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("facegated shutting down");

    Ok(())
}

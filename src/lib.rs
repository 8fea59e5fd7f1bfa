// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod link;
pub mod metrics;
pub mod store;
pub mod telemetry;

pub use crate::api::{create_router, AppState};
pub use crate::config::LedgerConfig;
pub use crate::error::LedgerError;
pub use crate::ledger::{RangeOrder, VisitLedger};

use std::sync::Arc;

use anyhow::Context;
use axum::Router;

use crate::config::StoreKind;
use crate::store::{FileStore, MemoryStore, VisitStore};

/// Build the full app from `config/ledger.toml` (or `$LEDGER_CONFIG_PATH`) and environment overrides.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = LedgerConfig::load_default()?;
    let store = open_store(&cfg).await?;
    app_with(&cfg, store).await
}

/// Open the store selected by `cfg`.
pub async fn open_store(cfg: &LedgerConfig) -> anyhow::Result<Arc<dyn VisitStore>> {
    let store: Arc<dyn VisitStore> = match cfg.store {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::File => {
            let store = FileStore::open(&cfg.snapshot_path)
                .await
                .with_context(|| format!("opening {}", cfg.snapshot_path.display()))?;
            tracing::info!(path = %store.path().display(), "file snapshot store opened");
            Arc::new(store)
        }
    };
    Ok(store)
}

/// Wire a ledger over `store` into a router. Flushes the store first when
/// `flush_on_start` is set; that is the only place the ledger is ever reset.
pub async fn app_with(cfg: &LedgerConfig, store: Arc<dyn VisitStore>) -> anyhow::Result<Router> {
    let ledger = Arc::new(VisitLedger::new(store).with_range_order(cfg.range_order));
    if cfg.flush_on_start {
        ledger
            .reset()
            .await
            .context("flushing visit store on startup")?;
    }

    let handle = crate::metrics::install()?;
    let mut router = api::create_router(AppState::new(ledger.clone()), cfg.debug_routes);
    if cfg.debug_routes {
        router = router.merge(crate::metrics::router(handle));
    }

    tracing::info!(
        store = ?cfg.store,
        range_order = ?ledger.range_order(),
        debug_routes = cfg.debug_routes,
        "visit ledger ready"
    );
    Ok(router)
}

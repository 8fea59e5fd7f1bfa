//! # Visit Ledger
//! Per-second buckets of visited domains on top of a [`VisitStore`].
//!
//! Ingest normalizes a batch of raw links and adds the domains to the bucket
//! keyed by the current epoch second. Query enumerates bucket keys, keeps the
//! ones inside the requested range and unions their members.
//!
//! The ledger holds no mutable state of its own; concurrent calls only meet in
//! the store, and each `add_members` is the unit of atomicity.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result, StoreOp};
use crate::link::normalize_batch;
use crate::metrics;
use crate::store::VisitStore;

/// Source of bucket timestamps.
pub trait Clock: Send + Sync {
    /// Current UNIX time in whole seconds.
    fn now_unix(&self) -> u64;
}

/// Wall clock (UTC), truncated to the second.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// Which way round `from`/`to` are read by [`VisitLedger::query`].
///
/// Both bounds are exclusive in either mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeOrder {
    /// `from > bucket > to`: `from` is the later bound. Historical behaviour,
    /// kept as the default so existing clients see the same results.
    #[default]
    Legacy,
    /// `from < bucket < to`: `from` is the earlier bound.
    Chronological,
}

impl RangeOrder {
    pub fn contains(self, from: u64, to: u64, bucket: u64) -> bool {
        match self {
            RangeOrder::Legacy => from > bucket && bucket > to,
            RangeOrder::Chronological => from < bucket && bucket < to,
        }
    }
}

impl FromStr for RangeOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(RangeOrder::Legacy),
            "chronological" => Ok(RangeOrder::Chronological),
            other => anyhow::bail!("unknown range order '{other}' (expected legacy|chronological)"),
        }
    }
}

/// Decimal store key for the bucket at `ts`.
pub fn bucket_key(ts: u64) -> String {
    ts.to_string()
}

pub struct VisitLedger {
    store: Arc<dyn VisitStore>,
    clock: Arc<dyn Clock>,
    range_order: RangeOrder,
}

impl VisitLedger {
    /// Ledger over `store` using the wall clock and [`RangeOrder::Legacy`].
    pub fn new(store: Arc<dyn VisitStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            range_order: RangeOrder::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_range_order(mut self, range_order: RangeOrder) -> Self {
        self.range_order = range_order;
        self
    }

    pub fn range_order(&self) -> RangeOrder {
        self.range_order
    }

    /// Empty the store. Called once at startup, never per request.
    pub async fn reset(&self) -> Result<()> {
        self.store.flush_all().await.map_err(|e| {
            metrics::store_error();
            LedgerError::storage(StoreOp::Flush, e)
        })?;
        tracing::info!("visit store flushed");
        Ok(())
    }

    /// Normalize `raw_links` and store them in the current bucket.
    ///
    /// All-or-nothing: one unrecognized link discards the batch. Returns the
    /// distinct domains that were stored.
    pub async fn ingest<S: AsRef<str>>(&self, raw_links: &[S]) -> Result<BTreeSet<String>> {
        let ts = self.clock.now_unix();
        if raw_links.is_empty() {
            return Err(LedgerError::MalformedInput);
        }

        let domains = match normalize_batch(raw_links) {
            Ok(domains) => domains,
            Err(bad) => {
                metrics::batch_rejected();
                tracing::info!(
                    submitted = raw_links.len(),
                    rejected = bad.len(),
                    "link batch rejected"
                );
                return Err(LedgerError::UnrecognizedLink(bad));
            }
        };

        self.record_at(ts, &domains).await?;
        Ok(domains)
    }

    async fn record_at(&self, ts: u64, domains: &BTreeSet<String>) -> Result<()> {
        if domains.is_empty() {
            return Err(LedgerError::MalformedInput);
        }
        let key = bucket_key(ts);
        if let Err(e) = self.store.add_members(&key, domains).await {
            metrics::store_error();
            tracing::warn!(bucket = %key, error = %e, "failed to store visited domains");
            return Err(LedgerError::storage(StoreOp::Save, e));
        }

        metrics::batch_stored(domains.len());
        tracing::info!(bucket = %key, domains = domains.len(), "visited domains stored");
        Ok(())
    }

    /// Union of the domains in every bucket selected by `(from, to)`.
    ///
    /// An empty result is a valid answer. Keys that are not decimal timestamps
    /// are skipped.
    pub async fn query(&self, from: u64, to: u64) -> Result<BTreeSet<String>> {
        let keys = self.store.keys().await.map_err(|e| self.read_failed(e))?;

        let mut domains = BTreeSet::new();
        let mut matched = 0usize;
        for key in keys {
            let Ok(ts) = key.parse::<u64>() else {
                tracing::warn!(%key, "skipping non-numeric bucket key");
                continue;
            };
            if !self.range_order.contains(from, to, ts) {
                continue;
            }
            matched += 1;
            let members = self
                .store
                .read_members(&key)
                .await
                .map_err(|e| self.read_failed(e))?;
            domains.extend(members);
        }

        metrics::query_served(matched);
        tracing::debug!(
            from,
            to,
            order = ?self.range_order,
            matched,
            domains = domains.len(),
            "range query"
        );
        Ok(domains)
    }

    /// Every numeric bucket with its member count, ordered by timestamp.
    pub async fn buckets(&self) -> Result<BTreeMap<u64, usize>> {
        let keys = self.store.keys().await.map_err(|e| self.read_failed(e))?;
        let mut out = BTreeMap::new();
        for key in keys {
            let Ok(ts) = key.parse::<u64>() else { continue };
            let members = self
                .store
                .read_members(&key)
                .await
                .map_err(|e| self.read_failed(e))?;
            out.insert(ts, members.len());
        }
        Ok(out)
    }

    fn read_failed(&self, e: crate::store::StoreError) -> LedgerError {
        metrics::store_error();
        tracing::warn!(error = %e, "failed to read visit store");
        LedgerError::storage(StoreOp::Read, e)
    }
}

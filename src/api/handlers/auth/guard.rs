//! Per-client failed-login counters and the backoff derived from them.
//!
//! Counters live in the document store as auxiliary records and are only
//! touched through [`DocumentStore::update_aux`], so concurrent failures from
//! one client all count. Expiry is soft: a record older than [`FAIL_TTL_MS`]
//! is treated as absent and deleted the next time it is read; nothing sweeps
//! them in the background.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::store::{DocumentStore, StoreError};

/// Auxiliary record key prefix, followed by the client identifier.
pub const LOGIN_FAIL_KEY_PREFIX: &str = "login_fail:";

pub const FAIL_TTL_MS: i64 = 10 * 60 * 1000;

const PENALTY_BASE_MS: u64 = 700;
const PENALTY_STEP_MS: u64 = 700;
const PENALTY_MAX_MS: u64 = 8000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginFail {
    pub fails: u32,
    /// Unix milliseconds of the latest failure.
    pub last: i64,
}

impl LoginFail {
    #[must_use]
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.last) > FAIL_TTL_MS
    }
}

/// Delay applied before a login attempt after `fails` recent failures.
#[must_use]
pub fn penalty(fails: u32) -> Duration {
    if fails == 0 {
        return Duration::ZERO;
    }
    let ms = PENALTY_STEP_MS
        .saturating_mul(u64::from(fails))
        .saturating_add(PENALTY_BASE_MS)
        .min(PENALTY_MAX_MS);
    Duration::from_millis(ms)
}

#[derive(Clone, Debug)]
pub struct LoginGuard {
    store: DocumentStore,
}

impl LoginGuard {
    #[must_use]
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    /// # Errors
    /// Returns an error if the store cannot be reached.
    pub async fn penalty_for(&self, id: &str) -> Result<Duration, StoreError> {
        self.penalty_for_at(id, now_ms()).await
    }

    /// # Errors
    /// Returns an error if the store cannot be reached.
    pub async fn penalty_for_at(&self, id: &str, now_ms: i64) -> Result<Duration, StoreError> {
        let stored = self
            .store
            .update_aux(&key(id), move |value| {
                value.filter(|value| live_record(Some(value), now_ms).is_some())
            })
            .await?;
        let fails = live_record(stored.as_ref(), now_ms).map_or(0, |record| record.fails);
        Ok(penalty(fails))
    }

    /// Count one more failure for `id`; returns the new count.
    ///
    /// # Errors
    /// Returns an error if the store cannot be reached.
    pub async fn record_failure(&self, id: &str) -> Result<u32, StoreError> {
        self.record_failure_at(id, now_ms()).await
    }

    /// # Errors
    /// Returns an error if the store cannot be reached.
    #[instrument(skip(self))]
    pub async fn record_failure_at(&self, id: &str, now_ms: i64) -> Result<u32, StoreError> {
        let stored = self
            .store
            .update_aux(&key(id), move |value| {
                let fails = live_record(value.as_ref(), now_ms)
                    .map_or(0, |record| record.fails)
                    .saturating_add(1);
                serde_json::to_value(LoginFail { fails, last: now_ms }).ok()
            })
            .await?;
        let fails = live_record(stored.as_ref(), now_ms).map_or(0, |record| record.fails);
        debug!(fails, "login failure recorded");
        Ok(fails)
    }

    /// Forget every failure for `id`.
    ///
    /// # Errors
    /// Returns an error if the store cannot be reached.
    pub async fn clear(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete_aux(&key(id)).await
    }
}

/// The record in `value` if it decodes and has not expired.
fn live_record(value: Option<&Value>, now_ms: i64) -> Option<LoginFail> {
    let record = LoginFail::deserialize(value?).ok()?;
    (!record.is_expired(now_ms)).then_some(record)
}

fn key(id: &str) -> String {
    format!("{LOGIN_FAIL_KEY_PREFIX}{id}")
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

//! Survival-streak ingestion.
//!
//! The one multi-step piece of state maintenance in the service: track each
//! device's personal-best streak and keep the denormalized over-threshold set
//! consistent with it. The three store writes are individually atomic but not
//! atomic as a group; the membership fix-up always recomputes from the
//! post-update best, so a racing request leaves at worst a stale entry that
//! the next call corrects.

use serde::{Deserialize, Serialize};

use crate::{
    database::{DEVICES_SET, OVER_THRESHOLD_SET, STREAK_COUNT, STREAK_TOTAL, Store, best_key},
    error::AppError,
};

/// Best streaks strictly above this land in `survival:over10`.
pub const OVER_THRESHOLD: i64 = 10;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub device_id: String,
    pub streak: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAck {
    pub device_id: String,
    pub streak: i64,
    pub updated: bool,
}

fn validate(report: &RunReport) -> Result<(), AppError> {
    if report.device_id.is_empty() {
        return Err(AppError::Validation("deviceId is required".to_string()));
    }
    if report.streak < 0 {
        return Err(AppError::Validation(
            "streak must be non-negative".to_string(),
        ));
    }
    Ok(())
}

/// Ingest one finished run. Validation happens before any write; after that,
/// a store failure aborts the request and already-committed writes stay.
pub async fn ingest_run(store: &dyn Store, report: RunReport) -> Result<RunAck, AppError> {
    validate(&report)?;

    let RunReport { device_id, streak } = report;

    store.set_add(DEVICES_SET, &device_id).await?;

    let prior = store.get_int(&best_key(&device_id)).await?.unwrap_or(0);
    let updated = streak > prior;
    if updated {
        store.set_int(&best_key(&device_id), streak).await?;
    }

    // Membership follows the authoritative best, not this run's value, so the
    // set self-corrects even on runs that set no record.
    let best = if updated { streak } else { prior };
    if best > OVER_THRESHOLD {
        store.set_add(OVER_THRESHOLD_SET, &device_id).await?;
    } else {
        store.set_remove(OVER_THRESHOLD_SET, &device_id).await?;
    }

    store.incr_by(STREAK_TOTAL, streak).await?;
    store.incr_by(STREAK_COUNT, 1).await?;

    Ok(RunAck {
        device_id,
        streak,
        updated,
    })
}

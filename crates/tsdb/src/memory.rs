//! In-memory implementation of [`TimeSeriesStore`].
//!
//! Backs engine tests and store-less development runs. Deletion semantics
//! mirror the Influx predicates exactly: by run id or by serial, across both
//! benchmark measurements, leaving everything else untouched.

use std::sync::Mutex;

use async_trait::async_trait;

use drivewatch_core::bench::{CurvePoint, ProfileResult};
use drivewatch_core::smart::SmartReading;
use drivewatch_core::types::DbId;

use crate::{DriveTags, RunTags, TimeSeriesStore, TsdbError};

/// A stored curve point with its identifying tags.
#[derive(Debug, Clone)]
pub struct StoredCurvePoint {
    pub serial: String,
    pub run_id: DbId,
    pub point: CurvePoint,
}

/// A stored profile result with its identifying tags.
#[derive(Debug, Clone)]
pub struct StoredProfileResult {
    pub serial: String,
    pub run_id: DbId,
    pub result: ProfileResult,
}

/// A stored SMART reading with its serial tag.
#[derive(Debug, Clone)]
pub struct StoredSmartReading {
    pub serial: String,
    pub reading: SmartReading,
}

#[derive(Default)]
struct Inner {
    curve: Vec<StoredCurvePoint>,
    profiles: Vec<StoredProfileResult>,
    smart: Vec<StoredSmartReading>,
}

/// Process-local time-series store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn curve_points_for_run(&self, run_id: DbId) -> Vec<CurvePoint> {
        self.inner
            .lock()
            .expect("memory store poisoned")
            .curve
            .iter()
            .filter(|p| p.run_id == run_id)
            .map(|p| p.point)
            .collect()
    }

    pub fn profile_results_for_run(&self, run_id: DbId) -> Vec<ProfileResult> {
        self.inner
            .lock()
            .expect("memory store poisoned")
            .profiles
            .iter()
            .filter(|p| p.run_id == run_id)
            .map(|p| p.result.clone())
            .collect()
    }

    pub fn smart_reading_count(&self, serial: &str) -> usize {
        self.inner
            .lock()
            .expect("memory store poisoned")
            .smart
            .iter()
            .filter(|r| r.serial == serial)
            .count()
    }
}

#[async_trait]
impl TimeSeriesStore for MemoryStore {
    async fn write_curve_points(
        &self,
        tags: RunTags<'_>,
        _start_ms: i64,
        points: &[CurvePoint],
    ) -> Result<(), TsdbError> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner.curve.extend(points.iter().map(|&point| StoredCurvePoint {
            serial: tags.serial.to_string(),
            run_id: tags.run_id,
            point,
        }));
        Ok(())
    }

    async fn write_profile_results(
        &self,
        tags: RunTags<'_>,
        _start_ms: i64,
        results: &[ProfileResult],
    ) -> Result<(), TsdbError> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner
            .profiles
            .extend(results.iter().map(|result| StoredProfileResult {
                serial: tags.serial.to_string(),
                run_id: tags.run_id,
                result: result.clone(),
            }));
        Ok(())
    }

    async fn write_smart_reading(
        &self,
        tags: DriveTags<'_>,
        reading: &SmartReading,
    ) -> Result<(), TsdbError> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner.smart.push(StoredSmartReading {
            serial: tags.serial.to_string(),
            reading: reading.clone(),
        });
        Ok(())
    }

    async fn delete_run_data(&self, run_id: DbId) -> Result<(), TsdbError> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner.curve.retain(|p| p.run_id != run_id);
        inner.profiles.retain(|p| p.run_id != run_id);
        Ok(())
    }

    async fn delete_drive_data(&self, serial: &str) -> Result<(), TsdbError> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner.curve.retain(|p| p.serial != serial);
        inner.profiles.retain(|p| p.serial != serial);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

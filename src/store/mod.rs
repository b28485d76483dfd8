//! Named experiment records
//!
//! A record holds the experiment's configuration and the last report computed
//! for it. The engine never touches the store; the service reads a record's
//! config, runs the engine, and writes the report back.

pub mod clock;

use crate::model::{AnalysisReport, PlanRequest, TestConfig};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clock::Clock;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("Experiment '{0}' not found")]
    NotFound(String),

    #[error("Experiment store unavailable: {0}")]
    Unavailable(String),

    #[error("Experiment '{0}' was reconfigured while it was being analyzed")]
    Conflict(String),
}

/// Configuration saved with a named experiment
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct ExperimentConfig {
    #[serde(default)]
    pub test_config: TestConfig,

    /// Expected baseline rate used for planning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_rate: Option<f64>,

    /// Expected variant rate used for planning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_rate: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_per_day: Option<i64>,

    /// Column mapping applied to uploaded tables
    pub variant_column_index: usize,
    pub outcome_column_index: usize,
}

impl ExperimentConfig {
    /// Planning request, when the expected rates and traffic are all set
    pub fn plan_request(&self) -> Option<PlanRequest> {
        Some(PlanRequest {
            control_rate: self.control_rate?,
            variant_rate: self.variant_rate?,
            traffic_per_day: self.traffic_per_day?,
            alpha: self.test_config.alpha,
            power: self.test_config.power,
            tail_type: self.test_config.tail_type,
        })
    }
}

/// A named experiment with its last computed results
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct ExperimentRecord {
    #[schemars(with = "String")]
    pub id: Uuid,

    pub name: String,
    pub config: ExperimentConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_report: Option<AnalysisReport>,

    #[schemars(with = "String")]
    pub created_at: DateTime<Utc>,

    #[schemars(with = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Persistence for named experiments
#[async_trait]
pub trait ExperimentStore: Send + Sync {
    /// Create a record, or replace the config of an existing one
    ///
    /// Replacing keeps the id and creation time and clears the cached report,
    /// which no longer matches the config.
    async fn put(&self, name: &str, config: ExperimentConfig)
        -> Result<ExperimentRecord, StoreError>;

    async fn get(&self, name: &str) -> Result<ExperimentRecord, StoreError>;

    /// Cache a freshly computed report on an existing record
    ///
    /// `analyzed` is the config the report was computed under. The write is
    /// rejected with `Conflict` when the record has since been given another.
    async fn record_report(
        &self,
        name: &str,
        analyzed: &ExperimentConfig,
        report: AnalysisReport,
    ) -> Result<ExperimentRecord, StoreError>;
}

/// Process-local store; records are lost on restart
///
/// The lock is held only for lookup/insert.
pub struct InMemoryExperimentStore {
    records: Mutex<HashMap<String, ExperimentRecord>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryExperimentStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, ExperimentRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))
    }
}

#[async_trait]
impl ExperimentStore for InMemoryExperimentStore {
    async fn put(
        &self,
        name: &str,
        config: ExperimentConfig,
    ) -> Result<ExperimentRecord, StoreError> {
        let now = self.clock.now();
        let mut records = self.lock()?;

        let record = match records.get(name) {
            Some(existing) => ExperimentRecord {
                config,
                last_report: None,
                updated_at: now,
                ..existing.clone()
            },
            None => {
                let record = ExperimentRecord {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    config,
                    last_report: None,
                    created_at: now,
                    updated_at: now,
                };
                info!(experiment = %name, id = %record.id, "Created experiment");
                record
            }
        };

        records.insert(name.to_string(), record.clone());
        Ok(record)
    }

    async fn get(&self, name: &str) -> Result<ExperimentRecord, StoreError> {
        self.lock()?
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn record_report(
        &self,
        name: &str,
        analyzed: &ExperimentConfig,
        report: AnalysisReport,
    ) -> Result<ExperimentRecord, StoreError> {
        let now = self.clock.now();
        let mut records = self.lock()?;

        let record = records
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        if record.config != *analyzed {
            warn!(experiment = %name, "Dropping report computed under a replaced config");
            return Err(StoreError::Conflict(name.to_string()));
        }
        record.last_report = Some(report);
        record.updated_at = now;

        debug!(experiment = %name, "Cached analysis report");
        Ok(record.clone())
    }
}

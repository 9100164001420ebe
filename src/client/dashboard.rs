//! The current dataset snapshot, as the dashboard sees it.
//!
//! One owner refreshes the snapshot; readers hold an `Arc` to whatever
//! snapshot was current when they looked. Selecting or uploading a CSV
//! replaces the snapshot, which drops its cached charts with it. If the
//! reload after a select or upload fails, the snapshot is cleared rather
//! than left describing the dataset the service no longer serves.

use crate::analysis::{ChartSet, DatasetSnapshot};
use crate::client::{ClientError, MlClient};
use crate::config::ChartsConfig;
use crate::models::{CsvSelection, CsvUpload, DatasetRecord};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Decode a JSON dataset file (an array of records).
pub fn read_dataset_file(path: &Path) -> Result<Vec<DatasetRecord>, ClientError> {
    let content = std::fs::read(path).map_err(|e| ClientError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let context = format!("reading {}", path.display());
    serde_json::from_slice(&content).map_err(|e| ClientError::decode(&context, &e))
}

pub struct Dashboard {
    ml: MlClient,
    params: ChartsConfig,
    snapshot: Option<Arc<DatasetSnapshot>>,
}

impl Dashboard {
    pub fn new(ml: MlClient, params: ChartsConfig) -> Self {
        Self {
            ml,
            params,
            snapshot: None,
        }
    }

    pub fn ml(&self) -> &MlClient {
        &self.ml
    }

    /// The current snapshot, if one was loaded.
    pub fn snapshot(&self) -> Option<Arc<DatasetSnapshot>> {
        self.snapshot.clone()
    }

    /// Replace the snapshot with `records` from `source`.
    pub fn replace(
        &mut self,
        source: impl Into<String>,
        records: Vec<DatasetRecord>,
    ) -> Arc<DatasetSnapshot> {
        let snapshot = Arc::new(DatasetSnapshot::new(source, records, self.params.clone()));
        info!(
            "Dataset snapshot from {} with {} records",
            snapshot.source(),
            snapshot.len()
        );
        self.snapshot = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// Load the service's current dataset, overwriting the snapshot.
    pub async fn refresh(&mut self) -> Result<Arc<DatasetSnapshot>, ClientError> {
        let records = self.ml.general_data().await?;
        let source = self.ml.base_url().to_string();
        Ok(self.replace(source, records))
    }

    /// Load a dataset from a JSON file instead of the service.
    pub fn load_file(&mut self, path: &Path) -> Result<Arc<DatasetSnapshot>, ClientError> {
        let records = read_dataset_file(path)?;
        Ok(self.replace(path.display().to_string(), records))
    }

    /// Select a stored CSV on the service, then reload the dataset.
    pub async fn select_csv(
        &mut self,
        name: &str,
        retrain: bool,
    ) -> Result<CsvSelection, ClientError> {
        let selection = self.ml.select_csv(name, retrain).await?;
        self.reload_after_change(&selection.selected).await?;
        Ok(selection)
    }

    /// Upload a CSV to the service, then reload the dataset.
    pub async fn upload_csv(
        &mut self,
        path: &Path,
        retrain: bool,
    ) -> Result<CsvUpload, ClientError> {
        let upload = self.ml.upload_csv(path, retrain).await?;
        self.reload_after_change(&upload.saved).await?;
        Ok(upload)
    }

    /// Reload after the service switched to `dataset`; on failure the old
    /// snapshot is stale, so it is dropped.
    async fn reload_after_change(&mut self, dataset: &str) -> Result<(), ClientError> {
        if let Err(e) = self.refresh().await {
            warn!(
                "Service switched to {} but the reload failed; clearing the snapshot",
                dataset
            );
            self.snapshot = None;
            return Err(e);
        }
        Ok(())
    }

    /// The current snapshot, loading it from the service if none is held.
    pub async fn current(&mut self) -> Result<Arc<DatasetSnapshot>, ClientError> {
        match self.snapshot() {
            Some(snapshot) => Ok(snapshot),
            None => self.refresh().await,
        }
    }

    /// Charts of the current snapshot, without touching the network.
    pub fn cached_charts(&self) -> Option<ChartSet> {
        self.snapshot.as_ref().map(|s| s.charts().clone())
    }
}

//! Analyzer boundaries. A failing analyzer degrades to an empty result and
//! is recorded; the run carries on with the remaining analyzers.

use std::panic::{self, AssertUnwindSafe};

use campaign_core::{CampaignError, CampaignResult};
use campaign_ingest::NormalizedDataset;
use serde::Serialize;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    pub stage: String,
    pub message: String,
}

/// Collects failures across the stages of one run.
#[derive(Debug, Default)]
pub struct Stages {
    failures: Vec<StageFailure>,
}

impl Stages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one analyzer. Errors and panics are both contained here.
    pub fn run<T, F>(&mut self, stage: &str, f: F) -> T
    where
        T: Default,
        F: FnOnce() -> CampaignResult<T>,
    {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(value)) => {
                debug!(stage, "stage complete");
                value
            }
            Ok(Err(e)) => {
                warn!(stage, error = %e, "stage failed, continuing with empty result");
                self.record(stage, e.to_string());
                T::default()
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(stage, error = %message, "stage panicked, continuing with empty result");
                self.record(stage, message);
                T::default()
            }
        }
    }

    /// Like [`Stages::run`] for analyzers that cannot fail on their own.
    pub fn infallible<T, F>(&mut self, stage: &str, f: F) -> T
    where
        T: Default,
        F: FnOnce() -> T,
    {
        self.run(stage, || Ok(f()))
    }

    fn record(&mut self, stage: &str, message: String) {
        metrics::counter!("pipeline.stage_failures", "stage" => stage.to_string()).increment(1);
        self.failures.push(StageFailure {
            stage: stage.to_string(),
            message,
        });
    }

    pub fn failures(&self) -> &[StageFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<StageFailure> {
        self.failures
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "analyzer panicked".to_string()
    }
}

/// A dataset with no usable rows cannot be analyzed.
pub(crate) fn require_records(dataset: &NormalizedDataset) -> CampaignResult<()> {
    if dataset.records.is_empty() {
        return Err(CampaignError::EmptyDataset(format!(
            "no {:?} rows left after normalization",
            dataset.kind
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_passes_value_through() {
        let mut stages = Stages::new();
        let v: Vec<u32> = stages.run("ok", || Ok(vec![1, 2]));
        assert_eq!(v, vec![1, 2]);
        assert!(stages.failures().is_empty());
    }

    #[test]
    fn test_error_degrades_to_default() {
        let mut stages = Stages::new();
        let v: Vec<u32> = stages.run("market_insights", || {
            Err(CampaignError::analyzer("market_insights", "bad pattern"))
        });
        assert!(v.is_empty());
        assert_eq!(stages.failures().len(), 1);
        assert_eq!(stages.failures()[0].stage, "market_insights");
        assert!(stages.failures()[0].message.contains("bad pattern"));
    }

    #[test]
    fn test_panic_is_contained() {
        let mut stages = Stages::new();
        let v: Option<u8> = stages.infallible("boom", || panic!("index out of range"));
        assert!(v.is_none());
        assert_eq!(stages.failures()[0].message, "index out of range");
        let next: u8 = stages.infallible("after", || 7);
        assert_eq!(next, 7);
        assert_eq!(stages.into_failures().len(), 1);
    }
}

//! Analysis runner
//!
//! Each analysis request runs the full pipeline on its own tokio task:
//! collect a data bundle, score it, then generate the briefing. Progress
//! and the outcome are written to the injected [`TaskStore`]; concurrent
//! tasks share nothing else.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use strait_core::IndicatorCalculator;
use strait_report::{find_model, ReportGenerator};
use strait_sources::{SourceCollector, SourceError};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{new_task_id, AnalysisResult, TaskId, TaskRecord, TaskStatus, TaskStore};

/// Progress once the task has started
pub const PROGRESS_STARTED: u8 = 10;
/// Progress once the bundle is collected
pub const PROGRESS_COLLECTED: u8 = 40;
/// Progress once indicators are calculated
pub const PROGRESS_SCORED: u8 = 70;
/// Progress of a finished task
pub const PROGRESS_DONE: u8 = 100;

/// Runner errors
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Unknown analysis model: {0}")]
    UnknownModel(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Collection failed: {0}")]
    Collection(#[from] SourceError),
}

/// Starts analysis tasks and tracks them in a task store
#[derive(Clone)]
pub struct AnalysisRunner {
    collector: Arc<dyn SourceCollector>,
    generator: Arc<ReportGenerator>,
    store: Arc<dyn TaskStore>,
    calculator: Arc<IndicatorCalculator>,
}

impl AnalysisRunner {
    pub fn new(
        collector: Arc<dyn SourceCollector>,
        generator: Arc<ReportGenerator>,
        store: Arc<dyn TaskStore>,
    ) -> Self {
        Self {
            collector,
            generator,
            store,
            calculator: Arc::new(IndicatorCalculator::new()),
        }
    }

    /// Replace the default indicator calculator
    pub fn with_calculator(mut self, calculator: IndicatorCalculator) -> Self {
        self.calculator = Arc::new(calculator);
        self
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Register a task for `model` and run it in the background
    pub fn start(&self, model: &str) -> Result<TaskId, RuntimeError> {
        if find_model(model).is_none() {
            return Err(RuntimeError::UnknownModel(model.to_string()));
        }

        let id = new_task_id();
        self.store.insert(TaskRecord::new(id.clone(), model));
        info!("Task {} started with model {} ({} collector)", id, model, self.collector.name());

        let runner = self.clone();
        let task_id = id.clone();
        let model = model.to_string();
        let pipeline = tokio::spawn(async move {
            runner.run_pipeline(&task_id, &model).await;
        });

        // A pipeline that dies without recording an outcome would stay running
        let store = self.store.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            if let Err(e) = pipeline.await {
                mark_failed(store.as_ref(), &task_id, &format!("analysis task aborted: {}", e));
            }
        });

        Ok(id)
    }

    fn set_progress(&self, id: &str, progress: u8) {
        self.store.update(id, &|record: &mut TaskRecord| record.progress = progress);
        debug!("Task {} progress {}%", id, progress);
    }

    /// Run one task to completion, recording the outcome
    pub async fn run_pipeline(&self, id: &str, model: &str) {
        match self.execute(id, model).await {
            Ok(result) => {
                self.store.update(id, &|record: &mut TaskRecord| {
                    record.status = TaskStatus::Completed;
                    record.progress = PROGRESS_DONE;
                    record.result = Some(result.clone());
                });
                info!("Task {} completed", id);
            }
            Err(e) => mark_failed(self.store.as_ref(), id, &e.to_string()),
        }
    }

    async fn execute(&self, id: &str, model: &str) -> Result<AnalysisResult, RuntimeError> {
        self.set_progress(id, PROGRESS_STARTED);

        let bundle = self.collector.collect().await?;
        self.set_progress(id, PROGRESS_COLLECTED);

        let indicators = self.calculator.calculate(&bundle);
        self.set_progress(id, PROGRESS_SCORED);

        let report = self.generator.generate(&indicators, model).await;

        Ok(AnalysisResult {
            indicators,
            report,
            timestamp: Utc::now(),
        })
    }

    pub fn get(&self, id: &str) -> Result<TaskRecord, RuntimeError> {
        self.store
            .get(id)
            .ok_or_else(|| RuntimeError::TaskNotFound(id.to_string()))
    }

    /// Poll until the task leaves `running`
    pub async fn wait(&self, id: &str, poll: Duration) -> Result<TaskRecord, RuntimeError> {
        loop {
            let record = self.get(id)?;
            if record.status.is_finished() {
                return Ok(record);
            }
            tokio::time::sleep(poll).await;
        }
    }
}

fn mark_failed(store: &dyn TaskStore, id: &str, message: &str) {
    store.update(id, &|record: &mut TaskRecord| {
        record.status = TaskStatus::Failed;
        record.error = Some(message.to_string());
    });
    error!("Task {} failed: {}", id, message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryTaskStore;
    use async_trait::async_trait;
    use serde_json::json;
    use strait_core::{DataBundle, TaggedResult};
    use strait_report::{ReportSource, DEFAULT_ANALYSIS_MODEL};

    struct StaticCollector;

    #[async_trait]
    impl SourceCollector for StaticCollector {
        fn name(&self) -> &str {
            "static"
        }

        async fn collect(&self) -> Result<DataBundle, SourceError> {
            Ok(DataBundle {
                military: TaggedResult::success(json!(["中國軍艦在台海巡航警戒"])),
                economic: TaggedResult::success(json!({"gold": true, "ZS=F": true})),
                news: TaggedResult::failure(),
                stock: TaggedResult::failure(),
            })
        }
    }

    struct BrokenCollector;

    #[async_trait]
    impl SourceCollector for BrokenCollector {
        fn name(&self) -> &str {
            "broken"
        }

        async fn collect(&self) -> Result<DataBundle, SourceError> {
            Err(SourceError::Fixture("bundle unreadable".to_string()))
        }
    }

    struct PanickingCollector;

    #[async_trait]
    impl SourceCollector for PanickingCollector {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn collect(&self) -> Result<DataBundle, SourceError> {
            panic!("collector crashed")
        }
    }

    fn runner(collector: Arc<dyn SourceCollector>) -> AnalysisRunner {
        let generator = ReportGenerator::template_only();
        AnalysisRunner::new(collector, Arc::new(generator), Arc::new(MemoryTaskStore::new()))
    }

    #[tokio::test]
    async fn test_task_completes() {
        let runner = runner(Arc::new(StaticCollector));
        let id = runner.start(DEFAULT_ANALYSIS_MODEL).unwrap();

        let record = runner.wait(&id, Duration::from_millis(10)).await.unwrap();

        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.progress, PROGRESS_DONE);
        assert_eq!(record.model, DEFAULT_ANALYSIS_MODEL);

        let result = record.result.unwrap();
        assert_eq!(result.indicators.military_threat, 25.0);
        assert_eq!(result.indicators.economic_pressure, 43.0);
        assert_eq!(result.report.source, ReportSource::TemplateGenerated);
    }

    #[tokio::test]
    async fn test_task_fails_on_collection_error() {
        let runner = runner(Arc::new(BrokenCollector));
        let id = runner.start(DEFAULT_ANALYSIS_MODEL).unwrap();

        let record = runner.wait(&id, Duration::from_millis(10)).await.unwrap();

        assert_eq!(record.status, TaskStatus::Failed);
        assert!(record.result.is_none());
        assert!(record.error.unwrap().contains("bundle unreadable"));
    }

    #[tokio::test]
    async fn test_task_fails_when_pipeline_panics() {
        let runner = runner(Arc::new(PanickingCollector));
        let id = runner.start(DEFAULT_ANALYSIS_MODEL).unwrap();

        let record = tokio::time::timeout(
            Duration::from_secs(5),
            runner.wait(&id, Duration::from_millis(10)),
        )
        .await
        .expect("task left running after its pipeline panicked")
        .unwrap();

        assert_eq!(record.status, TaskStatus::Failed);
        assert!(record.error.unwrap().contains("analysis task aborted"));
    }

    #[tokio::test]
    async fn test_unknown_model_rejected() {
        let runner = runner(Arc::new(StaticCollector));
        let err = runner.start("gpt-2").unwrap_err();

        assert!(matches!(err, RuntimeError::UnknownModel(m) if m == "gpt-2"));
        assert!(runner.store().list().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let runner = runner(Arc::new(StaticCollector));
        assert!(matches!(
            runner.get("missing"),
            Err(RuntimeError::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_tasks_are_independent() {
        let runner = runner(Arc::new(StaticCollector));
        let first = runner.start(DEFAULT_ANALYSIS_MODEL).unwrap();
        let second = runner.start("o3-2025-04-16").unwrap();
        assert_ne!(first, second);

        let a = runner.wait(&first, Duration::from_millis(10)).await.unwrap();
        let b = runner.wait(&second, Duration::from_millis(10)).await.unwrap();

        assert_eq!(a.status, TaskStatus::Completed);
        assert_eq!(b.model, "o3-2025-04-16");
        assert_eq!(runner.store().list().len(), 2);
    }
}

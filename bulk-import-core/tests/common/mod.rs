#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bulk_import::database::entities::{
    bulk_import_entities, bulk_imports, import_failures, pipeline_batches, pipeline_trackers,
};
use bulk_import::database::migrations::Migrator;
use bulk_import::export_status::{ExportStatusClient, RemoteExportPayload};
use bulk_import::health::{HealthOracle, StaticSchemaResolver};
use bulk_import::lease::{InMemoryLeaseStore, LeaseStore};
use bulk_import::logging::LogAttributes;
use bulk_import::pipeline::{Pipeline, PipelineContext, PipelineOutcome, PipelineRegistry};
use bulk_import::scheduler::{BatchHandler, PipelineJob, Scheduler};
use bulk_import::services::{ErrorTracker, FailureReport};
use bulk_import::{Collaborators, CoordinatorConfig, PipelineWorker};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use sea_orm_migration::MigratorTrait;

/// Create an in-memory SQLite database for testing
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    Ok(db)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("bulk_import=debug"))
        .with_test_writer()
        .try_init();
}

pub async fn create_entity(
    db: &DatabaseConnection,
    source_type: &str,
    status: &str,
) -> Result<bulk_import_entities::Model, DbErr> {
    let now = Utc::now();
    let bulk_import = bulk_imports::ActiveModel {
        source_url: Set("https://source.example.com".to_string()),
        source_version: Set(Some("17.2.0".to_string())),
        status: Set("started".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    bulk_import_entities::ActiveModel {
        bulk_import_id: Set(bulk_import.id),
        source_type: Set(source_type.to_string()),
        source_full_path: Set("acme/widgets".to_string()),
        status: Set(status.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_tracker(
    db: &DatabaseConnection,
    entity_id: i32,
    pipeline_name: &str,
    status: &str,
    created_at: Option<DateTime<Utc>>,
) -> Result<pipeline_trackers::Model, DbErr> {
    pipeline_trackers::ActiveModel {
        entity_id: Set(entity_id),
        pipeline_name: Set(pipeline_name.to_string()),
        stage: Set(0),
        status: Set(status.to_string()),
        batched: Set(false),
        jid: Set(None),
        created_at: Set(created_at),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn reload_tracker(db: &DatabaseConnection, id: i32) -> pipeline_trackers::Model {
    pipeline_trackers::Entity::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .expect("tracker exists")
}

pub async fn failures_for(db: &DatabaseConnection, entity_id: i32) -> Vec<import_failures::Model> {
    import_failures::Entity::find()
        .filter(import_failures::Column::EntityId.eq(entity_id))
        .all(db)
        .await
        .unwrap()
}

pub async fn batches_for(db: &DatabaseConnection, tracker_id: i32) -> Vec<pipeline_batches::Model> {
    pipeline_batches::Entity::find()
        .filter(pipeline_batches::Column::TrackerId.eq(tracker_id))
        .order_by_asc(pipeline_batches::Column::BatchNumber)
        .all(db)
        .await
        .unwrap()
}

/// Export client returning whatever payload the test set last
#[derive(Default)]
pub struct ScriptedExportClient {
    payload: Mutex<Option<Result<serde_json::Value, String>>>,
    pub calls: AtomicUsize,
}

impl ScriptedExportClient {
    pub fn respond(&self, body: serde_json::Value) {
        *self.payload.lock().unwrap() = Some(Ok(body));
    }

    pub fn fail_with(&self, message: &str) {
        *self.payload.lock().unwrap() = Some(Err(message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExportStatusClient for ScriptedExportClient {
    async fn fetch_status(
        &self,
        _tracker: &pipeline_trackers::Model,
        _entity: &bulk_import_entities::Model,
        _relation: &str,
    ) -> anyhow::Result<RemoteExportPayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let payload = self.payload.lock().unwrap().clone();
        match payload {
            Some(Ok(body)) => RemoteExportPayload::from_json(body),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(RemoteExportPayload::Empty),
        }
    }
}

/// One scripted result of `Pipeline::run`
#[derive(Debug, Clone)]
pub enum Step {
    Ok,
    Retry(Duration),
    Fatal(&'static str, &'static str),
    Error(&'static str),
}

/// Pipeline replaying a script; runs `Ok` once the script is used up
pub struct ScriptedPipeline {
    name: &'static str,
    file_extraction: bool,
    hold: Duration,
    script: Mutex<VecDeque<Step>>,
    runs: AtomicUsize,
}

impl ScriptedPipeline {
    pub fn new(name: &'static str, file_extraction: bool) -> Self {
        Self {
            name,
            file_extraction,
            hold: Duration::ZERO,
            script: Mutex::new(VecDeque::new()),
            runs: AtomicUsize::new(0),
        }
    }

    /// Keep each run busy for `hold`, to widen race windows
    pub fn holding(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    pub fn then(self, step: Step) -> Self {
        self.script.lock().unwrap().push_back(step);
        self
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Pipeline for ScriptedPipeline {
    fn name(&self) -> &str {
        self.name
    }

    fn relation(&self) -> &str {
        self.name
    }

    fn is_file_extraction(&self) -> bool {
        self.file_extraction
    }

    async fn run(&self, _context: &PipelineContext) -> anyhow::Result<PipelineOutcome> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if !self.hold.is_zero() {
            tokio::time::sleep(self.hold).await;
        }

        let step = self.script.lock().unwrap().pop_front().unwrap_or(Step::Ok);
        match step {
            Step::Ok => Ok(PipelineOutcome::Ok),
            Step::Retry(delay) => Ok(PipelineOutcome::retry(delay, "rate limited")),
            Step::Fatal(class, message) => Ok(PipelineOutcome::fatal(class, message)),
            Step::Error(message) => Err(anyhow::anyhow!(message)),
        }
    }
}

/// Scheduler that records instead of delivering
#[derive(Default)]
pub struct RecordingScheduler {
    pub pipelines: Mutex<Vec<(PipelineJob, Duration)>>,
    pub batches: Mutex<Vec<i32>>,
}

impl RecordingScheduler {
    pub fn pipelines(&self) -> Vec<(PipelineJob, Duration)> {
        self.pipelines.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<i32> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Scheduler for RecordingScheduler {
    async fn schedule_pipeline(&self, job: PipelineJob, delay: Duration) -> anyhow::Result<()> {
        self.pipelines.lock().unwrap().push((job, delay));
        Ok(())
    }

    async fn schedule_batch(&self, batch_id: i32) -> anyhow::Result<()> {
        self.batches.lock().unwrap().push(batch_id);
        Ok(())
    }
}

/// Health oracle with a fixed answer
#[derive(Default)]
pub struct StaticOracle {
    pub under_load: bool,
}

#[async_trait]
impl HealthOracle for StaticOracle {
    async fn is_under_load(&self, _schema: &str, _tables: &[String]) -> anyhow::Result<bool> {
        Ok(self.under_load)
    }
}

#[derive(Default)]
pub struct RecordingBatchHandler {
    pub batches: Mutex<Vec<i32>>,
}

#[async_trait]
impl BatchHandler for RecordingBatchHandler {
    async fn perform_batch(&self, batch_id: i32) -> anyhow::Result<()> {
        self.batches.lock().unwrap().push(batch_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct CollectingErrorTracker {
    pub reports: Mutex<Vec<FailureReport>>,
}

#[async_trait]
impl ErrorTracker for CollectingErrorTracker {
    async fn track(&self, report: &FailureReport, _attributes: &LogAttributes) {
        self.reports.lock().unwrap().push(report.clone());
    }
}

/// A worker wired to fakes, plus handles on every fake
pub struct Harness {
    pub db: DatabaseConnection,
    pub worker: Arc<PipelineWorker>,
    pub export: Arc<ScriptedExportClient>,
    pub scheduler: Arc<RecordingScheduler>,
    pub leases: Arc<InMemoryLeaseStore>,
    pub errors: Arc<CollectingErrorTracker>,
}

impl Harness {
    pub async fn new(pipelines: Vec<Arc<ScriptedPipeline>>) -> Self {
        Self::with_config(CoordinatorConfig::default(), pipelines, false).await
    }

    pub async fn with_config(
        config: CoordinatorConfig,
        pipelines: Vec<Arc<ScriptedPipeline>>,
        under_load: bool,
    ) -> Self {
        init_tracing();
        let db = setup_test_db().await.unwrap();
        let export = Arc::new(ScriptedExportClient::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let leases = Arc::new(InMemoryLeaseStore::new());
        let errors = Arc::new(CollectingErrorTracker::default());

        let mut registry = PipelineRegistry::new();
        for pipeline in pipelines {
            registry.register(pipeline);
        }

        let worker = PipelineWorker::new(
            db.clone(),
            config,
            registry,
            Collaborators {
                export_client: export.clone(),
                schema_resolver: Arc::new(StaticSchemaResolver::new()),
                health_oracle: Arc::new(StaticOracle { under_load }),
                lease_store: leases.clone() as Arc<dyn LeaseStore>,
                scheduler: scheduler.clone(),
                error_tracker: errors.clone(),
            },
        );

        Self {
            db,
            worker: Arc::new(worker),
            export,
            scheduler,
            leases,
            errors,
        }
    }
}

//! Admission control against an overloaded destination
//!
//! Before a tracker runs, the destination schema/table of its pipeline is checked
//! against an external health signal. When the resource is under load the whole
//! invocation is deferred by a long fixed delay.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::CoordinatorConfig;
use crate::database::entities::{bulk_import_entities, pipeline_trackers, PortableType};

/// Database location a pipeline writes into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaTable {
    pub schema: String,
    pub table: String,
}

impl SchemaTable {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

/// Resolves the destination of a pipeline for a portable type
pub trait SchemaResolver: Send + Sync {
    fn resolve(&self, pipeline_name: &str, portable: PortableType) -> Option<SchemaTable>;
}

/// External health signal for database resources
#[async_trait]
pub trait HealthOracle: Send + Sync {
    async fn is_under_load(&self, schema: &str, tables: &[String]) -> anyhow::Result<bool>;
}

/// Resolver backed by a fixed table of destinations
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaResolver {
    destinations: HashMap<(String, PortableType), SchemaTable>,
}

impl StaticSchemaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        pipeline_name: impl Into<String>,
        portable: PortableType,
        destination: SchemaTable,
    ) -> Self {
        self.destinations
            .insert((pipeline_name.into(), portable), destination);
        self
    }
}

impl SchemaResolver for StaticSchemaResolver {
    fn resolve(&self, pipeline_name: &str, portable: PortableType) -> Option<SchemaTable> {
        self.destinations
            .get(&(pipeline_name.to_string(), portable))
            .cloned()
    }
}

/// Outcome of the admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthDecision {
    Proceed,
    Defer {
        delay: Duration,
        schema: String,
        tables: Vec<String>,
    },
}

#[derive(Clone)]
pub struct HealthDeferralPolicy {
    resolver: Arc<dyn SchemaResolver>,
    oracle: Arc<dyn HealthOracle>,
    enabled: bool,
    delay: Duration,
    default_schema: String,
    default_tables: Vec<String>,
}

impl HealthDeferralPolicy {
    pub fn new(
        config: &CoordinatorConfig,
        resolver: Arc<dyn SchemaResolver>,
        oracle: Arc<dyn HealthOracle>,
    ) -> Self {
        Self {
            resolver,
            oracle,
            enabled: config.defer_on_health_enabled,
            delay: config.defer_on_health_delay,
            default_schema: config.default_health_schema.clone(),
            default_tables: config.default_health_tables.clone(),
        }
    }

    /// Schema and tables checked for this tracker, falling back to the defaults
    pub fn target(
        &self,
        tracker: &pipeline_trackers::Model,
        entity: &bulk_import_entities::Model,
    ) -> (String, Vec<String>) {
        match self
            .resolver
            .resolve(&tracker.pipeline_name, entity.portable_type())
        {
            Some(destination) => (destination.schema, vec![destination.table]),
            None => (self.default_schema.clone(), self.default_tables.clone()),
        }
    }

    pub async fn check(
        &self,
        tracker: &pipeline_trackers::Model,
        entity: &bulk_import_entities::Model,
    ) -> HealthDecision {
        if !self.enabled {
            return HealthDecision::Proceed;
        }

        let (schema, tables) = self.target(tracker, entity);

        match self.oracle.is_under_load(&schema, &tables).await {
            Ok(true) => HealthDecision::Defer {
                delay: self.delay,
                schema,
                tables,
            },
            Ok(false) => {
                debug!(tracker_id = tracker.id, %schema, "Destination healthy");
                HealthDecision::Proceed
            }
            Err(err) => {
                warn!(
                    tracker_id = tracker.id,
                    %schema,
                    error = %err,
                    "Health signal unavailable, not deferring"
                );
                HealthDecision::Proceed
            }
        }
    }
}

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use super::{LeaseStore, LeaseToken};
use crate::common::db_errors::is_unique_violation;
use crate::database::entities::pipeline_leases;

/// Lease store shared by every worker connected to the same database
#[derive(Clone)]
pub struct DatabaseLeaseStore {
    db: DatabaseConnection,
}

impl DatabaseLeaseStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Write a fresh lease row; losing the race on the unique key means held
    async fn write_lease(&self, key: &str, ttl: Duration) -> anyhow::Result<Option<LeaseToken>> {
        let now = Utc::now();
        let lease = LeaseToken::new(key);
        let ttl = chrono::Duration::from_std(ttl).context("Lease timeout out of range")?;
        let row = pipeline_leases::ActiveModel {
            lease_key: Set(key.to_string()),
            token: Set(lease.token.clone()),
            expires_at: Set(now + ttl),
            created_at: Set(now),
            ..Default::default()
        };

        match row.insert(&self.db).await {
            Ok(_) => Ok(Some(lease)),
            Err(err) if is_unique_violation(&err) => Ok(None),
            Err(err) => Err(err).with_context(|| format!("Failed to write lease {}", key)),
        }
    }
}

#[async_trait]
impl LeaseStore for DatabaseLeaseStore {
    async fn try_obtain(&self, key: &str, ttl: Duration) -> anyhow::Result<Option<LeaseToken>> {
        let now = Utc::now();

        let existing = pipeline_leases::Entity::find()
            .filter(pipeline_leases::Column::LeaseKey.eq(key))
            .one(&self.db)
            .await
            .with_context(|| format!("Failed to read lease {}", key))?;

        if let Some(existing) = existing {
            if existing.expires_at > now {
                return Ok(None);
            }

            // Only remove the exact expired row; a concurrent taker may have replaced it
            pipeline_leases::Entity::delete_many()
                .filter(pipeline_leases::Column::Id.eq(existing.id))
                .filter(pipeline_leases::Column::Token.eq(existing.token))
                .exec(&self.db)
                .await
                .with_context(|| format!("Failed to clear expired lease {}", key))?;
        }

        self.write_lease(key, ttl).await
    }

    async fn release(&self, lease: &LeaseToken) -> anyhow::Result<()> {
        pipeline_leases::Entity::delete_many()
            .filter(pipeline_leases::Column::LeaseKey.eq(lease.key.as_str()))
            .filter(pipeline_leases::Column::Token.eq(lease.token.as_str()))
            .exec(&self.db)
            .await
            .with_context(|| format!("Failed to release lease {}", lease.key))?;
        Ok(())
    }
}

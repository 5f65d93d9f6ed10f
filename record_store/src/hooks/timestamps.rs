//! Conventional `created_at` / `updated_at` maintenance

use super::{Hook, SharedHook};
use crate::record::Record;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgConnection;
use std::sync::Arc;

/// Before-hook stamping the current UTC time onto `updated_at`, and onto
/// `created_at` when `is_create` is set.
///
/// Records without those fields are left untouched.
#[derive(Debug, Clone, Copy)]
pub struct Timestamps {
    is_create: bool,
}

impl Timestamps {
    pub fn on_create() -> Self {
        Self { is_create: true }
    }

    pub fn on_update() -> Self {
        Self { is_create: false }
    }
}

pub fn timestamps<M: Record>(is_create: bool) -> SharedHook<M> {
    Arc::new(Timestamps { is_create })
}

#[async_trait]
impl<M: Record> Hook<M> for Timestamps {
    fn name(&self) -> &str {
        "timestamps"
    }

    async fn before(&self, _conn: &mut PgConnection, record: &mut M) -> anyhow::Result<()> {
        record.set_timestamps(Utc::now(), self.is_create);
        Ok(())
    }
}

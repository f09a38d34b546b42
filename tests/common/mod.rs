#![allow(dead_code)]

use futures::stream::BoxStream;
use futures::TryStreamExt;
use leadflow_core::db::Database;
use leadflow_core::errors::AppError;
use leadflow_core::models::NewLead;

/// Fresh, migrated in-memory database.
pub async fn setup() -> Database {
    Database::in_memory()
        .await
        .expect("in-memory database should open")
}

pub fn lead(id: &str, company: &str) -> NewLead {
    NewLead::new(company).with_id(id)
}

pub async fn collect<T>(stream: BoxStream<'_, Result<T, AppError>>) -> Vec<T> {
    stream
        .try_collect()
        .await
        .expect("stream should yield rows")
}

use async_trait::async_trait;
use castor_schema::DataType;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::any::Any;
use std::{str::FromStr, time::Duration};
use tracing::debug;

use super::{Connection, SyncOptions};
use crate::error::BoxError;
use crate::model::{ModelDefinition, ModelMap};

/// SQLite connection backed by a lazily-connected `sqlx` pool.
#[derive(Debug, Clone)]
pub struct SqliteConnection {
    pool: SqlitePool,
}

impl SqliteConnection {
    /// Parses `database_url` without touching the database; the first query connects.
    pub fn connect_lazy(database_url: &str) -> Result<Self, sqlx::Error> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new().connect_lazy_with(connect_opts);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    async fn authenticate(&self) -> Result<(), BoxError> {
        sqlx::query("SELECT 1 + 1 AS result")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn sync(&self, models: &ModelMap, options: SyncOptions) -> Result<(), BoxError> {
        for model in models.values() {
            if options.force {
                let drop_sql = format!("DROP TABLE IF EXISTS {}", quote(model.table()));
                sqlx::query(&drop_sql).execute(&self.pool).await?;
            }
            let create = create_table_sql(model, models);
            debug!(model = model.name(), sql = %create, "syncing table");
            sqlx::query(&create).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), BoxError> {
        self.pool.close().await;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn create_table_sql(model: &ModelDefinition, models: &ModelMap) -> String {
    let mut columns = vec![format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote("id"))];

    for (name, data_type) in model.attributes() {
        columns.push(format!("{} {}", quote(name), column_type(*data_type)));
    }
    columns.push(format!("{} DATETIME NOT NULL", quote("createdAt")));
    columns.push(format!("{} DATETIME NOT NULL", quote("updatedAt")));

    for (column, table) in model.foreign_keys(models) {
        if model.attributes().contains_key(&column) {
            continue;
        }
        columns.push(format!(
            "{} INTEGER REFERENCES {} ({}) ON DELETE SET NULL ON UPDATE CASCADE",
            quote(&column),
            quote(&table),
            quote("id")
        ));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote(model.table()),
        columns.join(", ")
    )
}

fn column_type(data_type: DataType) -> &'static str {
    match data_type {
        DataType::String => "VARCHAR(255)",
        DataType::Text => "TEXT",
        DataType::Integer => "INTEGER",
        DataType::BigInt => "BIGINT",
        DataType::Float => "FLOAT",
        DataType::Double => "DOUBLE PRECISION",
        DataType::Boolean => "TINYINT(1)",
        DataType::Date => "DATETIME",
        DataType::DateOnly => "DATE",
        DataType::Uuid => "UUID",
        DataType::Json => "JSON",
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

use crate::catalog::Catalog;
use crate::config::{ExportConfig, SYSTEM_SCHEMAS};
use anyhow::{Context, Result};
use sqlx::mysql::MySqlRow;
use sqlx::{Connection, MySqlConnection, Row};
use std::future::Future;
use std::pin::Pin;

pub struct MySQLCatalog {
    db: MySqlConnection,
}

impl MySQLCatalog {
    pub async fn new(config: &ExportConfig) -> Result<MySQLCatalog> {
        let options = config.connect_options();

        let db = MySqlConnection::connect_with(&options)
            .await
            .context("Connection failed")?;

        Ok(MySQLCatalog { db })
    }
}

fn schema_query() -> String {
    let placeholders = vec!["?"; SYSTEM_SCHEMAS.len()].join(",");

    format!(
        "SELECT SCHEMA_NAME FROM INFORMATION_SCHEMA.SCHEMATA WHERE SCHEMA_NAME NOT IN ({}) ORDER BY SCHEMA_NAME",
        placeholders
    )
}

impl Catalog for MySQLCatalog {
    fn event_scheduler(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, anyhow::Error>> + '_>> {
        let fut = async move {
            let row = sqlx::query("SHOW VARIABLES LIKE 'event_scheduler'")
                .fetch_optional(&mut self.db)
                .await?;

            match row {
                Some(row) => Ok(Some(row.try_get::<String, _>("Value")?)),
                None => Ok(None),
            }
        };

        Box::pin(fut)
    }

    fn library_views(&mut self) -> Pin<Box<dyn Future<Output = Result<i64, anyhow::Error>> + '_>> {
        let fut = async move {
            let count: i64 = sqlx::query(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'information_schema' AND table_name = 'LIBRARIES'",
            )
            .map(|row: MySqlRow| row.get(0))
            .fetch_one(&mut self.db)
            .await?;

            Ok(count)
        };

        Box::pin(fut)
    }

    fn list_databases(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, anyhow::Error>> + '_>> {
        let fut = async move {
            let query = schema_query();
            let mut statement = sqlx::query(query.as_str());
            for schema in SYSTEM_SCHEMAS {
                statement = statement.bind(schema);
            }

            let databases: Vec<String> = statement
                .map(|row: MySqlRow| row.get(0))
                .fetch_all(&mut self.db)
                .await?;

            Ok(databases)
        };

        Box::pin(fut)
    }
}

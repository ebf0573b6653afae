use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::debug;

use crate::config::config;
use crate::database::manager::DatabaseError;
use crate::filter::{Filter, RecordSource, SqlResult};

/// Runs [`Filter`] plans against Postgres. Parameters are bound as text; the
/// generated SQL casts each one to the column type.
#[async_trait]
impl RecordSource for PgPool {
    async fn fetch_page(&self, filter: &Filter) -> Result<Vec<Value>, DatabaseError> {
        let sql = filter.to_sql();
        log_sql("page", &sql);

        let mut query = sqlx::query_scalar::<_, Value>(&sql.query);
        for param in &sql.params {
            query = query.bind(param.as_str());
        }
        Ok(query.fetch_all(self).await?)
    }

    async fn count_matches(&self, filter: &Filter) -> Result<i64, DatabaseError> {
        let sql = filter.to_count_sql();
        log_sql("count", &sql);

        let mut query = sqlx::query_scalar::<_, i64>(&sql.query);
        for param in &sql.params {
            query = query.bind(param.as_str());
        }
        Ok(query.fetch_one(self).await?)
    }
}

fn log_sql(label: &str, sql: &SqlResult) {
    if config().query.debug_logging {
        debug!("{} query: {} {:?}", label, sql.query, sql.params);
    }
}

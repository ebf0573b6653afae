use std::marker::PhantomData;

use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::Model;

/// Lookups and deletes shared by every table keyed on `id`.
pub struct Repository<T> {
    pool: PgPool,
    _phantom: PhantomData<T>,
}

impl<T: Model> Repository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, _phantom: PhantomData }
    }

    pub async fn select_one(&self, id: Uuid) -> Result<Option<T>, DatabaseError> {
        let query = format!("SELECT * FROM \"{}\" WHERE id = $1", T::TABLE);
        let row = sqlx::query_as::<_, T>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn select_404(&self, id: Uuid) -> Result<T, DatabaseError> {
        self.select_one(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", T::LABEL)))
    }

    /// Deletes the row, failing with `NotFound` when it does not exist.
    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let query = format!("DELETE FROM \"{}\" WHERE id = $1", T::TABLE);
        let result = sqlx::query(&query).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("{} not found", T::LABEL)));
        }
        Ok(())
    }
}

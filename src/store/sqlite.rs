//! Durable [`Store`] backend on SQLite.
//!
//! Pins and users live in two tables (see `migrations/0001_init.sql`);
//! listing joins users for the denormalized owner username. Search terms are
//! compiled to an escaped `LIKE` so `%` and `_` in user input match
//! literally, keeping the predicate byte-for-byte equivalent to the demo
//! backend's in-memory filter.

use super::{PinFilter, Store, StoreError, StoreResult};
use crate::models::{
    pin::{Pin, PinChanges},
    user::User,
};
use async_trait::async_trait;
use sqlx::{sqlite::Sqlite, QueryBuilder, SqlitePool};
use uuid::Uuid;

const PIN_COLUMNS: &str =
    "p.id, p.title, p.description, p.image, p.owner_id, u.username, p.created_at";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fresh in-memory database with the schema applied. Test-only.
    #[cfg(test)]
    pub async fn open_in_memory() -> StoreResult<Self> {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .map_err(StoreError::from_sqlx)?;
        for stmt in include_str!("../../migrations/0001_init.sql")
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            sqlx::query(stmt)
                .execute(&pool)
                .await
                .map_err(StoreError::from_sqlx)?;
        }
        Ok(Self::new(pool))
    }

    /// Append the search predicate shared by `find_pins` and `count_pins`.
    fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &PinFilter) {
        if let Some(term) = filter.term() {
            builder.push(" WHERE (p.title LIKE ");
            builder.push_bind(like_pattern(term));
            builder.push(" ESCAPE '\\' OR p.description LIKE ");
            builder.push_bind(like_pattern(term));
            builder.push(" ESCAPE '\\')");
        }
    }

    async fn fetch_pin(&self, id: Uuid) -> StoreResult<Pin> {
        sqlx::query_as::<_, Pin>(&format!(
            "SELECT {PIN_COLUMNS} FROM pins p JOIN users u ON u.id = p.owner_id WHERE p.id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?
        .ok_or(StoreError::PinNotFound(id))
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn find_pins(&self, filter: &PinFilter, skip: i64, limit: i64) -> StoreResult<Vec<Pin>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {PIN_COLUMNS} FROM pins p JOIN users u ON u.id = p.owner_id"
        ));
        Self::push_filter(&mut builder, filter);
        builder.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(skip);

        builder
            .build_query_as::<Pin>()
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn count_pins(&self, filter: &PinFilter) -> StoreResult<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM pins p");
        Self::push_filter(&mut builder, filter);
        builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn get_pin(&self, id: Uuid) -> StoreResult<Pin> {
        self.fetch_pin(id).await
    }

    async fn insert_pin(&self, pin: Pin) -> StoreResult<Pin> {
        sqlx::query(
            "INSERT INTO pins (id, title, description, image, owner_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(pin.id)
        .bind(&pin.title)
        .bind(&pin.description)
        .bind(&pin.image)
        .bind(pin.owner_id)
        .bind(pin.created_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        self.fetch_pin(pin.id).await
    }

    async fn update_pin(&self, id: Uuid, changes: PinChanges) -> StoreResult<Pin> {
        // Single statement so concurrent readers see the old or the new
        // record, never a half-applied change.
        let result = sqlx::query(
            "UPDATE pins SET
                 title = COALESCE(?, title),
                 description = COALESCE(?, description),
                 image = COALESCE(?, image)
             WHERE id = ?",
        )
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.image)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::PinNotFound(id));
        }
        self.fetch_pin(id).await
    }

    async fn delete_pin(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM pins WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::PinNotFound(id));
        }
        Ok(())
    }

    async fn pins_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Pin>> {
        sqlx::query_as::<_, Pin>(&format!(
            "SELECT {PIN_COLUMNS} FROM pins p JOIN users u ON u.id = p.owner_id
             WHERE p.owner_id = ? ORDER BY p.created_at DESC, p.id DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn insert_user(&self, user: User) -> StoreResult<User> {
        match sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        {
            Ok(_) => Ok(user),
            Err(err) if is_unique_violation(&err) => Err(StoreError::EmailTaken(user.email)),
            Err(err) => Err(StoreError::from_sqlx(err)),
        }
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(())
    }
}

/// Build a `LIKE` pattern that matches `term` as a literal substring:
/// `%`, `_`, and `\` in the input are escaped so they lose their wildcard
/// meaning (the query attaches `ESCAPE '\'`).
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Return true if a SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

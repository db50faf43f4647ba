//! Users repository: the single-row, multi-row, insert, update, delete and
//! prepared-statement operations, plus step builders for transactional
//! updates.
//!
//! SQL is written with `?` placeholders and rewritten for the backend in use.

use sqlx::any::AnyRow;
use sqlx::{AnyPool, Executor as _, Row, Statement as _};

use crate::{Backend, Command, Step};

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub age: i64,
}

impl User {
    fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            age: row.try_get("age")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub age: i64,
}

impl NewUser {
    pub fn new(name: impl Into<String>, age: i64) -> Self {
        Self {
            name: name.into(),
            age,
        }
    }
}

/// `CREATE TABLE IF NOT EXISTS users` for the given backend.
pub fn create_table_sql(backend: Backend) -> &'static str {
    match backend {
        Backend::Postgres => {
            "CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                age BIGINT NOT NULL
            )"
        }
        Backend::MySql => {
            "CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(255) NOT NULL,
                age BIGINT NOT NULL
            )"
        }
        Backend::Sqlite => {
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                age INTEGER NOT NULL
            )"
        }
    }
}

/// Build a step that sets one user's age and expects exactly one row to change.
pub fn update_age_step(backend: Backend, id: i64, age: i64) -> Step {
    let command = Command::new(backend.rewrite_placeholders("UPDATE users SET age = ? WHERE id = ?"))
        .bind(age)
        .bind(id);
    Step::new(format!("set age of user {id} to {age}"), command)
}

pub struct UserRepository {
    pool: AnyPool,
    backend: Backend,
}

impl UserRepository {
    pub fn new(pool: AnyPool, backend: Backend) -> Self {
        Self { pool, backend }
    }

    /// Create the `users` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(create_table_sql(self.backend))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let sql = self
            .backend
            .rewrite_placeholders("SELECT id, name, age FROM users WHERE id = ?");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(User::from_row).transpose()
    }

    /// All users with an id greater than `id`, in id order.
    pub async fn list_after(&self, id: i64) -> Result<Vec<User>, sqlx::Error> {
        let sql = self
            .backend
            .rewrite_placeholders("SELECT id, name, age FROM users WHERE id > ? ORDER BY id");
        let rows = sqlx::query(&sql).bind(id).fetch_all(&self.pool).await?;
        rows.iter().map(User::from_row).collect()
    }

    /// Insert a user and return its generated id.
    ///
    /// MySQL has no `RETURNING`; there the id comes from the driver. The SQLite
    /// driver does not report insert ids through `Any`, so it uses `RETURNING`.
    pub async fn insert(&self, user: &NewUser) -> Result<i64, sqlx::Error> {
        if self.backend != Backend::MySql {
            let sql = self
                .backend
                .rewrite_placeholders("INSERT INTO users (name, age) VALUES (?, ?) RETURNING id");
            return sqlx::query_scalar(&sql)
                .bind(user.name.clone())
                .bind(user.age)
                .fetch_one(&self.pool)
                .await;
        }

        let result = sqlx::query("INSERT INTO users (name, age) VALUES (?, ?)")
            .bind(user.name.clone())
            .bind(user.age)
            .execute(&self.pool)
            .await?;
        result
            .last_insert_id()
            .ok_or_else(|| sqlx::Error::Protocol("driver returned no insert id".to_string()))
    }

    /// Same rows as [`list_after`](Self::list_after), through an explicitly
    /// prepared statement on one connection.
    pub async fn list_after_prepared(&self, id: i64) -> Result<Vec<User>, sqlx::Error> {
        let sql = self
            .backend
            .rewrite_placeholders("SELECT id, name, age FROM users WHERE id > ? ORDER BY id");
        let mut conn = self.pool.acquire().await?;
        let statement = (&mut *conn).prepare(&sql).await?;

        let rows = statement.query().bind(id).fetch_all(&mut *conn).await?;
        rows.iter().map(User::from_row).collect()
    }

    /// Insert several users through one prepared statement on one connection.
    pub async fn insert_batch(&self, users: &[NewUser]) -> Result<u64, sqlx::Error> {
        let sql = self
            .backend
            .rewrite_placeholders("INSERT INTO users (name, age) VALUES (?, ?)");
        let mut conn = self.pool.acquire().await?;
        let statement = (&mut *conn).prepare(&sql).await?;

        let mut inserted = 0;
        for user in users {
            inserted += statement
                .query()
                .bind(user.name.clone())
                .bind(user.age)
                .execute(&mut *conn)
                .await?
                .rows_affected();
        }
        Ok(inserted)
    }

    pub async fn update_age(&self, id: i64, age: i64) -> Result<u64, sqlx::Error> {
        let sql = self
            .backend
            .rewrite_placeholders("UPDATE users SET age = ? WHERE id = ?");
        let result = sqlx::query(&sql)
            .bind(age)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id: i64) -> Result<u64, sqlx::Error> {
        let sql = self
            .backend
            .rewrite_placeholders("DELETE FROM users WHERE id = ?");
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
    }
}

use sqlx::AnyPool;
use tempfile::TempDir;

use sql_unit_of_work::{pool, DatabaseConfig, NewUser, UserRepository};

/// A SQLite database in a temporary directory, removed on drop.
pub struct TestDatabase {
    _dir: TempDir,
    pub pool: AnyPool,
    pub config: DatabaseConfig,
}

impl TestDatabase {
    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone(), self.config.backend)
    }
}

/// Create a fresh database with an empty `users` table.
pub async fn setup_database() -> TestDatabase {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());

    let mut config = DatabaseConfig::new(url).expect("Invalid database URL");
    config.max_connections = 4;

    let pool = pool::connect(&config)
        .await
        .expect("Failed to connect to database");

    UserRepository::new(pool.clone(), config.backend)
        .ensure_schema()
        .await
        .expect("Failed to create users table");

    TestDatabase {
        _dir: dir,
        pool,
        config,
    }
}

/// Insert the users the demos expect and return their ids.
pub async fn seed_users(repo: &UserRepository) -> Vec<i64> {
    let mut ids = Vec::new();
    for (name, age) in [("alice", 18), ("bob", 26), ("carol", 38), ("dave", 22)] {
        let id = repo
            .insert(&NewUser::new(name, age))
            .await
            .expect("Failed to seed user");
        ids.push(id);
    }
    ids
}

//! Walks through the basic operations against a live database, then runs a
//! two-update unit of work.
//!
//! Usage:
//!   DATABASE_URL=mysql://root@127.0.0.1:3306/sql_test uow-demo
//!   RUST_LOG=sql_unit_of_work=debug uow-demo   # log every step

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use sql_unit_of_work::{
    pool, users, DatabaseConfig, NewUser, Outcome, SqlUnitOfWork, UnitOfWorkRunner,
    UserRepository,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let config = DatabaseConfig::from_env().context("loading database configuration")?;
    let pool = pool::connect(&config)
        .await
        .context("connecting to database")?;

    let repo = UserRepository::new(pool.clone(), config.backend);
    repo.ensure_schema().await.context("creating users table")?;

    let first = repo.insert(&NewUser::new("alice", 26)).await?;
    info!(id = first, "inserted user");

    let inserted = repo
        .insert_batch(&[NewUser::new("bob", 19), NewUser::new("carol", 27)])
        .await?;
    info!(inserted, "inserted users with a prepared statement");

    match repo.find_by_id(first).await? {
        Some(user) => info!(?user, "single-row query"),
        None => warn!(id = first, "user not found"),
    }

    let updated = repo.update_age(first, 39).await?;
    info!(rows_affected = updated, "updated user");

    for user in repo.list_after(0).await? {
        info!(?user, "multi-row query");
    }

    for user in repo.list_after_prepared(0).await? {
        info!(?user, "prepared multi-row query");
    }

    let uow = SqlUnitOfWork::new(Arc::new(pool.clone()));
    let runner = UnitOfWorkRunner::new(&uow);
    let last = repo
        .list_after(first)
        .await?
        .last()
        .map_or(first, |user| user.id);
    let outcome = runner
        .run(vec![
            users::update_age_step(config.backend, first, 30),
            users::update_age_step(config.backend, last, 40),
        ])
        .await;
    match &outcome {
        Outcome::Committed { rows_affected } => info!(?rows_affected, "transaction committed"),
        Outcome::RolledBack { reason, .. } => warn!(%reason, "transaction rolled back"),
    }

    let deleted = repo.delete(first).await?;
    info!(rows_affected = deleted, "deleted user");

    pool.close().await;
    Ok(())
}

#![allow(dead_code)]

pub mod fake_store;
pub mod observers;
pub mod sqlite;

pub use fake_store::{Event, FakeStore};
pub use observers::RecordingObserver;
pub use sqlite::{seed_users, setup_database, TestDatabase};

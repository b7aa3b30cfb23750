//! Storage layer for dispatch
//!
//! This crate provides:
//! - SQLite order storage
//! - Content-addressable blob storage for item photos
//! - Migrations

pub mod blob;
pub mod db;
pub mod error;
pub mod models;

pub use blob::BlobStore;
pub use db::Storage;
pub use error::{Result, StorageError};

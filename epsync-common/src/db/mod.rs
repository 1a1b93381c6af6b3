//! Database layer: schema initialization, row models and read queries.

pub mod init;
pub mod models;
pub mod queries;

pub use init::{create_schema, init_database};

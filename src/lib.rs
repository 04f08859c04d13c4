pub mod audit;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod history;
pub mod render;
pub mod schema;
pub mod search;
pub mod seed;
pub mod store;
pub mod update;

#[cfg(test)]
pub mod test_utils;

pub use error::{Error, Result};

/// Log filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "hr_vectors=info";

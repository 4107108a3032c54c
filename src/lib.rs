pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod s3;
pub mod search;
pub mod sheets;
pub mod state;
pub mod storage;

pub use search::{OrderSearch, SearchContext, SearchOutcome, SearchQuery, SearchState};

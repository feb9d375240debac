pub mod apis;
pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod filters;
pub mod logging;
pub mod scraper;
pub mod storage;
pub mod transforms;
pub mod types;
pub mod venues;

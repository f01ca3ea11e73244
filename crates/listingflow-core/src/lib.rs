pub mod config;
pub mod db;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod schema;
pub mod sink;
pub mod transform;

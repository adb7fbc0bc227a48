pub mod api;
pub mod cache;
pub mod clean;
pub mod config;
pub mod device;
pub mod error;
pub mod generate;
pub mod model;
pub mod prompt;
pub mod registry;
pub mod util;

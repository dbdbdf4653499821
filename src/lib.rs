pub mod config;
pub mod exporter;
pub mod fs;
pub mod logging;
pub mod models;
pub mod parser;
pub mod select;

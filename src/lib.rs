pub mod archive;
pub mod config;
pub mod error;
pub mod images;
pub mod models;
pub mod palette;
pub mod pipeline;
pub mod prompt;
pub mod report;
pub mod routes;
pub mod sections;
pub mod store;
pub mod vertex;

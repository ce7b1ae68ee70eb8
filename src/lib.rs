pub mod api;
pub mod config;
pub mod detect;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod model;
pub mod pipeline;
pub mod rings;
pub mod scoring;
pub mod store;

#[cfg(test)]
pub mod testutil;

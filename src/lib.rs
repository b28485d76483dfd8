//! splitlab: statistical analysis engine for A/B experiments
//!
//! - `engine` - planning, aggregation, hypothesis tests and report assembly
//! - `model` - wire types shared by the engine and the service
//! - `store` - named experiment records
//! - `server` - HTTP service exposing the engine

pub mod engine;
pub mod model;
pub mod server;
pub mod store;

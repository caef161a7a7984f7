//! Command-line tooling around the cdevents-core event model.

pub mod commands;
pub mod config;

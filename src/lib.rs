// src/lib.rs

#[macro_use]
pub mod macros;
#[macro_use]
pub mod log;

pub mod config;
pub mod core;
pub mod error;

pub mod catalog;
pub mod crawl;
pub mod normalize;
pub mod progress;
pub mod query;
pub mod record;
pub mod runner;
pub mod sites;
pub mod store;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{Error, Result};

//! Polls syndication feeds on a fixed interval and stores every item exactly once.

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod harvest;
pub mod logging;
pub mod models;
pub mod web;

pub use config::Config;
pub use error::{AppError, Result};

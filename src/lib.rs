pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod image;
pub mod manifest;
pub mod reference;
pub mod registry;
pub mod service;

pub use anyhow::Result;

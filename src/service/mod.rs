//! Service layer for business logic orchestration
//!
//! This module contains the service layer that orchestrates registry work,
//! separating concerns from the CLI layer in main.rs.

pub mod coordinator;
pub mod fetch;
pub mod index;
pub mod login;
pub mod manifest_list;
pub mod mutate;
pub mod publish;

pub use fetch::{fetch_source, SourceEntry};
pub use index::IndexBuilder;
pub use login::LoginService;
pub use manifest_list::{split_sources, ManifestListService};
pub use mutate::{MutateConfig, MutateService};

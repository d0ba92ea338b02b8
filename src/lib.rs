pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::storage::{AnyStore, LocalStorage};
#[cfg(feature = "cloud")]
pub use adapters::storage::S3Storage;
pub use app::tasks::{run_task, Task};
pub use config::ProjectConfig;
#[cfg(feature = "cli")]
pub use config::{Cli, Command};
pub use core::etl::EtlEngine;
pub use utils::error::{EtlError, Result};

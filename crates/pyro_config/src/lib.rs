//! Parsing, validation and resolution of `pyro.toml` project descriptions.
//!
//! This crate reads the project file and produces a strongly-typed
//! [`ProjectConfig`], then resolves it into a [`ResolvedProject`] with
//! absolute paths, a decided game type, flags file, compiler location and
//! worker limit.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod locate;
pub mod remote;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_project, load_project_from_str, PROJECT_FILE};
pub use locate::{default_locator, InstallLocator, NoLocator, RegistryLocator};
pub use remote::{RemoteProvider, RemoteUrl};
pub use resolve::{
    resolve_project, resolve_worker_limit, Overrides, ResolvedArchive, ResolvedFolder,
    ResolvedProject,
};
pub use types::*;

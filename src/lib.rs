//! gensync - Config-driven synchronization of generated source code
//!
//! gensync fetches the files produced by code generators for one or more
//! application versions and rewrites only the local files whose generated
//! content has materially changed.
//!
//! ## Modules
//!
//! - [`config`]: Project configuration parsing
//! - [`client`]: Code-generation service client
//! - [`normalize`]: Version-stamp stripping
//! - [`change`]: Change detection
//! - [`paths`]: Target path resolution
//! - [`sync`]: Planning and applying updates

pub mod change;
pub mod client;
pub mod config;
pub mod error;
pub mod normalize;
pub mod paths;
pub mod sync;

pub use change::{differs, ChangeDetector};
pub use client::{ApiClient, GeneratedFile, GeneratorSource};
pub use config::{
    Config, GeneratorConfig, ProjectConfig, ProjectFilter, SyncSettings, TargetConfig, TargetKind,
};
pub use error::{FetchError, FileOperation, WriteError};
pub use normalize::{normalize, ContentNormalizer, LineMatcher};
pub use paths::{display_path, resolve, ResolvedTarget};
pub use sync::{
    ApplySummary, PendingUpdate, SyncApplier, SyncEngine, SyncOptions, SyncPlan, SyncPlanner,
    SyncSummary,
};

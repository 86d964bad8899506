//! Terrapin storage abstraction
//!
//! Unifies heterogeneous remote object stores behind one driver contract so
//! the rest of the resource never special-cases a backend.
//!
//! The pieces:
//!
//! - **StorageConfig**: the inbound backend configuration with pure
//!   validation and immutable credential injection
//! - **StorageDriver**: the per-backend capability trait, with S3 and
//!   local-filesystem implementations selected by a factory
//! - **resolver**: the pure "is there a new version?" decision logic
//!
//! A driver is constructed once per request and carries its authentication;
//! it is never shared across concurrent requests.

pub mod config;
pub mod driver;
pub mod drivers;
pub mod resolver;

// Re-export main types for convenience
pub use config::{StorageConfig, StorageDriverType};
pub use driver::{StorageDriver, StorageError, StorageObjectVersion, StorageResult};
pub use drivers::{LocalDriver, S3Driver, build_driver};

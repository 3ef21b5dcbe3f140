//! Filesystem primitives used while reconciling archives with a live tree.
//!
//! - `probe` - classify a target path (missing, file, directory with N children)
//! - `primitives` - shadow-file swap onto an existing path
//! - `permissions` - POSIX mode restoration
//! - `timestamps` - modification-time restoration

mod error;
pub mod permissions;
pub mod primitives;
mod probe;
mod timestamps;

pub use error::{Error, Result};
pub use permissions::PermissionMode;
pub use primitives::{ReplaceOptions, replace_file};
pub use probe::{PathState, is_writable_dir, probe, remove_existing};
pub use timestamps::{modified, set_modified};

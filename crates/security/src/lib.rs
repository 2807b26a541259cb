//! Security primitives for scout.
//!
//! Provides **path containment**: every file operation the agent can trigger
//! resolves against a single workspace root and is refused if it would land
//! outside it (through `..`, an absolute path, or a symlink).

pub mod path;

pub use path::{contain_path, relative_display, PathValidationError};

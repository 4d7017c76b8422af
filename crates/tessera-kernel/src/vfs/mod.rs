//! Virtual filesystem abstraction backing sandbox sessions.
//!
//! - [`VfsOps`] - core trait for filesystem operations
//! - [`MemoryBackend`] - in-memory filesystem (tests, scratch sessions)
//! - [`LocalBackend`] - a local directory, with path security
//!
//! Operations are path-based with explicit offset/size, so the same trait
//! describes a store reached over a session handle and one on local disk.

pub mod backends;
mod error;
mod ops;
mod types;

pub use backends::{LocalBackend, MemoryBackend};
pub use error::{VfsError, VfsResult};
pub use ops::VfsOps;
pub use types::{DirEntry, FileAttr, FileType};

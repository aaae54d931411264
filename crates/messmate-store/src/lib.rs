//! The synchronized store the core runs against.
//!
//! [`RemoteStore`] is the contract every ledger operation is written to:
//! a subscribable key-value tree with all-or-nothing multi-key writes and
//! an atomic read-modify-write primitive for single numeric values. The
//! production backing store lives outside this repository; [`InMemoryStore`]
//! is the reference implementation used by tests and local tooling.

#![deny(unsafe_code)]

pub mod directory;
pub mod error;
pub mod memory;
mod store;

pub use directory::Directory;
pub use error::{DirectoryError, StoreError};
pub use memory::InMemoryStore;
pub use store::{RemoteStore, WriteOp};

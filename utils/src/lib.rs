//! Shared infrastructure utilities for Sylvia.
//!
//! This crate provides filesystem helpers that the persistence layers need but
//! that don't belong in the domain-pure `sylvia-types` crate:
//!
//! - **`atomic_write`**: Crash-safe file persistence (temp + rename)
//! - **`secure_dir`**: Owner-only data directories for transcripts and logs

pub mod atomic_write;
pub mod secure_dir;

pub use atomic_write::{Visibility, atomic_create, atomic_replace};
pub use secure_dir::ensure_secure_dir;

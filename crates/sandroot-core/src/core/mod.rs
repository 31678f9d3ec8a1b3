//! Internal implementation modules for `sandroot-core`.
//!
//! Callers normally go through the flat re-exports in the crate root.

pub mod archive;
pub mod cancel;
pub mod commands;
pub mod config;
pub mod errors;
pub(crate) mod fs;
pub mod heal;
pub mod identity;
pub mod install;
pub mod layout;
pub(crate) mod net;
pub mod permissions;
pub mod state;
pub mod transfer;

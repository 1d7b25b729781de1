//! The boundaries every model-requested action passes through: path
//! containment for files and trust tiers for commands.

pub mod command_filter;
pub mod diff;
pub mod filename;
pub mod workspace;

pub use command_filter::{classify, classify_command, TrustTier};
pub use workspace::WorkspaceGuard;

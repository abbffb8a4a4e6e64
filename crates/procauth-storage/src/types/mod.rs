//! Type definitions for procauth storage.

mod directory;
mod grants;
mod ids;
mod permissions;
mod roles;

// Re-export all types from submodules
pub use directory::*;
pub use grants::*;
pub use ids::*;
pub use permissions::*;
pub use roles::*;

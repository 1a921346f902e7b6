// Core moderation module - contains the partial-entry spam check.
// Field scanner -> verdict client -> moderation action.

pub mod field_scanner;
pub mod moderation_models;
pub mod moderation_service;
pub mod verdict_service;

#[cfg(test)]
pub mod test_support;

pub use moderation_models::*;
pub use moderation_service::*;
pub use verdict_service::*;

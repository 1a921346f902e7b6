// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "cleantalk/mod.rs"]
pub mod cleantalk;

#[path = "settings/mod.rs"]
pub mod settings;

#[path = "submissions/mod.rs"]
pub mod submissions;

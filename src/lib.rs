//! Workspace root placeholder. See the crates under `crates/`.

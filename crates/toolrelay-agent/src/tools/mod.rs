//! Tool trait, registry, schema translation, and the built-in local tools.

pub mod base;
pub mod calculator;
pub mod clock;
pub mod filesystem;
pub mod registry;
pub mod schema;

pub use base::{optional_bool, optional_i64, optional_string, params_from_value, require_string, Tool};
pub use registry::{ToolRegistry, ToolSource};

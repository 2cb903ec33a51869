pub mod cache;
pub mod engine;
pub mod error;
pub mod mock;
pub mod processing;
pub mod util;

pub use error::Error;

use crate::engine::OperatorRegistry;

/// The registry with every built-in operator type registered.
///
/// Embedders extend it with their own factories before handing it to the
/// server.
pub fn default_registry() -> OperatorRegistry {
    let mut registry = OperatorRegistry::new();
    mock::register_operators(&mut registry);
    processing::register_operators(&mut registry);
    registry
}

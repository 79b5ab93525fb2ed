//! # Built-in Handlers
//!
//! Handlers compiled into the binary and available to manifests by name.

pub mod start;
pub mod trace;

use crate::registry::HandlerCatalog;

/// Catalog with every built-in handler registered under its manifest name.
pub fn builtin_catalog() -> HandlerCatalog {
    HandlerCatalog::new()
        .with(start::NAME, start::factory)
        .with(trace::NAME, trace::factory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_names() {
        let catalog = builtin_catalog();
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["start", "trace"]);
    }
}

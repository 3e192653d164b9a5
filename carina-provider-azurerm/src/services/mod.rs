//! Resource and data source handlers, one module per Azure service

pub mod datafactory;
pub mod dns;
pub mod sentinel;

use crate::framework::Registry;

/// Registry of every handler the provider ships
pub fn registry() -> Registry {
    let mut registry = Registry::new();
    dns::register(&mut registry);
    sentinel::register(&mut registry);
    datafactory::register(&mut registry);
    registry
}

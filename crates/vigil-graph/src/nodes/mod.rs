//! Built-in node modules: the Process and File types and their typed query
//! and view wrappers.

pub mod file;
pub mod process;

pub use file::{
    file_schema, process_file_fragment, FileQuery, FileViewExt, ProcessQueryFileExt,
    ProcessViewFileExt,
};
pub use process::{process_schema, ProcessQuery, ProcessViewExt};

use vigil_core::Result;
use vigil_schema::SchemaRegistry;

/// Register the built-in types, apply the File extension to Process, and
/// derive all reverse edges. Call during provisioning, before the first
/// query.
pub fn register_defaults(registry: &SchemaRegistry) -> Result<()> {
    registry.register_all([process_schema(), file_schema()])?;
    registry.extend(process_file_fragment())?;
    registry.derive_reverse_edges()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_register_and_mirror() {
        let registry = SchemaRegistry::new();
        register_defaults(&registry).unwrap();

        let process = registry.lookup("Process").unwrap();
        assert!(process.edge("children").is_some());
        assert!(process.edge("parent").unwrap().derived);
        assert!(process.edge("spawned_from").is_some());

        let file = registry.lookup("File").unwrap();
        let bin_file = file.edge("bin_file").unwrap();
        assert!(bin_file.derived);
        assert_eq!(bin_file.edge.dest_type, "Process");
    }

    #[test]
    fn defaults_are_idempotent_per_registry() {
        let registry = SchemaRegistry::new();
        register_defaults(&registry).unwrap();
        // Re-deriving mirrors is a no-op; re-registering types is an error.
        registry.derive_reverse_edges().unwrap();
        assert!(registry.register(process_schema()).is_err());
    }
}

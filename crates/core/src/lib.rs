pub mod error;
pub mod merge;
pub mod naming;
pub mod types;

// Re-export commonly used types
pub use error::ConfigError;
pub use naming::fingerprint_class_name;
pub use types::{
    CompiledConfig, CtConfig, StyleDeclaration, StyleEntry, StyleSheet, StyleValue, VarFallback,
    VariantSelection, VariantSheet,
};

pub mod builder;
pub mod compile;
pub mod injector;

// Re-export commonly used items
pub use builder::CtBuilder;
pub use compile::{compile_config, CompiledOutput};
pub use injector::RuleInjector;

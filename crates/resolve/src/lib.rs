pub mod alias;
pub mod eval;
pub mod module_info;
pub mod resolver;

// Re-export commonly used items
pub use alias::AliasTable;
pub use module_info::ModuleStaticInfo;
pub use resolver::{ModuleScope, StaticResolver};

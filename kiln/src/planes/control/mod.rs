pub mod admin_operations;
pub mod operation;

pub use admin_operations::AdapterRegistry;
pub use operation::AdminOperations;

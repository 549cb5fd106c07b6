pub mod cache_operations;
pub mod filters;
pub mod operation;

pub use cache_operations::CacheService;
pub use filters::{Filter, FilterChain, Intercept, KeyPrefix, TracingFilter};
pub use operation::{CacheOperations, Operation, Outcome};

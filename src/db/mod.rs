pub mod pool;
pub mod queries;
pub mod queries_catalog;

pub use pool::{create_lazy_pool, create_pool, run_migrations};

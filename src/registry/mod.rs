//! Service instance registry: concurrency-safe CRUD and queries over the
//! in-memory mapping of service names to their registered instances.

pub mod store;

pub use store::InstanceRegistry;

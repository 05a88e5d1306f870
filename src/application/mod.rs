pub mod engine;
pub mod service;

pub use engine::{AllocationEngine, EngineError};
pub use service::{AllocationService, ServiceError, ServiceStatus};

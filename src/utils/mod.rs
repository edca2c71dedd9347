// src/utils/mod.rs

pub mod concurrency;
pub mod deadline;
pub mod rate_limiter;
pub mod text;

pub use concurrency::StreamConcurrencyGuard;
pub use deadline::with_soft_deadline;
pub use rate_limiter::UserRateLimiter;

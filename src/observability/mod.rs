// Prometheus registry, /metrics handler and request metrics middleware
pub mod endpoints;
pub mod metrics;
pub mod middleware;

pub use endpoints::*;
pub use metrics::*;
pub use middleware::*;

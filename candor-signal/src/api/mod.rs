//! HTTP API for candor-signal

mod health;
mod session;
mod sse;

pub use health::health_routes;
pub use session::session_routes;
pub use sse::event_stream;

pub mod models;

mod sse_broadcaster;
pub use sse_broadcaster::*;

mod session;

mod events_sse;
pub use events_sse::events_sse;

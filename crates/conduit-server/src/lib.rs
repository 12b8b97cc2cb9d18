pub mod error;
pub mod origin;
pub mod relay;
pub mod server;
pub mod sse;

pub use error::ServeError;
pub use origin::OriginState;
pub use server::{start_origin, start_relay, ServerConfig, ServerHandle};

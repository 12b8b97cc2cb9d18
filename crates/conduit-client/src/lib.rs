pub mod client;
pub mod consumer;
pub mod render;

pub use client::ConsumerClient;
pub use consumer::{Outcome, RenderState, StreamConsumer};
pub use render::{Renderer, TerminalRenderer};

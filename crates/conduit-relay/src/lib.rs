pub mod mock;
pub mod relay;
pub mod upstream;

pub use relay::{FrameStream, RelayService, DEFAULT_TIMEOUT};
pub use upstream::{ByteStream, HttpUpstream, Upstream, UpstreamRequest};

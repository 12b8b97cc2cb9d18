pub mod codec;
pub mod errors;
pub mod event;
pub mod frame;
pub mod ids;
pub mod lines;
pub mod request;

pub use codec::{decode, encode, DecodeError};
pub use errors::StreamError;
pub use event::{Event, ResultPayload};
pub use frame::{Feed, Frame, FrameParser, Line, ParserState};
pub use ids::RequestId;
pub use lines::LineStream;
pub use request::{ChatRequest, SearchQuery, SearchRequest};

pub mod fixtures;
pub mod responder;
pub mod script;
pub mod source;
pub mod stages;

pub use responder::{ChatResponder, TemplateResponder};
pub use script::{Beat, ProgressPacing, ProgressScript, TokenPacing, TokenScript};
pub use source::{paced, EventSource, EventStream, ProgressSource, TokenSource};
pub use stages::{KeywordStageSelector, StageSelector};

mod answer;
mod citation;
mod document;

pub use answer::{Answer, AnswerMetadata};
pub use citation::Citation;
pub use document::RetrievedDocument;

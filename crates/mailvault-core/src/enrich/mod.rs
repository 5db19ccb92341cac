//! Message enrichment: raw file lookup and parsing.

mod bridge;
mod model;
pub mod parser;

pub use bridge::EnrichmentBridge;
pub use model::{EnrichedMessage, EnrichmentIssue, MessageSummary};
pub use parser::{Attachment, MailParser, MessageParser, ParseError, ParsedMessage};

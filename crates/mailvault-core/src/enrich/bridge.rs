//! Resolves stored records to their raw files and parses them.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use super::model::{EnrichedMessage, EnrichmentIssue};
use super::parser::{MailParser, MessageParser, ParsedMessage};
use crate::query::MessageWithLabels;

/// Turns stored records into display-ready messages.
///
/// Failures are absorbed per message: a missing or unreadable file yields a
/// placeholder instead of an error, so one bad file never fails a listing.
#[derive(Clone)]
pub struct EnrichmentBridge {
    parser: Arc<dyn MessageParser>,
    read_timeout: Duration,
}

impl std::fmt::Debug for EnrichmentBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentBridge")
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

impl EnrichmentBridge {
    /// Creates a bridge using `parser`.
    #[must_use]
    pub fn new(parser: Arc<dyn MessageParser>, read_timeout: Duration) -> Self {
        Self {
            parser,
            read_timeout,
        }
    }

    /// Creates a bridge using [`MailParser`].
    #[must_use]
    pub fn with_default_parser(read_timeout: Duration) -> Self {
        Self::new(Arc::new(MailParser), read_timeout)
    }

    /// Path of a raw file inside `account_dir`.
    ///
    /// Only normal components of `reference` are kept, so the result never leaves
    /// the account directory. The file is not checked for existence.
    #[must_use]
    pub fn locate(account_dir: &Path, reference: &str) -> PathBuf {
        let mut path = account_dir.to_path_buf();
        for component in Path::new(reference).components() {
            if let Component::Normal(part) = component {
                path.push(part);
            }
        }
        path
    }

    /// Reads a raw file under the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichmentIssue::FileUnavailable`] if the file cannot be opened or
    /// read in time.
    pub async fn read_raw(&self, path: &Path) -> Result<Vec<u8>, EnrichmentIssue> {
        let read = async {
            let mut file = tokio::fs::File::open(path).await?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf).await?;
            Ok::<_, std::io::Error>(buf)
        };

        match tokio::time::timeout(self.read_timeout, read).await {
            Ok(Ok(buf)) => Ok(buf),
            Ok(Err(e)) => {
                warn!("Cannot read {}: {e}", path.display());
                Err(EnrichmentIssue::FileUnavailable)
            }
            Err(_) => {
                warn!(
                    "Reading {} timed out after {:?}",
                    path.display(),
                    self.read_timeout
                );
                Err(EnrichmentIssue::FileUnavailable)
            }
        }
    }

    /// Enriches one message.
    pub async fn enrich(&self, account_dir: &Path, message: MessageWithLabels) -> EnrichedMessage {
        self.enrich_with_raw(account_dir, message).await.0
    }

    /// Enriches one message and also returns the raw bytes when they could be read.
    pub async fn enrich_with_raw(
        &self,
        account_dir: &Path,
        message: MessageWithLabels,
    ) -> (EnrichedMessage, Option<Vec<u8>>) {
        let path = Self::locate(account_dir, &message.message_filename);
        let raw = match self.read_raw(&path).await {
            Ok(raw) => raw,
            Err(issue) => return (EnrichedMessage::placeholder(message, issue), None),
        };

        let (parsed, raw) = self.parse(raw).await;
        match parsed {
            Ok(parsed) => {
                debug!("Enriched message {} from {}", message.uid, path.display());
                (EnrichedMessage::from_parsed(message, parsed), Some(raw))
            }
            Err(reason) => {
                warn!("Cannot parse {}: {reason}", path.display());
                (
                    EnrichedMessage::placeholder(message, EnrichmentIssue::ContentCorrupted),
                    Some(raw),
                )
            }
        }
    }

    /// Enriches every message concurrently, keeping the input order.
    pub async fn enrich_all(
        &self,
        account_dir: &Path,
        messages: Vec<MessageWithLabels>,
    ) -> Vec<EnrichedMessage> {
        join_all(
            messages
                .into_iter()
                .map(|message| self.enrich(account_dir, message)),
        )
        .await
    }

    async fn parse(&self, raw: Vec<u8>) -> (Result<ParsedMessage, String>, Vec<u8>) {
        let parser = Arc::clone(&self.parser);
        let raw = Arc::new(raw);
        let input = Arc::clone(&raw);
        let parsed = match tokio::task::spawn_blocking(move || parser.parse(&input)).await {
            Ok(parsed) => parsed.map_err(|e| e.to_string()),
            Err(e) => Err(format!("parser task failed: {e}")),
        };
        // The blocking task has dropped its clone once it has been joined.
        let raw = Arc::try_unwrap(raw).unwrap_or_else(|shared| shared.as_ref().clone());
        (parsed, raw)
    }
}

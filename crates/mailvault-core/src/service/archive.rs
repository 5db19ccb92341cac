//! Archive browsing service.
//!
//! Ties the session, query engine and enrichment bridge together into the
//! operations a front end calls.

use std::sync::Arc;

use tracing::{debug, info};

use super::model::{
    AccountsOverview, Download, MessageDetail, MessagePage, MessageQuery, SelectedAccount,
    SenderMatches,
};
use crate::account::AccountId;
use crate::config::ArchiveConfig;
use crate::enrich::{EnrichmentBridge, MessageSummary};
use crate::query::{ListRequest, MAX_SENDER_RESULTS, QueryEngine, SystemInfo};
use crate::store::ArchiveSession;
use crate::{Error, Result};

/// MIME type of downloaded messages.
pub const MESSAGE_CONTENT_TYPE: &str = "message/rfc822";

/// Read-only operations over a mail archive.
#[derive(Debug, Clone)]
pub struct ArchiveService {
    session: Arc<ArchiveSession>,
    engine: QueryEngine,
    bridge: EnrichmentBridge,
    default_page_size: u32,
}

impl ArchiveService {
    /// Creates a service for the archive described by `config`.
    #[must_use]
    pub fn new(config: &ArchiveConfig) -> Self {
        Self::with_parts(
            Arc::new(ArchiveSession::new(config)),
            EnrichmentBridge::with_default_parser(config.read_timeout()),
            config.default_page_size,
        )
    }

    /// Creates a service from existing parts.
    #[must_use]
    pub fn with_parts(
        session: Arc<ArchiveSession>,
        bridge: EnrichmentBridge,
        default_page_size: u32,
    ) -> Self {
        Self {
            engine: QueryEngine::new(Arc::clone(&session)),
            session,
            bridge,
            default_page_size,
        }
    }

    /// The underlying session.
    #[must_use]
    pub fn session(&self) -> &ArchiveSession {
        &self.session
    }

    /// The underlying query engine.
    #[must_use]
    pub const fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    /// Lists accounts and reports which one is open.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive root cannot be scanned.
    pub async fn list_accounts(&self) -> Result<AccountsOverview> {
        let accounts = self.session.registry().list_accounts().await?;
        Ok(AccountsOverview {
            accounts,
            current_account: self.session.current_account().await,
        })
    }

    /// Opens the named account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty name and
    /// [`Error::AccountNotFound`] for a name the registry does not list.
    pub async fn select_account(&self, name: &str) -> Result<SelectedAccount> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("Account ID is required".into()));
        }
        let account =
            AccountId::parse(name).map_err(|_| Error::AccountNotFound(name.to_string()))?;

        self.session.open_account(&account).await?;
        info!("Selected account {account}");
        Ok(SelectedAccount {
            success: true,
            current_account: account,
        })
    }

    /// Distinct labels of the open account.
    ///
    /// # Errors
    ///
    /// Returns an error if no account can be selected or the query fails.
    pub async fn list_labels(&self) -> Result<Vec<String>> {
        self.engine.list_labels().await
    }

    /// One page of enriched summaries for a label.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a missing label or zero page values, or
    /// an error if the query fails. Unreadable files do not fail the page.
    pub async fn list_messages(&self, query: &MessageQuery) -> Result<MessagePage> {
        let request = ListRequest {
            label: query.label.clone(),
            page: query.page.unwrap_or(1),
            page_size: query.page_size.unwrap_or(self.default_page_size),
            sort_field: query.sort_field.unwrap_or_default(),
            sort_order: query.sort_order.unwrap_or_default(),
        };
        let page = self.engine.list_by_label(&request).await?;

        let enriched = self.bridge.enrich_all(&page.scope.dir, page.messages).await;
        let degraded = enriched.iter().filter(|m| m.is_degraded()).count();
        if degraded > 0 {
            debug!("{degraded} message(s) on this page shown as placeholders");
        }

        Ok(MessagePage {
            emails: enriched.into_iter().map(MessageSummary::from).collect(),
            total: page.total,
        })
    }

    /// Full message with its raw source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] if no message has `uid`.
    pub async fn get_message(&self, uid: &str) -> Result<MessageDetail> {
        let found = self
            .engine
            .lookup_uid(uid)
            .await?
            .ok_or_else(|| Error::RecordNotFound(format!("message {uid}")))?;

        let (email, raw) = self
            .bridge
            .enrich_with_raw(&found.scope.dir, found.message)
            .await;
        Ok(MessageDetail {
            error: email.issue.map(|issue| issue.description().to_string()),
            original: raw
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .unwrap_or_default(),
            email,
        })
    }

    /// Raw message file for saving.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] if the message or its file cannot be found.
    pub async fn download_message(&self, uid: &str) -> Result<Download> {
        let found = self
            .engine
            .lookup_uid(uid)
            .await?
            .ok_or_else(|| Error::RecordNotFound(format!("message {uid}")))?;

        let path = EnrichmentBridge::locate(&found.scope.dir, &found.message.message_filename);
        let bytes = self
            .bridge
            .read_raw(&path)
            .await
            .map_err(|issue| Error::RecordNotFound(format!("file for message {uid}: {issue}")))?;

        Ok(Download {
            filename: format!("{uid}.eml"),
            content_type: MESSAGE_CONTENT_TYPE,
            bytes,
        })
    }

    /// Store metadata of the open account.
    ///
    /// # Errors
    ///
    /// Returns an error if no account can be selected or the query fails.
    pub async fn system_info(&self) -> Result<SystemInfo> {
        self.engine.system_info().await
    }

    /// Sender addresses containing `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if no account can be selected or the query fails.
    pub async fn search_senders(&self, query: &str) -> Result<SenderMatches> {
        let senders = self.engine.search_senders(query, MAX_SENDER_RESULTS).await?;
        Ok(SenderMatches { senders })
    }
}

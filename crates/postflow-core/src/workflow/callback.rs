//! Inbound approval callbacks from the chat platform
//!
//! Authentication happens synchronously so the HTTP layer can reject forged
//! requests before acknowledging. Everything after that runs on a spawned task
//! once the acknowledgment has been sent.

use crate::auth::{AuthFailure, SignatureHeaders, WebhookAuthenticator};
use crate::error::{PostflowError, Result};
use super::approval_types::{ApprovalAction, MessageRef, UserId, WorkflowId};
use super::registry::PendingApprovalRegistry;
use super::traits::ApprovalNotifier;
use serde::Deserialize;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub const STALE_APPROVAL_TEXT: &str = "This approval is expired or already handled.";

/// A reviewer's decision as carried by a callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    pub workflow_id: WorkflowId,
    pub action: ApprovalAction,
    pub user: UserId,
    pub channel: Option<String>,
    pub message_ts: Option<String>,
}

/// What happened to an authenticated callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackResult {
    /// The pending round was resolved by this callback
    Resolved,
    /// Unknown or already resolved workflow id; the decider was told
    Stale,
    /// Nothing actionable in the payload
    Ignored,
}

#[derive(Debug, Deserialize)]
struct InteractionPayload {
    #[serde(default)]
    actions: Vec<ActionPayload>,
    user: Option<IdField>,
    channel: Option<IdField>,
    message: Option<MessageField>,
}

#[derive(Debug, Deserialize)]
struct ActionPayload {
    action_id: String,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdField {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageField {
    ts: String,
}

/// Parse a callback body into an interaction.
///
/// Accepts the form-encoded `payload=<json>` shape and a bare JSON body.
/// Returns `Ok(None)` when there is no approve/reject action to act on.
pub fn parse_interaction(raw_body: &[u8]) -> Result<Option<Interaction>> {
    let is_json = raw_body.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{');
    let payload: InteractionPayload = if is_json {
        serde_json::from_slice(raw_body)?
    } else {
        let json = url::form_urlencoded::parse(raw_body)
            .find(|(key, _)| key == "payload")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| PostflowError::Validation("callback body has no payload field".to_string()))?;
        serde_json::from_str(&json)?
    };

    let Some(action) = payload.actions.into_iter().next() else {
        log::debug!("Callback without actions ignored");
        return Ok(None);
    };

    let Some(kind) = ApprovalAction::from_action_id(&action.action_id) else {
        log::info!("Ignoring unknown action '{}'", action.action_id);
        return Ok(None);
    };

    let workflow_id = action
        .value
        .filter(|v| !v.is_empty())
        .map(WorkflowId::from_string)
        .ok_or_else(|| PostflowError::Validation("action carries no workflow id".to_string()))?;

    let user = payload
        .user
        .map(|u| UserId::new(u.id))
        .ok_or_else(|| PostflowError::Validation("callback carries no user".to_string()))?;

    Ok(Some(Interaction {
        workflow_id,
        action: kind,
        user,
        channel: payload.channel.map(|c| c.id),
        message_ts: payload.message.map(|m| m.ts),
    }))
}

/// Routes authenticated decisions to their pending approval round
pub struct CallbackRouter {
    authenticator: WebhookAuthenticator,
    registry: Arc<PendingApprovalRegistry>,
    notifier: Arc<dyn ApprovalNotifier>,
}

impl CallbackRouter {
    pub fn new(
        authenticator: WebhookAuthenticator,
        registry: Arc<PendingApprovalRegistry>,
        notifier: Arc<dyn ApprovalNotifier>,
    ) -> Self {
        Self {
            authenticator,
            registry,
            notifier,
        }
    }

    pub fn authenticate(&self, raw_body: &[u8], headers: &SignatureHeaders) -> std::result::Result<(), AuthFailure> {
        self.authenticator.verify(raw_body, headers).map_err(|e| {
            log::warn!("Rejected callback: {}", e);
            e
        })
    }

    /// Authenticate, then process the callback on a background task.
    ///
    /// An `Err` means the request must be answered with a client error. On
    /// `Ok` the caller acknowledges immediately; the returned handle is only
    /// needed by callers that want to observe the result.
    pub fn accept(
        self: &Arc<Self>,
        raw_body: Vec<u8>,
        headers: &SignatureHeaders,
    ) -> std::result::Result<JoinHandle<CallbackResult>, AuthFailure> {
        self.authenticate(&raw_body, headers)?;

        let router = Arc::clone(self);
        Ok(tokio::spawn(async move { router.handle_body(&raw_body).await }))
    }

    /// Parse and process an already authenticated body
    pub async fn handle_body(&self, raw_body: &[u8]) -> CallbackResult {
        match parse_interaction(raw_body) {
            Ok(Some(interaction)) => self.process(interaction).await,
            Ok(None) => CallbackResult::Ignored,
            Err(e) => {
                log::error!("Error handling approval callback: {}", e);
                CallbackResult::Ignored
            }
        }
    }

    /// Resolve the pending round; tell the decider when it no longer exists
    pub async fn process(&self, interaction: Interaction) -> CallbackResult {
        let Interaction {
            workflow_id,
            action,
            user,
            channel,
            message_ts,
        } = interaction;

        let decision = action.into_decision(user.clone());
        let summary = decision.summary();

        if !self.registry.resolve(&workflow_id, decision) {
            log::info!("Stale approval callback for {} from {}", workflow_id, user);
            if let Err(e) = self
                .notifier
                .notify_user(&user, channel.as_deref(), STALE_APPROVAL_TEXT)
                .await
            {
                log::warn!("Could not notify {} about stale approval: {}", user, e);
            }
            return CallbackResult::Stale;
        }

        match (channel, message_ts) {
            (Some(channel), Some(ts)) => {
                let message = MessageRef::new(channel, ts);
                if let Err(e) = self.notifier.update_message(&message, &summary).await {
                    // The decision is already committed
                    log::warn!("Could not update approval message: {}", e);
                }
            }
            _ => log::debug!("Callback for {} has no message reference to update", workflow_id),
        }

        CallbackResult::Resolved
    }
}

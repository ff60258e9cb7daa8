//! Collaborator traits for the approval workflow
//!
//! Every external system sits behind one of these narrow traits so the
//! orchestrator and callback router can be exercised with in-memory fakes.

use async_trait::async_trait;
use crate::error::Result;
use super::approval_types::{MessageRef, UserId, WorkflowId};
use postflow_types::{Campaign, Platform, Post, PublishStatus};

/// Source of the next campaign to run
#[async_trait]
pub trait CampaignSource: Send + Sync {
    async fn load(&self) -> Result<Campaign>;
}

/// Produces a post (text and optional image) for a campaign
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// `attempt` is zero-based; a higher attempt means earlier drafts were rejected
    async fn generate(&self, campaign: &Campaign, attempt: u32) -> Result<Post>;
}

/// Chat platform used for approval requests
#[async_trait]
pub trait ApprovalNotifier: Send + Sync {
    /// Post an approval request whose buttons carry `workflow_id`
    async fn request(&self, workflow_id: &WorkflowId, post: &Post, attempt: u32) -> Result<MessageRef>;

    /// Replace an approval request with the decision summary
    async fn update_message(&self, message: &MessageRef, summary: &str) -> Result<()>;

    /// Send a message only `user` can see
    async fn notify_user(&self, user: &UserId, channel: Option<&str>, text: &str) -> Result<()>;

    /// Post a message to the approval channel
    async fn post_summary(&self, text: &str) -> Result<()>;
}

/// Publishes an approved post to one platform
#[async_trait]
pub trait Publisher: Send + Sync {
    fn platform(&self) -> Platform;

    async fn publish(&self, post: &Post) -> Result<()>;
}

/// Records the result of a completed workflow
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, campaign: &Campaign, rejections: u32, results: &[PublishStatus]) -> Result<()>;
}

/// Out-of-band channel for failed workflows
#[async_trait]
pub trait FailureNotifier: Send + Sync {
    async fn notify(&self, subject: &str, detail: &str) -> Result<()>;
}

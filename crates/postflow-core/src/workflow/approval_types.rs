//! Strongly typed approval system types

use serde::{Deserialize, Serialize};
use std::fmt;
use chrono::{DateTime, Utc};
use postflow_types::{Post, PublishStatus, RunLog};

/// Identifies exactly one approval round. Minted fresh for every round.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowId(String);

impl WorkflowId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wrap an id received from the chat platform. The value is opaque and is
    /// only ever used as a lookup key, so no format is enforced.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for WorkflowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat platform user id of a decider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location of a posted chat message (channel + message timestamp)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel: String,
    pub ts: String,
}

impl MessageRef {
    pub fn new(channel: impl Into<String>, ts: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ts: ts.into(),
        }
    }
}

/// Button pressed by the reviewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalAction {
    Approve,
    Reject,
}

impl ApprovalAction {
    pub fn from_action_id(action_id: &str) -> Option<Self> {
        match action_id {
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }

    pub fn into_decision(self, decider: UserId) -> ApprovalDecision {
        match self {
            Self::Approve => ApprovalDecision::Approved { decider },
            Self::Reject => ApprovalDecision::Rejected { decider },
        }
    }
}

/// Outcome of one approval round. Produced exactly once per round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved { decider: UserId },
    Rejected { decider: UserId },
    TimedOut,
}

impl ApprovalDecision {
    /// Text shown in place of the original approval request
    pub fn summary(&self) -> String {
        match self {
            Self::Approved { decider } => format!("✅ Approved by <@{}>", decider),
            Self::Rejected { decider } => format!("❌ Rejected by <@{}> (attempt recorded)", decider),
            Self::TimedOut => "⌛ Approval timed out".to_string(),
        }
    }
}

/// Audit data kept alongside a pending round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalMetadata {
    pub attempt: u32,
    pub post_title: Option<String>,
}

impl ApprovalMetadata {
    pub fn new(attempt: u32) -> Self {
        Self { attempt, post_title: None }
    }

    pub fn with_post_title(mut self, title: impl Into<String>) -> Self {
        self.post_title = Some(title.into());
        self
    }
}

/// What a rejection does to the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectPolicy {
    /// Consume one attempt and regenerate content
    #[default]
    Regenerate,
    /// The first rejection ends the workflow
    Abort,
}

/// Loop state of one orchestrator run. Never shared.
#[derive(Debug, Clone)]
pub struct AttemptState {
    pub attempt: u32,
    pub max_attempts: u32,
    pub last_post: Option<Post>,
}

impl AttemptState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            last_post: None,
        }
    }

    pub fn has_remaining(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// 1-based attempt number for display
    pub fn display_attempt(&self) -> u32 {
        self.attempt + 1
    }
}

/// Terminal result of the approval loop
#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalOutcome {
    Approved { post: Post, decider: UserId, rejections: u32 },
    Exhausted { attempts: u32 },
    Aborted { decider: UserId, rejections: u32 },
    TimedOut { attempt: u32 },
}

/// Reason code for a failed workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    RetryExhausted,
    Rejected,
    TimedOut,
    GenerationFailed,
    NotifyFailed,
    Internal,
}

impl FailureReason {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::RetryExhausted => "❌ Post rejected after all attempts",
            Self::Rejected => "❌ Post rejected",
            Self::TimedOut => "❌ Approval timed out",
            Self::GenerationFailed => "❌ Content generation failed",
            Self::NotifyFailed => "❌ Approval request could not be sent",
            Self::Internal => "❌ Workflow failed",
        }
    }
}

/// Single terminal record of a workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowOutcome {
    Published {
        rejections: u32,
        results: Vec<PublishStatus>,
    },
    Failed {
        reason: FailureReason,
        detail: String,
    },
}

impl WorkflowOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }

    /// Published with at least one failed platform
    pub fn is_partial(&self) -> bool {
        match self {
            Self::Published { results, .. } => results.iter().any(|r| !r.success),
            Self::Failed { .. } => false,
        }
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Self::Failed { reason, .. } => Some(*reason),
            Self::Published { .. } => None,
        }
    }
}

/// Everything the caller of a workflow run gets back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub campaign_title: String,
    pub outcome: WorkflowOutcome,
    pub logs: RunLog,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

//! Postflow Core Library
//!
//! Approval-gated social publishing: content generation, human approval over
//! signed chat callbacks, and concurrent fan-out to the social platforms.

pub mod auth;
pub mod clients;
pub mod config;
pub mod error;
pub mod services;
pub mod workflow;

// Re-export main types for easy access
pub use config::PostflowConfig;
pub use error::{PostflowError, Result};

pub use auth::{AuthFailure, SignatureHeaders, WebhookAuthenticator};

pub use clients::{
    LinkedInPublisher,
    LogOnlyPublisher,
    OpenAIClient,
    SheetsClient,
    SlackClient,
    StaticCampaignSource,
    TelegramClient,
};

pub use services::PublishFanOut;

pub use workflow::{
    ApprovalDecision,
    ApprovalOutcome,
    ApprovalPolicy,
    CallbackResult,
    CallbackRouter,
    FailureReason,
    PendingApprovalRegistry,
    RejectPolicy,
    UserId,
    WorkflowId,
    WorkflowOrchestrator,
    WorkflowOutcome,
    WorkflowReport,
};

//! Approval workflow: pending registry, orchestrator and callback routing

pub mod approval_types;
pub mod callback;
pub mod orchestrator;
pub mod registry;
pub mod traits;

pub use approval_types::*;
pub use callback::{CallbackResult, CallbackRouter, Interaction};
pub use orchestrator::{ApprovalPolicy, WorkflowOrchestrator};
pub use registry::{PendingApprovalRegistry, PendingSummary, WaitHandle};
pub use traits::{
    ApprovalNotifier, AuditLog, CampaignSource, ContentGenerator, FailureNotifier, Publisher,
};

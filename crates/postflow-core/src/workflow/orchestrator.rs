//! Approval orchestrator: generate, request approval, wait, retry, publish

use super::approval_types::{
    ApprovalDecision, ApprovalMetadata, ApprovalOutcome, AttemptState, FailureReason,
    RejectPolicy, WorkflowId, WorkflowOutcome, WorkflowReport,
};
use super::registry::PendingApprovalRegistry;
use super::traits::{ApprovalNotifier, AuditLog, CampaignSource, ContentGenerator, FailureNotifier};
use crate::config::ApprovalConfig;
use crate::error::{PostflowError, Result};
use crate::services::PublishFanOut;
use chrono::Utc;
use postflow_types::{Campaign, Post, RunLog};
use std::sync::Arc;
use std::time::Duration;

/// Timing and retry rules for one workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub reject_policy: RejectPolicy,
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self::from(&ApprovalConfig::default())
    }
}

impl From<&ApprovalConfig> for ApprovalPolicy {
    fn from(config: &ApprovalConfig) -> Self {
        Self {
            timeout: config.timeout(),
            max_attempts: config.max_attempts,
            reject_policy: config.reject_policy,
        }
    }
}

/// Drives a campaign from generation through approval to publication
pub struct WorkflowOrchestrator {
    registry: Arc<PendingApprovalRegistry>,
    generator: Arc<dyn ContentGenerator>,
    notifier: Arc<dyn ApprovalNotifier>,
    fan_out: PublishFanOut,
    audit_log: Option<Arc<dyn AuditLog>>,
    failure_notifier: Option<Arc<dyn FailureNotifier>>,
    policy: ApprovalPolicy,
}

impl WorkflowOrchestrator {
    pub fn new(
        registry: Arc<PendingApprovalRegistry>,
        generator: Arc<dyn ContentGenerator>,
        notifier: Arc<dyn ApprovalNotifier>,
        fan_out: PublishFanOut,
        policy: ApprovalPolicy,
    ) -> Self {
        Self {
            registry,
            generator,
            notifier,
            fan_out,
            audit_log: None,
            failure_notifier: None,
            policy,
        }
    }

    pub fn with_audit_log(mut self, audit_log: Arc<dyn AuditLog>) -> Self {
        self.audit_log = Some(audit_log);
        self
    }

    pub fn with_failure_notifier(mut self, failure_notifier: Arc<dyn FailureNotifier>) -> Self {
        self.failure_notifier = Some(failure_notifier);
        self
    }

    pub fn policy(&self) -> &ApprovalPolicy {
        &self.policy
    }

    pub fn registry(&self) -> &Arc<PendingApprovalRegistry> {
        &self.registry
    }

    /// Load a campaign from `source` and run it
    pub async fn run_from_source(&self, source: &dyn CampaignSource) -> WorkflowReport {
        match source.load().await {
            Ok(campaign) => self.run(campaign).await,
            Err(e) => {
                let started_at = Utc::now();
                let mut logs = RunLog::new();
                logs.info("⚡ Workflow triggered...");
                log::error!("Failed to load campaign: {}", e);
                let outcome = self
                    .fail(FailureReason::Internal, format!("Failed to load campaign: {}", e), &mut logs)
                    .await;
                WorkflowReport {
                    campaign_title: String::new(),
                    outcome,
                    logs,
                    started_at,
                    finished_at: Utc::now(),
                }
            }
        }
    }

    /// Run one campaign to a terminal outcome. Every path produces exactly one
    /// outcome and one best-effort notification.
    pub async fn run(&self, campaign: Campaign) -> WorkflowReport {
        let started_at = Utc::now();
        let mut logs = RunLog::new();
        logs.info("⚡ Workflow triggered...");
        logs.success(format!("📄 Campaign loaded: {}", campaign.title));
        log::info!("Starting workflow for campaign '{}'", campaign.title);

        let outcome = match self.await_approval(&campaign, &mut logs).await {
            Ok(ApprovalOutcome::Approved { post, rejections, .. }) => {
                self.publish(&campaign, &post, rejections, &mut logs).await
            }
            Ok(ApprovalOutcome::Exhausted { attempts }) => {
                let detail = format!(
                    "Campaign \"{}\" was rejected after {} attempts.",
                    campaign.title, attempts
                );
                self.fail(FailureReason::RetryExhausted, detail, &mut logs).await
            }
            Ok(ApprovalOutcome::Aborted { decider, .. }) => {
                let detail = format!("Campaign \"{}\" was rejected by {}.", campaign.title, decider);
                self.fail(FailureReason::Rejected, detail, &mut logs).await
            }
            Ok(ApprovalOutcome::TimedOut { attempt }) => {
                let detail = format!(
                    "Campaign \"{}\" timed out waiting for approval (attempt {}).",
                    campaign.title, attempt
                );
                self.fail(FailureReason::TimedOut, detail, &mut logs).await
            }
            Err(e) => {
                let reason = match &e {
                    PostflowError::Generation(_) => FailureReason::GenerationFailed,
                    PostflowError::Notify(_) => FailureReason::NotifyFailed,
                    _ => FailureReason::Internal,
                };
                self.fail(reason, format!("Workflow failed: {}", e), &mut logs).await
            }
        };

        WorkflowReport {
            campaign_title: campaign.title,
            outcome,
            logs,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// The bounded generate → request → wait loop.
    ///
    /// Generation and notification failures are returned as errors; every
    /// decision-driven ending is an `ApprovalOutcome`.
    pub async fn await_approval(&self, campaign: &Campaign, logs: &mut RunLog) -> Result<ApprovalOutcome> {
        // Only a rejection starts another round, so `attempt` is also the rejection count
        let mut state = AttemptState::new(self.policy.max_attempts);

        while state.has_remaining() {
            let post = self.generate(campaign, state.attempt).await?;
            logs.info(format!("🤖 Generated post (attempt {})", state.display_attempt()));
            if let Some(image_url) = &post.image_url {
                logs.info(format!("🖼️ Generated image: {}", image_url));
            }
            state.last_post = Some(post.clone());

            let workflow_id = WorkflowId::new();
            let metadata = ApprovalMetadata::new(state.attempt).with_post_title(&post.title);
            let handle = self.registry.register(workflow_id.clone(), metadata)?;

            if let Err(e) = self.notifier.request(&workflow_id, &post, state.attempt).await {
                // Nobody will ever answer this round; drop the entry now
                self.registry.expire(&workflow_id);
                log::error!("Approval request {} could not be sent: {}", workflow_id, e);
                return Err(PostflowError::Notify(e.to_string()));
            }
            logs.info(format!("🔔 Approval request sent (workflow_id={})", workflow_id));
            log::info!(
                "Waiting up to {:?} for approval {} (attempt {}/{})",
                self.policy.timeout,
                workflow_id,
                state.display_attempt(),
                state.max_attempts
            );

            match handle.wait(self.policy.timeout).await {
                ApprovalDecision::Approved { decider } => {
                    logs.success(format!("✅ Approved by {}", decider));
                    return Ok(ApprovalOutcome::Approved {
                        post,
                        decider,
                        rejections: state.attempt,
                    });
                }
                ApprovalDecision::Rejected { decider } => {
                    logs.warning(format!(
                        "↩️ Rejected by {} (attempt {})",
                        decider,
                        state.display_attempt()
                    ));
                    state.attempt += 1;
                    if self.policy.reject_policy == RejectPolicy::Abort {
                        return Ok(ApprovalOutcome::Aborted {
                            decider,
                            rejections: state.attempt,
                        });
                    }
                }
                ApprovalDecision::TimedOut => {
                    logs.error("⌛ Approval timed out");
                    return Ok(ApprovalOutcome::TimedOut { attempt: state.display_attempt() });
                }
            }
        }

        logs.error(format!("❌ Rejected after {} attempts", state.attempt));
        Ok(ApprovalOutcome::Exhausted { attempts: state.attempt })
    }

    async fn generate(&self, campaign: &Campaign, attempt: u32) -> Result<Post> {
        self.generator
            .generate(campaign, attempt)
            .await
            .map_err(|e| match e {
                PostflowError::Generation(_) => e,
                other => PostflowError::Generation(other.to_string()),
            })
    }

    async fn publish(&self, campaign: &Campaign, post: &Post, rejections: u32, logs: &mut RunLog) -> WorkflowOutcome {
        let results = self.fan_out.publish(post).await;

        for status in &results {
            match &status.error {
                None => logs.success(format!("✅ {}", status.platform)),
                Some(error) => logs.error(format!("❌ {}: {}", status.platform, error)),
            }
        }

        if let Some(audit_log) = &self.audit_log {
            if let Err(e) = audit_log.record(campaign, rejections, &results).await {
                log::error!("Failed to record audit row for '{}': {}", campaign.title, e);
                logs.warning("⚠️ Audit log could not be written");
            }
        }

        let summary = format!(
            "✅ Workflow completed for \"{}\". Results: {}",
            campaign.title,
            results.iter().map(|r| r.short()).collect::<Vec<_>>().join(", ")
        );
        match self.notifier.post_summary(&summary).await {
            Ok(()) => logs.success("✅ Final summary sent"),
            Err(e) => log::warn!("Failed to post workflow summary: {}", e),
        }

        WorkflowOutcome::Published { rejections, results }
    }

    async fn fail(&self, reason: FailureReason, detail: String, logs: &mut RunLog) -> WorkflowOutcome {
        logs.error(detail.clone());
        log::error!("Workflow ended with {:?}: {}", reason, detail);

        match &self.failure_notifier {
            Some(notifier) => {
                if let Err(e) = notifier.notify(reason.subject(), &detail).await {
                    log::error!("Failed to send failure notification: {}", e);
                }
            }
            None => log::warn!("No failure notifier configured; '{}' not delivered", reason.subject()),
        }

        WorkflowOutcome::Failed { reason, detail }
    }
}

//! Postflow server executable
//!
//! Serves the approval callback endpoint and runs campaigns through
//! generation, human approval and publishing.

mod http;

use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use postflow_core::{
    clients::{
        LinkedInPublisher, LogOnlyPublisher, OpenAIClient, SheetsClient, SlackClient,
        StaticCampaignSource, TelegramClient,
    },
    workflow::{ApprovalPolicy, CallbackRouter, CampaignSource, PendingApprovalRegistry, Publisher, WorkflowOrchestrator},
    PostflowConfig, PublishFanOut, WebhookAuthenticator,
};
use postflow_types::Platform;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with INFO as default if RUST_LOG not set
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let matches = Command::new("postflow-server")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Approval-gated social media publishing")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Configuration file path")
                .env("POSTFLOW_CONFIG")
                .default_value("config/postflow.json")
        )
        .arg(
            Arg::new("bind")
                .long("bind")
                .value_name("ADDR")
                .help("Listen address, overrides server.bind_addr")
        )
        .arg(
            Arg::new("run-once")
                .long("run-once")
                .help("Run one workflow, print its report and exit")
                .action(ArgAction::SetTrue)
        )
        .get_matches();

    let config_path = matches
        .get_one::<String>("config")
        .context("missing --config value")?;
    let config = PostflowConfig::from_file(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;
    log::info!("Loaded configuration from {}", config_path);

    let bind_addr = matches
        .get_one::<String>("bind")
        .cloned()
        .unwrap_or_else(|| config.server.bind_addr.clone());

    let state = build_state(&config)?;
    log::info!("Initialized all services and orchestrator");

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    log::info!("Postflow server listening on {}", bind_addr);

    let app = http::create_router(state.clone());

    if matches.get_flag("run-once") {
        // Callbacks still need the listener while the run waits for approval
        let server = tokio::spawn(async move { axum::serve(listener, app).await });

        let report = state.orchestrator.run_from_source(state.campaigns.as_ref()).await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        server.abort();

        if !report.outcome.is_published() {
            anyhow::bail!("Workflow did not publish: {:?}", report.outcome.failure_reason());
        }
        return Ok(());
    }

    let registry = state.registry.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Suspended runs finish as timed out instead of holding the shutdown
            let expired = registry.expire_all();
            if expired > 0 {
                log::warn!("Expired {} pending approvals on shutdown", expired);
            }
        })
        .await
        .context("HTTP server failed")?;

    log::info!("Postflow server stopped");
    Ok(())
}

/// Wire clients, registry and orchestrator from configuration
fn build_state(config: &PostflowConfig) -> anyhow::Result<http::AppState> {
    let registry = Arc::new(PendingApprovalRegistry::new());

    let slack = Arc::new(SlackClient::new(config.slack.clone())?);
    let generator = Arc::new(OpenAIClient::new(config.openai.clone())?);

    let linkedin: Arc<dyn Publisher> = match &config.linkedin {
        Some(linkedin) => Arc::new(LinkedInPublisher::new(linkedin.clone())?),
        None => {
            log::warn!("No LinkedIn credentials configured, LinkedIn posts will only be logged");
            Arc::new(LogOnlyPublisher::new(Platform::LinkedIn))
        }
    };
    let mut publishers = vec![linkedin];
    for platform in [Platform::Facebook, Platform::Instagram, Platform::Twitter] {
        publishers.push(Arc::new(LogOnlyPublisher::new(platform)));
    }

    let fan_out = PublishFanOut::new(publishers);
    log::info!("Publishing to {:?}", fan_out.platforms());

    let mut orchestrator = WorkflowOrchestrator::new(
        registry.clone(),
        generator,
        slack.clone(),
        fan_out,
        ApprovalPolicy::from(&config.approval),
    );

    let campaigns: Arc<dyn CampaignSource> = match &config.sheets {
        Some(sheets) => {
            let sheets = Arc::new(SheetsClient::new(sheets.clone())?);
            orchestrator = orchestrator.with_audit_log(sheets.clone());
            sheets
        }
        None => {
            log::warn!("No Sheets configuration, using the built-in sample campaign");
            Arc::new(StaticCampaignSource::default())
        }
    };

    match &config.telegram {
        Some(telegram) => {
            orchestrator = orchestrator.with_failure_notifier(Arc::new(TelegramClient::new(telegram.clone())?));
        }
        None => log::warn!("No Telegram configuration, failure notifications are disabled"),
    }

    let callbacks = CallbackRouter::new(
        WebhookAuthenticator::new(&config.slack.signing_secret, config.approval.replay_window()),
        registry,
        slack,
    );

    Ok(http::AppState::new(
        Arc::new(callbacks),
        Arc::new(orchestrator),
        campaigns,
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => log::info!("Received terminate signal, initiating graceful shutdown"),
    }
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use triage_agents::audit::SessionSummary;
use triage_agents::config::check_endpoint;
use triage_agents::{
    ActionDispatcher, AuditRecorder, ClassificationEngine, JsonFileAlertSource, JsonlFileSink,
    ModelClient, RigModelClient, RunReport, SimulatedEffector, TriageConfig, TriagePipeline,
    WebhookTicketingClient,
};

const DEMO_ALERTS: &str = "data/demo_alerts.json";

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Triage the bundled demo alerts with the rule classifier only
    #[arg(long, default_value_t = false)]
    demo: bool,

    /// JSON file with the alerts to triage (required outside demo mode)
    #[arg(long)]
    alerts: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Audit log path (overrides TRIAGE_LOG_FILE)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Maximum alerts to process (overrides TRIAGE_ALERT_LIMIT)
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => TriageConfig::from_toml_file(path)?,
        None => TriageConfig::default(),
    };
    if let Some(path) = &args.log_file {
        config.audit_log = path.clone();
    }
    if let Some(limit) = args.limit {
        config.alert_limit = limit;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    config
        .validate(args.demo)
        .context("Invalid configuration")?;

    let alerts_path = match (&args.alerts, args.demo) {
        (Some(path), _) => path.clone(),
        (None, true) => PathBuf::from(DEMO_ALERTS),
        (None, false) => bail!("--alerts <file> is required outside demo mode"),
    };

    info!(
        demo = args.demo,
        alerts = %alerts_path.display(),
        audit_log = %config.audit_log.display(),
        limit = config.alert_limit,
        "Alert triage starting"
    );

    let model: Option<Arc<dyn ModelClient>> = if args.demo {
        info!("Demo mode: rule classifier only");
        None
    } else {
        let rig_client = RigModelClient::from_config(&config.model)?;
        if check_endpoint(&config.model.base_url).await {
            info!(url = %config.model.base_url, model = %rig_client.model(), "Model endpoint reachable");
        } else {
            warn!(url = %config.model.base_url, "Model endpoint not reachable, rule fallback will be used on failure");
        }
        let client: Arc<dyn ModelClient> = Arc::new(rig_client);
        Some(client)
    };

    let ticketing = WebhookTicketingClient::new(&config.ticketing)?;
    info!(url = %ticketing.url(), timeout_secs = config.ticketing.timeout_secs, "Ticketing webhook configured");
    let dispatcher = ActionDispatcher::new(
        Arc::new(ticketing),
        Arc::new(SimulatedEffector::from_config(&config.effectors)),
    );
    let sink = JsonlFileSink::new(&config.audit_log);
    info!(path = %sink.path().display(), "Audit trail opened for append");
    let recorder = AuditRecorder::new(Arc::new(sink));

    let alert_delay = if args.demo {
        Duration::from_millis(config.demo_alert_delay_ms)
    } else {
        Duration::ZERO
    };
    let engine = ClassificationEngine::new(model);
    info!(model_enabled = engine.has_model(), "Classification engine ready");
    let mut pipeline = TriagePipeline::new(engine, dispatcher, recorder)
        .with_alert_delay(alert_delay);

    let cancel = pipeline.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing the current alert");
            cancel.cancel();
        }
    });

    let source = JsonFileAlertSource::new(alerts_path);
    let report = pipeline.run_session(&source, config.alert_limit).await?;

    let recorder = pipeline.recorder();
    print_report(&report, recorder.stats().started_at(), recorder.summarize());
    Ok(())
}

fn print_report(report: &RunReport, started_at: DateTime<Utc>, fallback: SessionSummary) {
    let summary = report.summary.clone().unwrap_or(fallback);

    println!();
    println!("Triage session summary");
    println!("  Started: {}", started_at.to_rfc3339());
    println!("  Alerts processed: {}", summary.total_alerts_processed);
    println!("  Session duration: {:.2}s", summary.session_duration_seconds);
    println!("  Errors: {}", summary.errors_encountered);
    if report.cancelled {
        println!("  Stopped early: {} of the batch attempted", report.attempted);
    }
    println!("  Actions:");
    for (action, count) in &summary.actions_breakdown {
        println!("    {action}: {count}");
    }
    let savings = &summary.time_savings;
    println!(
        "  Time saved: {} min ({} s at {} s per alert)",
        savings.total_saved_minutes, savings.total_saved_seconds, savings.per_alert_seconds
    );
    println!(
        "  Daily projection: {} min",
        savings.daily_projection_minutes
    );
}

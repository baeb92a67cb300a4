// src/lib.rs

pub mod announce;
pub mod bus;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod pipeline;
pub mod types;

use std::sync::Arc;

use anyhow::anyhow;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::announce::{ConsoleNotifier, Notifier};
use crate::bus::CompletionBus;
use crate::cli::CliArgs;
use crate::config::{load_or_reference, ConfigFile};
use crate::coordinator::Coordinator;
use crate::errors::{Result, StagelineError};
use crate::pipeline::{ConnectivityProbe, FixedConnectivity, Pipeline, PipelineReport, TcpProbe};
use crate::types::WorkToken;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - announcer services and the coordinator
/// - pipeline submission
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_reference(args.config.as_deref())?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier::new(!args.deny_notifications));
    if args.deny_notifications {
        info!("notifications denied; only toasts will be shown");
    }

    let bus = CompletionBus::new();
    let shutdown = CancellationToken::new();
    let coordinator = Coordinator::from_config(&cfg, Arc::clone(&notifier), bus.clone(), &shutdown);

    let probe: Box<dyn ConnectivityProbe> = if args.offline {
        Box::new(FixedConnectivity(false))
    } else {
        Box::new(TcpProbe::new(
            cfg.settings.network_probe.clone(),
            cfg.settings.probe_timeout,
        ))
    };

    let handle = Pipeline::from_config(&cfg).submit(probe.as_ref()).await?;
    coordinator.attach(&handle, &cfg.stages)?;

    // Ctrl-C → cancel the pipeline and every announcer.
    let ctrl_c = {
        let pipeline_cancel = handle.cancellation();
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("Ctrl-C received; cancelling");
            pipeline_cancel.cancel();
            coordinator.shutdown();
        })
    };

    let report = handle.join().await?;
    debug!("pipeline joined; waiting for announcers");
    coordinator.wait_idle().await;
    ctrl_c.abort();

    print_report(&report, bus.latest());

    if report.cancelled || report.succeeded() {
        return Ok(());
    }

    let failed = report
        .first_failure()
        .map(|u| u.name.clone())
        .unwrap_or_default();
    Err(StagelineError::Other(anyhow!("stage '{failed}' failed")))
}

fn print_report(report: &PipelineReport, last_completed: Option<WorkToken>) {
    println!();
    println!("stageline summary");
    for unit in &report.units {
        println!("  {} ({}): {}", unit.name, unit.token, unit.state);
    }
    if report.cancelled {
        println!("  run was cancelled");
    }
    match last_completed {
        Some(token) => println!("  last announced: {token}"),
        None => println!("  last announced: -"),
    }
}

/// Simple dry-run output: print settings, channels and stages.
fn print_dry_run(cfg: &ConfigFile) {
    let s = &cfg.settings;
    println!("stageline dry-run");
    println!("  config.task_duration = {:?}", s.task_duration);
    println!("  config.tick_interval = {:?}", s.tick_interval);
    println!("  config.require_network = {}", s.require_network);
    if s.require_network {
        println!("  config.network_probe = {} (timeout {:?})", s.network_probe, s.probe_timeout);
    }
    println!();

    println!("channels ({}):", cfg.channels.len());
    for (name, channel) in cfg.channels.iter() {
        println!("  - {name}");
        if let Some(ref primary) = channel.primary_token {
            println!("      primary_token: {primary}");
        }
        if !channel.notif_ids.is_empty() {
            println!("      notif_ids: {:?}", channel.notif_ids);
        }
        if channel.terminal {
            println!("      terminal: true");
        }
    }
    println!();

    println!("stages ({}):", cfg.stages.len());
    for (index, stage) in cfg.stages.iter().enumerate() {
        println!("  {index}. {} (token {})", stage.name, stage.token);
        println!("      duration: {:?}", stage.duration);
        if stage.output != "{token}" {
            println!("      output: {}", stage.output);
        }
        if stage.require_network {
            println!("      require_network: true");
        }
        if let Some(ref channel) = stage.announce {
            println!("      announce: {channel}");
        }
    }

    debug!("dry-run complete (no execution)");
}

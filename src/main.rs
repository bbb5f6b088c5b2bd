// SPDX-License-Identifier: EUPL-1.2-or-later
// Copyright © 2026-present Steer Contributors

use clap::Parser;
use serde::Serialize;
use steer::{
    CliArgs, FailoverReport, ForwardOutcome, NodeConfig, QosReport, RouteSnapshot, Scenario,
    StatsSnapshot, SteerError, run_failover, run_qos,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Serialize)]
struct Report {
    node: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    failover: Option<FailoverReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    qos: Option<QosReport>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();
    if let Err(e) = run(args).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: CliArgs) -> Result<(), SteerError> {
    tracing::info!("steer v{}", env!("CARGO_PKG_VERSION"));

    let config = NodeConfig::from_cli(&args)?;
    let table = config.routing_table()?;

    if let Some(path) = &args.save_routes {
        RouteSnapshot::from_table(&table).save_to_file(path)?;
    }

    if !args.json {
        config.print_summary();
        println!("=== Routing Table ({}) ===", config.node.name);
        println!("{}", table);
    }

    let failover = match args.scenario {
        Scenario::Failover | Scenario::All => Some(run_failover(&config).await?),
        Scenario::Qos => None,
    };
    let qos = match args.scenario {
        Scenario::Qos | Scenario::All => Some(run_qos(&config).await?),
        Scenario::Failover => None,
    };

    let report = Report {
        node: config.node.name.clone(),
        failover,
        qos,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if let Some(failover) = &report.failover {
        print_failover(failover);
    }
    if let Some(qos) = &report.qos {
        print_qos(qos);
    }
    Ok(())
}

fn print_failover(report: &FailoverReport) {
    println!("=== Failover ===");
    for probe in &report.probes {
        let path = match &probe.outcome {
            ForwardOutcome::Queued {
                interface,
                next_hop,
                band,
            } => format!("via {} dev {} (band {})", next_hop, interface, band),
            ForwardOutcome::Dropped { interface, band } => {
                format!("dropped on {} (band {})", interface, band)
            }
            ForwardOutcome::Unroutable => "unroutable".to_string(),
        };
        println!(
            "t={:>5.1}s  {:<8} #{:<4} {}",
            probe.at_ms as f64 / 1000.0,
            probe.profile,
            probe.sequence,
            path
        );
    }
    println!();
    print_stats(&report.stats);
}

fn print_qos(report: &QosReport) {
    println!("=== QoS ({} ms) ===", report.duration_ms);
    println!(
        "{:<8} {:>5} {:>8} {:>8} {:>8} {:>12} {:>10}",
        "Flow", "DSCP", "Offered", "Dropped", "Sent", "Goodput", "Delay"
    );
    for flow in &report.flows {
        println!(
            "{:<8} {:>5} {:>8} {:>8} {:>8} {:>8.0} kbps {:>7.1} ms",
            flow.name,
            flow.marking,
            flow.offered,
            flow.dropped + flow.unroutable,
            flow.delivered,
            flow.goodput_bps(report.duration_ms) / 1000.0,
            flow.mean_delay_ms
        );
    }
    println!();
    print_stats(&report.stats);
}

fn print_stats(stats: &StatsSnapshot) {
    println!(
        "Forwarded: {}  Default-routed: {}  Unroutable: {}  Dropped: {}",
        stats.forwarded,
        stats.default_routed,
        stats.unroutable,
        stats.total_dropped()
    );
    if let Some(selector) = &stats.selector {
        println!(
            "Selector: {} policy, {} metric, {} fallback",
            selector.policy_hits, selector.failover_hits, selector.fallbacks
        );
    }
    for (interface, scheduler) in &stats.schedulers {
        println!(
            "  {:<4} queued {:<4} bands {:?}  sent {}  dropped {} ({} bytes)",
            interface,
            scheduler.queued,
            scheduler.band_occupancy,
            scheduler.dequeued,
            scheduler.dropped,
            scheduler.dropped_bytes
        );
    }
    println!();
}

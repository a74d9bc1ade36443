// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command implementations: adapter wiring and the recurring-timer loop.
//!
//! Wires the SQLite store, Anthropic reply generator, optional PMS channel,
//! and WebDriver transport into a [`SyncEngine`], mirroring the
//! configuration the pass expects.

use std::sync::Arc;
use std::time::Duration;

use staysync_automation::{MemoryCredentialStore, WebDriverSessionProvider};
use staysync_config::StaysyncConfig;
use staysync_core::SyncError;
use staysync_core::types::SyncReport;
use staysync_engine::SyncEngine;
use staysync_pms::PmsChannel;
use staysync_reply::AnthropicReplyGenerator;
use staysync_storage::SqliteStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber, honoring `RUST_LOG` when set.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Build the engine with all configured adapters over an initialized store.
async fn build_engine(config: &StaysyncConfig) -> Result<SyncEngine, SyncError> {
    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;

    let reply = Arc::new(AnthropicReplyGenerator::new(&config.reply)?);

    let pms = if config.pms.enabled {
        Some(Arc::new(PmsChannel::new(&config.pms)?) as Arc<dyn staysync_core::PmsApi>)
    } else {
        None
    };

    let browser = Arc::new(WebDriverSessionProvider::new(
        config.automation.clone(),
        Arc::new(MemoryCredentialStore::new()),
    ));

    Ok(SyncEngine::new(store, reply, pms, browser))
}

/// `staysync sync --host <id>`: one pass, report printed to stdout.
pub async fn run_sync(config: &StaysyncConfig, host_id: &str) -> Result<(), SyncError> {
    let engine = build_engine(config).await?;
    let report = engine.sync_host(host_id).await;
    print_report(&report);
    Ok(())
}

/// `staysync run`: recurring passes for all registered hosts until ctrl-c.
///
/// Overlapping ticks are safe: a host with a pass still in flight reports
/// immediately instead of double-running.
pub async fn run_timer(config: &StaysyncConfig) -> Result<(), SyncError> {
    let engine = build_engine(config).await?;
    let mut interval = tokio::time::interval(Duration::from_secs(config.sync.interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(
        interval_secs = config.sync.interval_secs,
        "recurring synchronization started"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let reports = engine.sync_all_hosts().await;
                for report in &reports {
                    if report.errors.is_empty() {
                        info!(
                            host_id = report.host_id.as_str(),
                            replies = report.replies_sent,
                            "pass finished"
                        );
                    } else {
                        warn!(
                            host_id = report.host_id.as_str(),
                            errors = report.errors.len(),
                            "pass finished with errors"
                        );
                    }
                    print_report(report);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }
    Ok(())
}

/// `staysync send-test`: diagnostic send bypassing reply generation.
pub async fn run_send_test(
    config: &StaysyncConfig,
    conversation_id: &str,
    text: &str,
) -> Result<(), SyncError> {
    let engine = build_engine(config).await?;
    let outcome = engine.send_test_reply(conversation_id, text).await;
    match (outcome.delivered, outcome.channel_used) {
        (true, Some(channel)) => println!("delivered via {channel}"),
        _ => println!(
            "not delivered: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        ),
    }
    Ok(())
}

/// `staysync config`: print the merged configuration.
pub fn show_config(config: &StaysyncConfig) -> Result<(), SyncError> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| SyncError::Internal(format!("cannot render config: {e}")))?;
    println!("{rendered}");
    Ok(())
}

fn print_report(report: &SyncReport) {
    println!(
        "host {}: listings={} conversations={} messages={} replies={}",
        report.host_id,
        report.listings_found,
        report.conversations_found,
        report.messages_processed,
        report.replies_sent,
    );
    for error in &report.errors {
        println!("  error: {error}");
    }
}

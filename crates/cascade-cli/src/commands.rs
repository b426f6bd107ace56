//! CLI command implementations

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use cascade_core::binding::{BindingEvent, EventSink, HlsBinding, MediaBinding};
use cascade_core::{
    next_fallback, select_initial, HttpBindingFactory, PlayerConfig, PlayerEvent, PlayerSession,
    SourceKind, SourceSet,
};

use crate::output;

fn build_sources(
    hls: Option<String>,
    embed: Option<String>,
    direct: Option<String>,
) -> anyhow::Result<SourceSet> {
    let mut sources = SourceSet::new();
    if let Some(u) = hls {
        sources = sources.with_hls(Url::parse(&u)?);
    }
    if let Some(u) = embed {
        sources = sources.with_embed(Url::parse(&u)?);
    }
    if let Some(u) = direct {
        sources = sources.with_direct(Url::parse(&u)?);
    }
    Ok(sources)
}

#[derive(Serialize)]
struct PlanReport {
    provider: String,
    order: Vec<String>,
    unplayable: Option<String>,
}

/// Show the selection and fallback order for a source set
pub fn plan(
    hls: Option<String>,
    embed: Option<String>,
    direct: Option<String>,
    format: &str,
) -> anyhow::Result<()> {
    let sources = build_sources(hls, embed, direct)?;

    let report = match select_initial(&sources) {
        Ok(initial) => {
            // Walk the fallback graph the way the session would.
            let mut order = vec![initial];
            let mut failed = HashSet::new();
            let mut from = initial;
            while let Some(next) = next_fallback(&sources, &failed, from) {
                failed.insert(from);
                order.push(next);
                from = next;
            }
            PlanReport {
                provider: sources.provider().to_string(),
                order: order.iter().map(SourceKind::to_string).collect(),
                unplayable: None,
            }
        }
        Err(e) => PlanReport {
            provider: sources.provider().to_string(),
            order: Vec::new(),
            unplayable: Some(e.to_string()),
        },
    };

    if output::is_json(format) {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Provider: {}", report.provider);
    match &report.unplayable {
        Some(reason) => println!("Unplayable: {}", reason),
        None => {
            println!("Attempt order:");
            for (i, kind) in report.order.iter().enumerate() {
                println!("  {}. {}", i + 1, kind);
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ProbeReport {
    url: String,
    live: bool,
    duration: Option<f64>,
    levels: Vec<ProbeLevel>,
}

#[derive(Serialize)]
struct ProbeLevel {
    label: String,
    height: u32,
    bandwidth: u64,
}

/// Fetch an HLS manifest and report its quality ladder
pub async fn probe(manifest_url: &str, timeout: u64, format: &str) -> anyhow::Result<()> {
    let url = Url::parse(manifest_url)?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout))
        .build()?;

    // Drive the HLS binding directly and capture its ready event.
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut binding = HlsBinding::new(url.clone(), client, EventSink::new(0, tx));
    binding.load().await?;

    let (duration, qualities) = match rx.try_recv() {
        Ok(envelope) => match envelope.event {
            BindingEvent::Ready {
                duration,
                qualities,
            } => (duration, qualities),
            other => anyhow::bail!("unexpected binding event: {:?}", other),
        },
        Err(_) => anyhow::bail!("manifest load produced no metadata"),
    };
    binding.teardown().await;

    let report = ProbeReport {
        url: url.to_string(),
        live: duration.is_none(),
        duration,
        levels: qualities
            .iter()
            .filter(|q| !q.is_auto())
            .map(|q| ProbeLevel {
                label: q.label.clone(),
                height: q.height,
                bandwidth: q.bandwidth,
            })
            .collect(),
    };

    if output::is_json(format) {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Manifest: {}", report.url);
    println!("  Live: {}", report.live);
    match report.duration {
        Some(d) => println!("  Duration: {:.1}s", d),
        None => println!("  Duration: unknown"),
    }
    println!("  Levels: {}", report.levels.len());
    for (i, level) in report.levels.iter().enumerate() {
        println!(
            "  {}. {} - {}bps",
            i + 1,
            level.label,
            level.bandwidth
        );
    }
    Ok(())
}

/// Run a headless playback session, printing events as they arrive
pub async fn run(
    hls: Option<String>,
    direct: Option<String>,
    start: Option<f64>,
    timeout: u64,
    format: &str,
) -> anyhow::Result<()> {
    let mut sources = build_sources(hls, None, direct)?;
    if let Some(seconds) = start {
        sources = sources.with_start_time(seconds);
    }

    let config = PlayerConfig::default();
    let factory = Box::new(HttpBindingFactory::new(&config)?);
    let (session, mut events) = PlayerSession::mount(sources, config, factory).await?;

    println!("Session {} mounted", session.id());

    let deadline = (timeout > 0).then(|| tokio::time::Instant::now() + Duration::from_secs(timeout));
    let mut exit_code = 0;

    loop {
        let event = match deadline {
            Some(deadline) => {
                match tokio::time::timeout_at(deadline, events.recv()).await {
                    Ok(event) => event,
                    Err(_) => {
                        println!("Timeout reached, unmounting");
                        break;
                    }
                }
            }
            None => events.recv().await,
        };

        let Some(event) = event else { break };
        output::print_event(&event, format);

        match event {
            PlayerEvent::Ended => break,
            PlayerEvent::Error => {
                exit_code = 1;
                break;
            }
            _ => {}
        }
    }

    session.unmount().await;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

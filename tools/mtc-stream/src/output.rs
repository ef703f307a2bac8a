// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Document and event printing.

use colored::*;
use mtconnect::client::{ClientEvent, ClientStatsSnapshot};
use mtconnect::model::{
    AssetsDocument, Category, Component, ConditionLevel, DataItem, DevicesDocument,
    ErrorDocument, Observation, StreamsDocument,
};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    Pretty,
    Json,
    Compact,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "p" => Ok(OutputFormat::Pretty),
            "json" | "j" => Ok(OutputFormat::Json),
            "compact" | "c" => Ok(OutputFormat::Compact),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// One JSON document per line.
fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{}", line),
        Err(e) => eprintln!("{}: {}", "JSON encoding failed".red(), e),
    }
}

// ============================================================================
// Probe
// ============================================================================

pub fn print_devices(doc: &DevicesDocument, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(doc),
        OutputFormat::Compact => {
            for device in &doc.devices {
                for item in device.data_items() {
                    println!("{}\t{}", device.name, compact_data_item(item));
                }
            }
        }
        OutputFormat::Pretty => {
            println!(
                "{} instance={} version={} buffer={}",
                "Agent".bold(),
                doc.header.instance_id,
                doc.header.version,
                doc.header.buffer_size
            );
            for device in &doc.devices {
                println!();
                println!(
                    "{} {} {}",
                    "Device".green().bold(),
                    device.name.cyan(),
                    format!("(id={}, uuid={})", device.id, device.uuid).dimmed()
                );
                if let Some(desc) = &device.description {
                    let maker = desc.manufacturer.as_deref().unwrap_or("-");
                    let model = desc.model.as_deref().unwrap_or("-");
                    println!("  {} {} {}", "manufacturer:".dimmed(), maker, model);
                }
                print_data_items(&device.data_items, 1);
                for component in &device.components {
                    print_component(component, 1);
                }
            }
        }
    }
}

fn print_component(component: &Component, depth: usize) {
    let indent = "  ".repeat(depth);
    let label = component.name.as_deref().unwrap_or(&component.id);
    println!(
        "{}{} {} {}",
        indent,
        component.kind.yellow(),
        label,
        format!("(id={})", component.id).dimmed()
    );
    print_data_items(&component.data_items, depth + 1);
    for child in &component.components {
        print_component(child, depth + 1);
    }
}

fn print_data_items(items: &[DataItem], depth: usize) {
    let indent = "  ".repeat(depth);
    for item in items {
        let mut line = format!("{}- {} {}", indent, item.display_name(), item.data_item_type);
        if let Some(sub_type) = &item.sub_type {
            line.push_str(&format!(":{}", sub_type));
        }
        if let Some(units) = &item.units {
            line.push_str(&format!(" [{}]", units));
        }
        println!("{} {}", line, format!("{}", item.category).dimmed());
    }
}

fn compact_data_item(item: &DataItem) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        item.id,
        item.category,
        item.data_item_type,
        item.units.as_deref().unwrap_or("-")
    )
}

// ============================================================================
// Streams
// ============================================================================

pub fn print_streams(doc: &StreamsDocument, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(doc),
        OutputFormat::Compact => {
            for device in &doc.streams {
                for obs in device.observations() {
                    println!("{}", compact_observation(&device.name, obs));
                }
            }
        }
        OutputFormat::Pretty => {
            println!(
                "{} instance={} next={} {}",
                "Streams".bold(),
                doc.header.instance_id,
                doc.header
                    .next_sequence
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".into()),
                format!("({} observations)", doc.observation_count()).dimmed()
            );
            for device in &doc.streams {
                for component in &device.component_streams {
                    if component.observations.is_empty() {
                        continue;
                    }
                    println!(
                        "  {} {}",
                        device.name.cyan(),
                        component.name.as_deref().unwrap_or(&component.component_id)
                    );
                    for obs in &component.observations {
                        println!("    {}", pretty_observation(obs));
                    }
                }
            }
        }
    }
}

fn pretty_observation(obs: &Observation) -> String {
    let value = obs.value.to_string();
    let value = match (&obs.condition, obs.is_condition()) {
        (Some(cond), true) => {
            let level = match cond.level {
                ConditionLevel::Normal => cond.level.to_string().green(),
                ConditionLevel::Warning => cond.level.to_string().yellow(),
                ConditionLevel::Fault => cond.level.to_string().red().bold(),
                ConditionLevel::Unavailable => cond.level.to_string().dimmed(),
            };
            format!("{} {}", level, value)
        }
        _ if obs.value.is_unavailable() => value.dimmed().to_string(),
        _ => value,
    };
    format!(
        "{} {} {} = {}",
        format!("#{}", obs.sequence).yellow(),
        obs.timestamp
            .format("%Y-%m-%d %H:%M:%S%.3f")
            .to_string()
            .dimmed(),
        obs.display_name(),
        value
    )
}

fn compact_observation(device: &str, obs: &Observation) -> String {
    let kind = match obs.category {
        Category::Sample => "S",
        Category::Event => "E",
        Category::Condition => "C",
    };
    format!(
        "{}\t{}\t{}\t{}:{}\t{}",
        obs.sequence,
        obs.timestamp.to_rfc3339(),
        kind,
        device,
        obs.display_name(),
        obs.value
    )
}

// ============================================================================
// Assets and errors
// ============================================================================

pub fn print_assets(doc: &AssetsDocument, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(doc),
        OutputFormat::Compact => {
            for asset in &doc.assets {
                println!(
                    "{}\t{}\t{}\t{}",
                    asset.asset_id,
                    asset.asset_type,
                    asset.device_uuid.as_deref().unwrap_or("-"),
                    if asset.removed { "removed" } else { "active" }
                );
            }
        }
        OutputFormat::Pretty => {
            println!("{} ({})", "Assets".bold(), doc.assets.len());
            for asset in &doc.assets {
                let removed = if asset.removed {
                    " removed".red().to_string()
                } else {
                    String::new()
                };
                println!(
                    "  {} {}{}",
                    asset.asset_type.yellow(),
                    asset.asset_id.cyan(),
                    removed
                );
                println!("{}", asset.xml.dimmed());
            }
        }
    }
}

pub fn print_agent_error(doc: &ErrorDocument) {
    for error in &doc.errors {
        eprintln!(
            "{} {}: {}",
            "Agent error".red().bold(),
            error.code.to_string().red(),
            error.message
        );
    }
}

// ============================================================================
// Stream events
// ============================================================================

/// Print one client event. Documents go to stdout, status to stderr.
pub fn print_event(event: &ClientEvent, format: OutputFormat, quiet: bool) {
    match event {
        ClientEvent::Probe(doc) => {
            if !quiet {
                eprintln!(
                    "{} {} device(s), instance {}",
                    ">>>".green().bold(),
                    doc.devices.len(),
                    doc.header.instance_id
                );
            }
        }
        ClientEvent::Current(doc) | ClientEvent::Sample(doc) => print_streams(doc, format),
        ClientEvent::Assets(doc) => print_assets(doc, format),
        ClientEvent::AgentError(doc) => print_agent_error(doc),
        ClientEvent::InstanceChanged { previous, current } => eprintln!(
            "{} agent restarted ({} -> {}), reloading device model",
            "!!!".yellow().bold(),
            previous,
            current
        ),
        ClientEvent::ConnectionError { message } => {
            eprintln!("{} {}", "Connection error:".red(), message)
        }
        ClientEvent::XmlError { message } => eprintln!("{} {}", "Stream error:".red(), message),
        ClientEvent::StateChanged(state) => {
            if !quiet {
                eprintln!("{}", format!("[{}]", state.name()).dimmed());
            }
        }
        ClientEvent::StreamStarted { from } => {
            if !quiet {
                eprintln!("{}", format!("stream open at sequence {}", from).dimmed());
            }
        }
        ClientEvent::StreamStopped => {
            if !quiet {
                eprintln!("{}", "stream closed".dimmed());
            }
        }
    }
}

pub fn print_stats(stats: &ClientStatsSnapshot) {
    eprintln!("--- Client Statistics ---");
    eprintln!(
        "  {} documents, {} observations ({:.1} obs/s), {}",
        stats.documents_received,
        stats.observations_received,
        stats.observations_per_second(),
        format_bytes(stats.bytes_received)
    );
    eprintln!(
        "  {} reconnects, {} agent restarts, {} stream errors, {} connection errors",
        stats.reconnects, stats.instance_resets, stats.xml_errors, stats.connection_errors
    );
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

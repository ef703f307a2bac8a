// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MTConnect agent command-line client
//!
//! # Usage
//!
//! ```bash
//! # Device model
//! mtc-stream --agent http://localhost:5000 probe
//!
//! # Snapshot of one device as JSON
//! mtc-stream --agent http://localhost:5000 --device Mill --json current
//!
//! # Follow observations until Ctrl+C
//! mtc-stream --agent http://localhost:5000 stream --interval 100
//!
//! # Using configuration file
//! mtc-stream --config client.toml stream
//! ```

mod output;

use clap::{Parser, Subcommand};
use colored::*;
use mtconnect::client::{ConfigError, SampleMode};
use mtconnect::{AgentClient, ClientConfig, ClientEvent, MTConnectClient};
use output::OutputFormat;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// MTConnect agent client
#[derive(Parser, Debug)]
#[command(name = "mtc-stream")]
#[command(about = "Probe, query and follow MTConnect agents")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Agent base URL (overrides the configuration file)
    #[arg(short, long)]
    agent: Option<String>,

    /// Device name or uuid
    #[arg(short, long)]
    device: Option<String>,

    /// XPath filter for current and sample requests
    #[arg(long)]
    path: Option<String>,

    /// Output format: pretty, json, compact
    #[arg(short, long, default_value = "pretty")]
    format: OutputFormat,

    /// Shortcut for --format json
    #[arg(long)]
    json: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Quiet mode - only output documents, no status lines
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the device model
    Probe,

    /// Print the latest value of every data item
    Current,

    /// Print a bounded range of observations
    Sample {
        /// First sequence number (defaults to the last `count` observations)
        #[arg(long)]
        from: Option<u64>,

        /// Maximum number of observations
        #[arg(short = 'n', long, default_value = "100")]
        count: u64,
    },

    /// Follow observations until interrupted
    Stream {
        /// Collection mode: stream, poll, current
        #[arg(short, long, value_parser = parse_mode)]
        mode: Option<SampleMode>,

        /// Interval between documents (milliseconds)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Stream heartbeat (milliseconds)
        #[arg(long)]
        heartbeat: Option<u64>,

        /// Maximum observations per document
        #[arg(short = 'n', long)]
        count: Option<u64>,

        /// Do not fetch assets announced by AssetChanged events
        #[arg(long)]
        no_assets: bool,

        /// Stop after this many sample documents (0 = unlimited)
        #[arg(long, default_value = "0")]
        limit: u64,

        /// Statistics reporting interval (seconds, 0 to disable)
        #[arg(long, default_value = "0")]
        stats_interval: u64,
    },

    /// Print assets
    Assets {
        /// Single asset id
        asset_id: Option<String>,
    },

    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "mtconnect.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn parse_mode(s: &str) -> Result<SampleMode, String> {
    match s.to_lowercase().as_str() {
        "stream" | "s" => Ok(SampleMode::Stream),
        "poll" | "p" => Ok(SampleMode::Poll),
        "current" | "c" => Ok(SampleMode::Current),
        _ => Err(format!("Unknown mode: {} (expected stream, poll or current)", s)),
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Logs go to stderr so stdout stays parseable
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if args.no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let format = if args.json {
        OutputFormat::Json
    } else {
        args.format
    };

    if let Err(e) = run(args, format).await {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(args: Args, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    match &args.command {
        Commands::GenConfig { output } => return cmd_gen_config(output),
        Commands::Validate { config } => return cmd_validate(config),
        _ => {}
    }

    let config = build_config(&args)?;
    match args.command {
        Commands::Probe => {
            let agent = AgentClient::new(&config)?;
            output::print_devices(&agent.probe().await?, format);
        }
        Commands::Current => {
            let agent = AgentClient::new(&config)?;
            output::print_streams(&agent.current().await?, format);
        }
        Commands::Sample { from, count } => {
            let agent = AgentClient::new(&config)?;
            let from = match from {
                Some(from) => from,
                None => {
                    let header = agent.current().await?.header;
                    let next = header.next_sequence.unwrap_or(1);
                    next.saturating_sub(count)
                        .max(header.first_sequence.unwrap_or(1))
                }
            };
            output::print_streams(&agent.sample(from, count).await?, format);
        }
        Commands::Assets { asset_id } => {
            let agent = AgentClient::new(&config)?;
            let assets = match asset_id {
                Some(id) => agent.asset(&id).await?,
                None => agent.assets().await?,
            };
            output::print_assets(&assets, format);
        }
        Commands::Stream {
            mode,
            interval,
            heartbeat,
            count,
            no_assets,
            limit,
            stats_interval,
        } => {
            let mut config = config;
            if let Some(mode) = mode {
                config.mode = mode;
            }
            if let Some(interval) = interval {
                config.interval_ms = interval;
            }
            if let Some(heartbeat) = heartbeat {
                config.heartbeat_ms = heartbeat;
            }
            if let Some(count) = count {
                config.count = count;
            }
            if no_assets {
                config.follow_assets = false;
            }
            config.validate()?;
            cmd_stream(
                config,
                format,
                args.quiet,
                limit,
                Duration::from_secs(stats_interval),
            )
            .await?;
        }
        Commands::GenConfig { .. } | Commands::Validate { .. } => {}
    }
    Ok(())
}

fn build_config(args: &Args) -> Result<ClientConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };

    if let Some(agent) = &args.agent {
        config.agent_url = agent.clone();
    }
    if let Some(device) = &args.device {
        config.device = Some(device.clone());
    }
    if let Some(path) = &args.path {
        config.path = Some(path.clone());
    }

    config.validate()?;
    Ok(config)
}

async fn cmd_stream(
    config: ClientConfig,
    format: OutputFormat,
    quiet: bool,
    limit: u64,
    stats_interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    if !quiet {
        eprintln!(
            "{} {} {} (mode={:?})",
            ">>>".green().bold(),
            "Following".bold(),
            config.agent_url.cyan(),
            config.mode
        );
        eprintln!("{}", "Press Ctrl+C to stop".dimmed());
        eprintln!();
    }

    tracing::info!(agent = %config.agent_url, mode = ?config.mode, "starting client");
    let client = MTConnectClient::spawn(config)?;
    let handle = client.handle();

    // Events are delivered on a std channel; drain it off the async threads.
    let printer_handle = handle.clone();
    let mut printer = tokio::task::spawn_blocking(move || {
        let mut samples = 0u64;
        let mut last_stats = Instant::now();
        while printer_handle.is_running() {
            if let Some(event) = printer_handle.wait(Duration::from_millis(200)) {
                if matches!(event, ClientEvent::Sample(_)) {
                    samples += 1;
                }
                output::print_event(&event, format, quiet);
                if limit > 0 && samples >= limit {
                    printer_handle.stop();
                }
            }
            if !stats_interval.is_zero() && last_stats.elapsed() >= stats_interval {
                output::print_stats(&printer_handle.stats());
                last_stats = Instant::now();
            }
        }
        for event in printer_handle.poll() {
            output::print_event(&event, format, quiet);
        }
    });

    let interrupted = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            true
        }
        _ = &mut printer => false,
    };

    if interrupted {
        if !quiet {
            eprintln!("\nShutting down...");
        }
        handle.stop();
        printer.await?;
    }

    tokio::task::spawn_blocking(move || client.shutdown()).await?;
    tracing::info!("client stopped");

    if !quiet {
        eprintln!();
        output::print_stats(&handle.stats());
    }
    Ok(())
}

fn cmd_gen_config(output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::new("http://localhost:5000")
        .device("Mill")
        .mode(SampleMode::Stream);

    let toml_str = toml::to_string_pretty(&config)?;

    let content = format!(
        r#"# MTConnect Client Configuration
# Generated by mtc-stream gen-config
#
# mode: stream (long-lived sample stream), poll (bounded sample requests)
#       or current (snapshot polling)
# path: optional XPath filter, e.g. "//Axes"

{}
"#,
        toml_str
    );

    std::fs::write(output, content)?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match ClientConfig::from_file(config_path) {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!("Agent:    {}", config.agent_url);
            println!("Device:   {}", config.device.as_deref().unwrap_or("(all)"));
            println!("Mode:     {:?}", config.mode);
            println!(
                "Timing:   interval={}ms heartbeat={}ms retry={}ms",
                config.interval_ms, config.heartbeat_ms, config.retry_interval_ms
            );
            println!("Count:    {}", config.count);
            if let Some(path) = &config.path {
                println!("Path:     {}", path);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}

//! SDS021 Probe
//!
//! Polls a particulate sensor and prints each host reply as JSON, one per line.
//!
//! Usage:
//!   cargo run --example sds021_probe -- [OPTIONS]
//!
//! Options:
//!   --port PORT       Serial port (default: first candidate port)
//!   --config FILE     Load settings from a JSON config file
//!   --count N         Stop after N samples (default: 10)
//!   --resync N        Scan N extra bytes for a shifted frame
//!   --demo            Use the simulated sensor instead of a serial port
//!   --list            List serial ports and exit

use airsense_core::config::Config;
use airsense_core::demo::{DemoLink, FaultRates};
use airsense_core::host::{HostReply, ParticulateEndpoint};
use airsense_core::poll::Poller;
use airsense_core::protocol::{list_ports, SyncMode};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "airsense_core=info".to_owned());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().collect();

    let mut port_name: Option<String> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut count = 10usize;
    let mut resync: Option<usize> = None;
    let mut demo = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                i += 1;
                if i < args.len() {
                    port_name = Some(args[i].clone());
                }
            }
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = Some(PathBuf::from(&args[i]));
                }
            }
            "--count" | "-n" => {
                i += 1;
                if i < args.len() {
                    count = args[i].parse().unwrap_or(10);
                }
            }
            "--resync" => {
                i += 1;
                if i < args.len() {
                    resync = args[i].parse().ok();
                }
            }
            "--demo" => {
                demo = true;
            }
            "--list" | "-l" => {
                print_ports();
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => {
                eprintln!("Unknown option: {}", other);
                print_help();
                return Ok(());
            }
        }
        i += 1;
    }

    let mut config = match &config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if port_name.is_some() {
        config.particulate.port = port_name;
    }
    if resync.is_some() {
        config.particulate.resync_lookahead = resync;
    }

    let mut session_config = config.particulate.session_config();
    if demo {
        // Keep demo samples quick
        session_config.settle_delay = std::time::Duration::ZERO;
    }
    if matches!(session_config.sync, SyncMode::Scan { .. }) {
        eprintln!("Resync scanning enabled");
    }
    let mut endpoint = ParticulateEndpoint::new(session_config);

    if demo {
        let link = DemoLink::new().with_faults(FaultRates {
            corrupt: 0.05,
            truncate: 0.05,
            shift: 0.05,
            silent: 0.02,
        });
        endpoint.register_link(link);
    } else {
        let port = match config.particulate.port.clone() {
            Some(port) => port,
            None => match list_ports().into_iter().next() {
                Some(info) => info.name,
                None => anyhow::bail!("No serial ports found; pass --port or --demo"),
            },
        };
        let handle = endpoint.register(&port)?;
        eprintln!("Registered {} as {}", port, handle);
    }

    let poller = Poller::new(endpoint.into_session(), config.poll.poll_config());
    let session = poller.session();
    let (tx, mut rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(poller.run(tx, cancel.clone()));

    for _ in 0..count {
        let Some(sample) = rx.recv().await else {
            break;
        };
        let reply = match &sample.outcome {
            Ok(reading) => HostReply::ok(reading.pm25(), reading.pm10()),
            Err(_) => HostReply::error(),
        };
        println!("{}", reply.to_json());
    }

    cancel.cancel();
    task.await?;

    let stats = session.lock().unwrap_or_else(|e| e.into_inner()).stats();
    eprintln!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn print_ports() {
    let ports = list_ports();
    if ports.is_empty() {
        println!("No serial ports found");
        return;
    }
    for port in ports {
        let hint = if port.looks_like_sds021() { " (SDS021?)" } else { "" };
        match &port.product {
            Some(product) => println!("{}  {}{}", port.name, product, hint),
            None => println!("{}{}", port.name, hint),
        }
    }
}

fn print_help() {
    println!("SDS021 Probe");
    println!();
    println!("Usage: sds021_probe [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --port PORT       Serial port (default: first candidate port)");
    println!("  --config FILE     Load settings from a JSON config file");
    println!("  --count N         Stop after N samples (default: 10)");
    println!("  --resync N        Scan N extra bytes for a shifted frame");
    println!("  --demo            Use the simulated sensor instead of a serial port");
    println!("  --list            List serial ports and exit");
}

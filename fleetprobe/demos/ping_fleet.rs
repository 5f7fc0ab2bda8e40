//! Fleet example: probe every node in a JSON inventory and print the results.
//!
//! # Inventory format
//!
//! ```json
//! {
//!   "nodes": [
//!     {
//!       "name": "localhost",
//!       "type": "linux",
//!       "ip": "127.0.0.1",
//!       "ssh_port": 22,
//!       "username": "admin",
//!       "password": "secret",
//!       "dest_ips": ["8.8.8.8", "4.2.2.2"]
//!     }
//!   ]
//! }
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --example ping_fleet -- --inventory nodes.json
//! ```

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use fleetprobe::{Device, Orchestrator, ProbeSettings};

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

#[derive(Deserialize)]
struct Inventory {
    nodes: Vec<Device>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let raw = fs::read_to_string(&args.inventory)?;
    let inventory: Inventory = serde_json::from_str(&raw)?;
    println!(
        "Loaded {} nodes from {}",
        inventory.nodes.len(),
        args.inventory.display()
    );

    let settings = ProbeSettings::new()
        .connect_timeout(Duration::from_secs(args.timeout))
        .session_timeout(Some(Duration::from_secs(args.session_timeout)));

    let report = Orchestrator::from_devices(inventory.nodes, &settings)?
        .run()
        .await;

    for (source, results) in &report.results {
        println!("Source IP: {source}");
        if let Some(e) = report.errors.get(source) {
            println!("\t{RED}probe failed{RESET}: {e}");
        }
        for (destination, reachable) in results {
            if *reachable {
                println!("\tDestination IP: {destination} is {GREEN}reachable{RESET}");
            } else {
                println!("\tDestination IP: {destination} is {RED}not reachable{RESET}");
            }
        }
        println!("{}", "=".repeat(49));
    }

    println!("Time taken: {:?}", report.elapsed);
    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    inventory: PathBuf,
    timeout: u64,
    session_timeout: u64,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut inventory = PathBuf::from("nodes.json");
        let mut timeout = 30u64;
        let mut session_timeout = 300u64;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--inventory" | "-i" => {
                    i += 1;
                    if i < args.len() {
                        inventory = PathBuf::from(&args[i]);
                    }
                }
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(30);
                    }
                }
                "--session-timeout" | "-s" => {
                    i += 1;
                    if i < args.len() {
                        session_timeout = args[i].parse().unwrap_or(300);
                    }
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                }
            }
            i += 1;
        }

        Self {
            inventory,
            timeout,
            session_timeout,
        }
    }

    fn print_help() {
        println!(
            r#"fleetprobe ping_fleet example

USAGE:
    cargo run --example ping_fleet -- [OPTIONS]

OPTIONS:
    -i, --inventory <PATH>         JSON inventory [default: nodes.json]
    -t, --timeout <SECS>           Connect timeout [default: 30]
    -s, --session-timeout <SECS>   Per-device session deadline [default: 300]
    --help                         Print this help message
"#
        );
    }
}

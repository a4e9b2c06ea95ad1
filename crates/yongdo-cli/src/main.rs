//! yongdo: zoning lookup and development feasibility for Korean land parcels.

mod analyze;
mod config;
mod display;

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;
use yongdo_client::{
    AddressResolver, ProbeError, ResolveError, ZoningProber, geocoder_transport, zoning_transport,
};
use yongdo_core::{ZoningLabel, calculate};

use crate::analyze::{CalcArgs, Target, resolve_target, run_analysis};
use crate::config::ServiceArgs;

#[derive(Parser, Debug)]
#[command(name = "yongdo", version, about = "Zoning lookup and feasibility estimates for Korean parcels")]
struct Cli {
    #[command(flatten)]
    service: ServiceArgs,

    /// Print JSON instead of cards.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve an address to its parcel number.
    Resolve {
        #[arg(long)]
        address: String,
    },
    /// Look up the use district for a parcel.
    Zoning(Target),
    /// Show the ratio ceilings for a use-district label.
    Ratio { label: String },
    /// Run the feasibility calculator on explicit inputs.
    Calc(CalcArgs),
    /// Resolve, look up zoning, and run the calculator with its ratios.
    Analyze {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        calc: CalcArgs,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "yongdo starting");

    match run(&cli).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            if let Some(probe) = err.downcast_ref::<ProbeError>() {
                display::print_probe_failure(probe);
            } else if let Some(resolve) = err.downcast_ref::<ResolveError>() {
                display::print_resolve_failure(resolve);
            } else {
                return Err(err);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let service = &cli.service;
    let geocoder = || -> anyhow::Result<_> {
        let key = service.geocoder_key()?;
        let transport = geocoder_transport(&service.transport_config())
            .context("building geocoder client")?;
        Ok((AddressResolver::new(transport), key))
    };

    match &cli.command {
        Command::Resolve { address } => {
            let (resolver, key) = geocoder()?;
            let parcel = resolver.resolve(address, &key).await?;
            if cli.json {
                print_json(&parcel)?;
            } else {
                display::print_resolved(&parcel);
            }
        }
        Command::Zoning(target) => {
            let (pnu, address) = resolve_target(target, geocoder).await?;
            let key = service.service_key()?;
            let candidates = service.candidates()?;
            let transport =
                zoning_transport(&service.transport_config()).context("building zoning client")?;
            let answer = ZoningProber::new(transport)
                .probe(&pnu, &key, &candidates)
                .await?;
            if cli.json {
                print_json(&json!({ "pnu": pnu, "address": address, "zoning": answer }))?;
            } else {
                display::print_zoning(&pnu, &answer);
            }
        }
        Command::Ratio { label } => {
            let ratios = ZoningLabel::new(label.trim()).ratios();
            if cli.json {
                print_json(&json!({ "label": label.trim(), "ratios": ratios }))?;
            } else {
                display::print_ratio(label.trim(), ratios);
            }
        }
        Command::Calc(calc) => {
            let input = calc.apply(calc.base_input()?);
            let report = calculate(&input);
            if cli.json {
                print_json(&json!({ "input": input, "feasibility": report }))?;
            } else {
                display::print_feasibility(&input, &report);
            }
        }
        Command::Analyze { target, calc } => {
            let (pnu, address) = resolve_target(target, geocoder).await?;
            let key = service.service_key()?;
            let candidates = service.candidates()?;
            let transport =
                zoning_transport(&service.transport_config()).context("building zoning client")?;
            let prober = ZoningProber::new(transport);
            let report = run_analysis(&prober, &key, &candidates, pnu, address, calc).await?;
            if cli.json {
                print_json(&report)?;
            } else {
                display::print_analysis(&report);
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

//! End-to-end pipeline: address → PNU → zoning → ratios → feasibility.

use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use tracing::info;
use yongdo_client::{
    AddressResolver, Credential, ResolvedParcel, Transport, ZoningAnswer, ZoningProber,
};
use yongdo_core::{
    Address, EndpointCandidate, FeasibilityInput, FeasibilityReport, ParcelId, RatioPair,
    UnitType, calculate,
};

/// Which parcel to look at.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct Target {
    /// 19-digit parcel number (PNU).
    #[arg(long)]
    pub pnu: Option<String>,

    /// Street or lot address, resolved to a PNU first.
    #[arg(long)]
    pub address: Option<String>,
}

/// Calculator inputs. Flags override the `--input` file, which overrides defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct CalcArgs {
    /// JSON file with calculator inputs.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Land area in m².
    #[arg(long)]
    pub land_area: Option<f64>,

    /// Coverage ratio in percent (건폐율).
    #[arg(long)]
    pub coverage: Option<f64>,

    /// Floor-area ratio in percent (용적률).
    #[arg(long)]
    pub floor_area_ratio: Option<f64>,

    /// Land price per m² (KRW).
    #[arg(long)]
    pub land_cost: Option<f64>,

    /// Construction cost per m² of floor area (KRW).
    #[arg(long)]
    pub build_cost: Option<f64>,

    /// Sale price per m² of floor area (KRW).
    #[arg(long)]
    pub sale_price: Option<f64>,

    /// Net-to-gross ratio, 0-1 (전용률).
    #[arg(long)]
    pub efficiency: Option<f64>,

    /// Parking spaces required per unit.
    #[arg(long)]
    pub parking_per_unit: Option<f64>,

    /// Unit type as NAME:SIZE_M2[:SHARE]; repeat for a mix.
    #[arg(long = "unit", value_parser = parse_unit_type)]
    pub units: Vec<UnitType>,
}

impl CalcArgs {
    /// Inputs from `--input`, or the defaults.
    pub fn base_input(&self) -> anyhow::Result<FeasibilityInput> {
        let Some(path) = &self.input else {
            return Ok(FeasibilityInput::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading calculator input {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing calculator input {}", path.display()))
    }

    /// Apply flag overrides on top of `input`.
    pub fn apply(&self, mut input: FeasibilityInput) -> FeasibilityInput {
        let overrides = [
            (self.land_area, &mut input.land_area_m2),
            (self.coverage, &mut input.coverage_pct),
            (self.floor_area_ratio, &mut input.floor_area_pct),
            (self.land_cost, &mut input.land_cost_per_m2),
            (self.build_cost, &mut input.construction_cost_per_m2),
            (self.sale_price, &mut input.sale_price_per_m2),
            (self.efficiency, &mut input.efficiency),
            (self.parking_per_unit, &mut input.parking_per_unit),
        ];
        for (value, slot) in overrides {
            if let Some(v) = value {
                *slot = v;
            }
        }
        if !self.units.is_empty() {
            input.unit_types = self.units.clone();
        }
        input
    }
}

fn parse_unit_type(s: &str) -> Result<UnitType, String> {
    let mut parts = s.splitn(3, ':');
    let name = parts.next().unwrap_or_default().trim();
    if name.is_empty() {
        return Err("unit name is empty".into());
    }
    let size: f64 = parts
        .next()
        .ok_or("expected NAME:SIZE_M2[:SHARE]")?
        .trim()
        .parse()
        .map_err(|e| format!("bad unit size: {e}"))?;
    let share: f64 = match parts.next() {
        Some(share) => share
            .trim()
            .parse()
            .map_err(|e| format!("bad unit share: {e}"))?,
        None => 1.0,
    };
    Ok(UnitType::new(name, size, share))
}

#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub queried_at: DateTime<Utc>,
    pub pnu: ParcelId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub zoning: ZoningAnswer,
    pub ratios: RatioPair,
    pub input: FeasibilityInput,
    pub feasibility: FeasibilityReport,
}

/// Resolve the target to a PNU. The PNU is validated before any request.
pub async fn resolve_target<G: Transport>(
    target: &Target,
    resolver: impl FnOnce() -> anyhow::Result<(AddressResolver<G>, Credential)>,
) -> anyhow::Result<(ParcelId, Option<Address>)> {
    if let Some(pnu) = &target.pnu {
        let pnu = ParcelId::parse(pnu).with_context(|| format!("invalid PNU {pnu:?}"))?;
        return Ok((pnu, None));
    }
    let address = target.address.as_deref().unwrap_or_default();
    let (resolver, key) = resolver()?;
    let ResolvedParcel { pnu, address } = resolver
        .resolve(address, &key)
        .await
        .context("address lookup failed")?;
    Ok((pnu, Some(address)))
}

/// Probe zoning for `pnu`, then run the calculator with the zoning ratios
/// as defaults.
pub async fn run_analysis<Z: Transport>(
    prober: &ZoningProber<Z>,
    key: &Credential,
    candidates: &[EndpointCandidate],
    pnu: ParcelId,
    address: Option<Address>,
    calc: &CalcArgs,
) -> anyhow::Result<AnalysisReport> {
    let zoning = prober.probe(&pnu, key, candidates).await?;
    let ratios = zoning.zoning.ratios();
    info!(zoning = %zoning.zoning, %ratios, "ratios selected");

    let input = calc.apply(calc.base_input()?.with_ratios(ratios));
    let feasibility = calculate(&input);

    Ok(AnalysisReport {
        queried_at: Utc::now(),
        pnu,
        address,
        zoning,
        ratios,
        input,
        feasibility,
    })
}

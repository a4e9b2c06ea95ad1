//! Redevelopment feasibility arithmetic.
//!
//! All areas are square metres and all money figures are KRW. Ratios are
//! entered as percentages, the way zoning ordinances state them.
//!
//! Every figure is total: zero footprints, zero costs and empty unit mixes
//! produce zeros rather than NaN or infinity.

use serde::{Deserialize, Serialize};

use crate::ratio::RatioPair;

/// Storey height used for the volumetric preview.
pub const FLOOR_HEIGHT_M: f64 = 3.0;

/// Square metres per 평.
pub const M2_PER_PYEONG: f64 = 3.305785;

pub fn m2_to_pyeong(m2: f64) -> f64 {
    m2 / M2_PER_PYEONG
}

pub fn pyeong_to_m2(pyeong: f64) -> f64 {
    pyeong * M2_PER_PYEONG
}

/// One dwelling type in the unit mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitType {
    pub name: String,
    /// Net area of one unit.
    pub size_m2: f64,
    /// Relative share of the net usable area; shares are normalised by their sum.
    pub share: f64,
}

impl UnitType {
    pub fn new(name: impl Into<String>, size_m2: f64, share: f64) -> Self {
        Self {
            name: name.into(),
            size_m2,
            share,
        }
    }
}

fn default_unit_types() -> Vec<UnitType> {
    vec![UnitType::new("59㎡", 59.0, 0.5), UnitType::new("84㎡", 84.0, 0.5)]
}

/// Calculator inputs. Missing fields in JSON take the [`Default`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeasibilityInput {
    pub land_area_m2: f64,
    pub coverage_pct: f64,
    pub floor_area_pct: f64,
    pub land_cost_per_m2: f64,
    pub construction_cost_per_m2: f64,
    pub sale_price_per_m2: f64,
    /// Net-to-gross ratio (전용률), 0.0..=1.0.
    pub efficiency: f64,
    pub parking_per_unit: f64,
    pub unit_types: Vec<UnitType>,
}

impl Default for FeasibilityInput {
    fn default() -> Self {
        Self {
            land_area_m2: 0.0,
            coverage_pct: f64::from(crate::ratio::DEFAULT_RATIOS.coverage_pct),
            floor_area_pct: f64::from(crate::ratio::DEFAULT_RATIOS.floor_area_pct),
            land_cost_per_m2: 0.0,
            construction_cost_per_m2: 0.0,
            sale_price_per_m2: 0.0,
            efficiency: 0.75,
            parking_per_unit: 1.0,
            unit_types: default_unit_types(),
        }
    }
}

impl FeasibilityInput {
    /// Replace the coverage and floor-area ratios with a zoning lookup result.
    pub fn with_ratios(mut self, ratios: RatioPair) -> Self {
        self.coverage_pct = f64::from(ratios.coverage_pct);
        self.floor_area_pct = f64::from(ratios.floor_area_pct);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitBreakdown {
    pub name: String,
    pub size_m2: f64,
    pub usable_area_m2: f64,
    pub units: u64,
}

/// Illustrative massing box: a square footprint extruded to the estimated height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumePreview {
    pub side_m: f64,
    pub height_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeasibilityReport {
    pub footprint_m2: f64,
    pub total_floor_area_m2: f64,
    pub floors: f64,
    pub net_usable_m2: f64,
    pub units: Vec<UnitBreakdown>,
    pub total_units: u64,
    pub parking_spaces: u64,
    pub land_cost: f64,
    pub construction_cost: f64,
    pub total_cost: f64,
    pub revenue: f64,
    pub net_profit: f64,
    /// Net profit over total cost, as a fraction.
    pub return_on_cost: f64,
    pub preview: VolumePreview,
}

/// Run the feasibility arithmetic over `input`.
pub fn calculate(input: &FeasibilityInput) -> FeasibilityReport {
    let land = input.land_area_m2.max(0.0);
    let footprint = land * input.coverage_pct / 100.0;
    let total_floor_area = land * input.floor_area_pct / 100.0;
    let floors = if footprint > 0.0 {
        total_floor_area / footprint
    } else {
        0.0
    };

    let net_usable = total_floor_area * input.efficiency;
    let share_sum: f64 = input
        .unit_types
        .iter()
        .map(|t| t.share.max(0.0))
        .sum();

    let units: Vec<UnitBreakdown> = input
        .unit_types
        .iter()
        .map(|t| {
            let usable = if share_sum > 0.0 {
                net_usable * t.share.max(0.0) / share_sum
            } else {
                0.0
            };
            let count = if t.size_m2 > 0.0 && usable > 0.0 {
                (usable / t.size_m2).floor() as u64
            } else {
                0
            };
            UnitBreakdown {
                name: t.name.clone(),
                size_m2: t.size_m2,
                usable_area_m2: usable,
                units: count,
            }
        })
        .collect();

    let total_units: u64 = units.iter().map(|u| u.units).sum();
    let parking = (total_units as f64 * input.parking_per_unit).round().max(0.0) as u64;

    let land_cost = land * input.land_cost_per_m2;
    let construction_cost = total_floor_area * input.construction_cost_per_m2;
    let total_cost = land_cost + construction_cost;
    let revenue = total_floor_area * input.sale_price_per_m2;
    let net_profit = revenue - total_cost;
    let return_on_cost = if total_cost != 0.0 {
        net_profit / total_cost
    } else {
        0.0
    };

    let preview = VolumePreview {
        side_m: footprint.max(0.0).sqrt(),
        height_m: floors * FLOOR_HEIGHT_M,
    };

    tracing::debug!(
        footprint,
        total_floor_area,
        floors,
        total_units,
        return_on_cost,
        "feasibility calculated"
    );

    FeasibilityReport {
        footprint_m2: footprint,
        total_floor_area_m2: total_floor_area,
        floors,
        net_usable_m2: net_usable,
        units,
        total_units,
        parking_spaces: parking,
        land_cost,
        construction_cost,
        total_cost,
        revenue,
        net_profit,
        return_on_cost,
        preview,
    }
}

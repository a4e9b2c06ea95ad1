//! Vertical card display for lookups and feasibility results.
//!
//! Each card is a titled block of sections; each section is a list of
//! aligned `label value` rows. Sections with no rows are skipped.

use yongdo_client::{AttemptStatus, ProbeError, ResolveError, ResolvedParcel, ZoningAnswer};
use yongdo_core::feasibility::m2_to_pyeong;
use yongdo_core::{FeasibilityInput, FeasibilityReport, ParcelId, RatioPair, ZoningMatch};

use crate::analyze::AnalysisReport;

const MAX_LIST_ITEMS: usize = 10;
const MAX_PREVIEW_FLOORS: usize = 30;
const MAX_PREVIEW_WIDTH: usize = 40;

/// Remediation checklist for a probe that never got `NORMAL SERVICE`.
const PROBE_HINTS: &[&str] = &[
    "Use the key issued for the land-use regulation service (토지이용규제정보), not a building-registry key.",
    "Newly issued keys take up to an hour to activate.",
    "Try the Encoding form of the key if the Decoding form was rejected, or vice versa.",
];

type Rows = Vec<(&'static str, String)>;

// ── Cards ──

pub fn print_resolved(parcel: &ResolvedParcel) {
    println!("=== {} ===", parcel.address.display());
    println!();
    print_section("Parcel", parcel_rows(&parcel.pnu, Some(parcel.address.display())));
}

pub fn print_zoning(pnu: &ParcelId, answer: &ZoningAnswer) {
    println!("=== {} ===", pnu);
    println!();
    print_section("Parcel", parcel_rows(pnu, None));
    print_section("Zoning", zoning_rows(answer));
    print_section("Ceilings", ratio_rows(answer.zoning.ratios()));
    print_mentions(&answer.mentions);
    print_attempts(answer.attempts.iter().map(|a| {
        (
            a.endpoint.as_str(),
            a.variant.to_string(),
            a.status,
            a.diagnostic.as_deref(),
        )
    }));
}

pub fn print_ratio(label: &str, ratios: RatioPair) {
    println!("=== {label} ===");
    println!();
    print_section("Ceilings", ratio_rows(ratios));
}

pub fn print_feasibility(input: &FeasibilityInput, report: &FeasibilityReport) {
    println!("=== Feasibility ===");
    println!();
    print_feasibility_sections(input, report);
}

pub fn print_analysis(report: &AnalysisReport) {
    let title = report
        .address
        .as_ref()
        .map_or_else(|| report.pnu.to_string(), |a| a.display().to_string());
    println!("=== {title} ===");
    println!("{}", report.queried_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();

    print_section(
        "Parcel",
        parcel_rows(&report.pnu, report.address.as_ref().map(|a| a.display())),
    );
    print_section("Zoning", zoning_rows(&report.zoning));
    print_section("Ceilings", ratio_rows(report.ratios));
    print_mentions(&report.zoning.mentions);
    print_feasibility_sections(&report.input, &report.feasibility);
}

pub fn print_probe_failure(err: &ProbeError) {
    eprintln!("=== Zoning lookup failed ===");
    eprintln!();
    if let ProbeError::Exhausted {
        diagnostic,
        attempts,
    } = err
    {
        eprintln!("Last upstream message:");
        eprintln!("  {diagnostic}");
        eprintln!();
        eprintln!("Attempts");
        for a in attempts {
            eprintln!(
                "  {:<40} {:<8} {:<11} {}",
                a.endpoint,
                a.variant,
                status_label(a.status),
                a.diagnostic.as_deref().unwrap_or("")
            );
        }
        eprintln!();
    } else {
        eprintln!("  {err}");
        eprintln!();
    }
    eprintln!("Checklist");
    for (i, hint) in PROBE_HINTS.iter().enumerate() {
        eprintln!("  {}. {hint}", i + 1);
    }
    eprintln!();
}

pub fn print_resolve_failure(err: &ResolveError) {
    eprintln!("=== Address lookup failed ===");
    eprintln!();
    eprintln!("  {err}");
    eprintln!();
    if err.is_user_correctable() {
        eprintln!("Check the spelling, or enter a lot address (지번) such as '사당동 84-8'.");
    } else {
        eprintln!("Check the geocoder key and that --referer matches the origin registered for it.");
    }
    eprintln!();
}

// ── Sections ──

fn print_section(header: &str, rows: Rows) {
    if rows.is_empty() {
        return;
    }
    println!("{header}");
    for (label, value) in rows {
        println!("  {:<26} {}", label, value);
    }
    println!();
}

fn parcel_rows(pnu: &ParcelId, address: Option<&str>) -> Rows {
    let mut rows = vec![
        ("pnu", pnu.to_string()),
        ("legal_dong_code", pnu.legal_dong_code().to_string()),
        ("lot", pnu.lot_display()),
    ];
    if let Some(address) = address {
        rows.push(("address", address.to_string()));
    }
    rows
}

fn zoning_rows(answer: &ZoningAnswer) -> Rows {
    vec![
        ("use_district", zoning_text(&answer.zoning)),
        ("service", answer.endpoint.clone()),
        ("key_form", answer.variant.to_string()),
    ]
}

fn zoning_text(zoning: &ZoningMatch) -> String {
    match zoning {
        ZoningMatch::Recognized(label) => label.to_string(),
        ZoningMatch::NotRecognized => format!("{zoning} (reply had no district text; check the PNU)"),
    }
}

fn ratio_rows(ratios: RatioPair) -> Rows {
    vec![
        ("coverage_ratio", format!("{}%", ratios.coverage_pct)),
        ("floor_area_ratio", format!("{}%", ratios.floor_area_pct)),
    ]
}

fn print_mentions(mentions: &[String]) {
    if mentions.is_empty() {
        return;
    }
    println!("Regulations ({})", mentions.len());
    for m in mentions.iter().take(MAX_LIST_ITEMS) {
        println!("    {m}");
    }
    if mentions.len() > MAX_LIST_ITEMS {
        println!("    ... and {} more", mentions.len() - MAX_LIST_ITEMS);
    }
    println!();
}

fn print_attempts<'a>(attempts: impl Iterator<Item = (&'a str, String, AttemptStatus, Option<&'a str>)>) {
    let attempts: Vec<_> = attempts.collect();
    if attempts.len() <= 1 {
        return;
    }
    println!("Attempts");
    for (endpoint, variant, status, diagnostic) in attempts {
        println!(
            "  {:<40} {:<8} {:<11} {}",
            endpoint,
            variant,
            status_label(status),
            diagnostic.unwrap_or("")
        );
    }
    println!();
}

fn print_feasibility_sections(input: &FeasibilityInput, r: &FeasibilityReport) {
    print_section(
        "Inputs",
        vec![
            ("land_area", area(input.land_area_m2)),
            ("coverage_ratio", format!("{}%", input.coverage_pct)),
            ("floor_area_ratio", format!("{}%", input.floor_area_pct)),
            ("efficiency", format!("{:.0}%", input.efficiency * 100.0)),
            ("parking_per_unit", format!("{}", input.parking_per_unit)),
        ],
    );
    print_section(
        "Massing",
        vec![
            ("footprint", area(r.footprint_m2)),
            ("total_floor_area", area(r.total_floor_area_m2)),
            ("floors", format!("{:.2}", r.floors)),
            ("net_usable_area", area(r.net_usable_m2)),
        ],
    );

    let mut unit_rows: Rows = r
        .units
        .iter()
        .map(|u| ("unit_type", format!("{:<10} {:>5} units  ({})", u.name, u.units, area(u.usable_area_m2))))
        .collect();
    unit_rows.push(("total_units", r.total_units.to_string()));
    unit_rows.push(("parking_spaces", r.parking_spaces.to_string()));
    print_section("Units", unit_rows);

    print_section(
        "Economics",
        vec![
            ("land_cost", won(r.land_cost)),
            ("construction_cost", won(r.construction_cost)),
            ("total_cost", won(r.total_cost)),
            ("revenue", won(r.revenue)),
            ("net_profit", won(r.net_profit)),
            ("return_on_cost", format!("{:.1}%", r.return_on_cost * 100.0)),
        ],
    );

    print_preview(r);
}

/// Side elevation of the massing box, one row per storey.
fn print_preview(r: &FeasibilityReport) {
    let floors = r.floors.ceil() as usize;
    if floors == 0 {
        return;
    }
    println!(
        "Preview ({:.1} m x {:.1} m x {:.1} m)",
        r.preview.side_m, r.preview.side_m, r.preview.height_m
    );
    let width = (r.preview.side_m.round() as usize).clamp(4, MAX_PREVIEW_WIDTH);
    let shown = floors.min(MAX_PREVIEW_FLOORS);
    println!("    +{}+", "-".repeat(width));
    for level in (1..=shown).rev() {
        println!("    |{}| {level}F", "#".repeat(width));
    }
    if floors > shown {
        println!("    ... {} more floors", floors - shown);
    }
    println!("  ={}=", "=".repeat(width + 2));
    println!();
}

// ── Formatting ──

fn status_label(status: AttemptStatus) -> &'static str {
    match status {
        AttemptStatus::Success => "success",
        AttemptStatus::Rejected => "rejected",
        AttemptStatus::Malformed => "malformed",
        AttemptStatus::Unreachable => "unreachable",
    }
}

fn area(m2: f64) -> String {
    format!("{:.2} m² ({:.1}평)", m2, m2_to_pyeong(m2))
}

/// KRW with thousands separators, plus 억 for large sums.
fn won(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if rounded < 0.0 { "-" } else { "" };
    if rounded.abs() >= 1e8 {
        format!("{sign}{grouped}원 ({sign}{:.1}억)", rounded.abs() / 1e8)
    } else {
        format!("{sign}{grouped}원")
    }
}

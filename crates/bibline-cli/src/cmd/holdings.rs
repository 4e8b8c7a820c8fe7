//! Holdings subcommand - show entitlements and their moving walls

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use bibline_core::{Source, fmt_num};
use bibline_holdings::{Bound, Holding, HoldingsIndex};

#[derive(Args, Debug)]
pub struct HoldingsArgs {
    /// Holdings file, URL, or - for stdin
    pub file: String,

    /// Only show the holding indexed under this ISSN
    #[arg(long)]
    pub issn: Option<String>,
}

fn fmt_bound(bound: &Bound) -> String {
    let part = |v: Option<i32>| v.map(|v| v.to_string()).unwrap_or_else(|| "*".to_string());
    format!("{}/{}/{}", part(bound.year), part(bound.volume), part(bound.issue))
}

/// One row per entitlement, boundaries relative to `now`
pub fn holdings_table(holdings: &[&Holding], now: DateTime<Utc>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Title").fg(Color::Cyan),
            Cell::new("ISSNs").fg(Color::Cyan),
            Cell::new("Status").fg(Color::Cyan),
            Cell::new("Range").fg(Color::Cyan),
            Cell::new("Boundary").fg(Color::Cyan),
            Cell::new("URL").fg(Color::Cyan),
        ]);

    for holding in holdings {
        let issns = holding.issns().collect::<Vec<_>>().join(", ");
        for entitlement in &holding.entitlements {
            let boundary = match entitlement.delay() {
                Ok(delay) if delay.is_zero() => Cell::new("none"),
                Ok(_) => match entitlement.boundary_at(now) {
                    Ok(b) => Cell::new(b.format("%Y-%m-%d").to_string()),
                    Err(e) => Cell::new(e.to_string()).fg(Color::Red),
                },
                Err(e) => Cell::new(e.to_string()).fg(Color::Red),
            };
            table.add_row(vec![
                Cell::new(&holding.title),
                Cell::new(&issns),
                Cell::new(&entitlement.status),
                Cell::new(format!(
                    "{} - {}",
                    fmt_bound(&entitlement.begin),
                    fmt_bound(&entitlement.end)
                )),
                boundary,
                Cell::new(entitlement.unescaped_url()),
            ]);
        }
    }
    table
}

pub fn run(args: HoldingsArgs) -> Result<()> {
    let source = Source::parse(&args.file);
    let index = HoldingsIndex::open(&source)
        .with_context(|| format!("Failed to load holdings from {source}"))?;

    let holdings: Vec<&Holding> = match &args.issn {
        Some(issn) => {
            let found: Vec<_> = index.lookup(issn).into_iter().collect();
            if found.is_empty() {
                log::warn!("No holding for ISSN {issn}");
            }
            found
        }
        None => index.holdings().iter().collect(),
    };

    let now = Utc::now();
    for holding in &holdings {
        for entitlement in &holding.entitlements {
            log::debug!("{}: {}", holding.title, entitlement.describe_at(now));
        }
    }

    eprintln!("\n{}", holdings_table(&holdings, now));
    eprintln!(
        "{} holdings, {} malformed",
        fmt_num(index.len()),
        fmt_num(index.malformed())
    );
    Ok(())
}

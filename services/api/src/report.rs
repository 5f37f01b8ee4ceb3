use crate::infra::{parse_date, parse_month, InMemoryMarketSource};
use chrono::{Local, NaiveDate};
use clap::Args;
use market_trends::config::AppConfig;
use market_trends::error::AppError;
use market_trends::ranking::{rank_markets, LocationMarket, RankedLocation, RankingMetric};
use market_trends::sources::{MarketOverview, SourceCombiner, SourceStatus};
use market_trends::telemetry;
use market_trends::trends::{SaleRecordImporter, TrendEngine, TrendReport, YearMonth};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct TrendReportArgs {
    /// Sales export with Property Type, Sold Date, Sold Price and List Price columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Last month of the reporting window (YYYY-MM). Defaults to the current month.
    #[arg(long, value_parser = parse_month)]
    pub(crate) end: Option<YearMonth>,
    /// Override the reporting date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct TrendRankArgs {
    /// Sales export that also carries a Location column
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Ranking metric: average_price, median_price, transaction_count,
    /// price_change_yoy, sale_to_list_ratio or affordability
    #[arg(long, default_value = "average_price")]
    pub(crate) metric: RankingMetric,
    /// Location to flag as your own market in the table
    #[arg(long)]
    pub(crate) self_location: Option<String>,
    /// Last month of the reporting window (YYYY-MM)
    #[arg(long, value_parser = parse_month)]
    pub(crate) end: Option<YearMonth>,
    /// Override the reporting date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

fn load_engine() -> Result<TrendEngine, AppError> {
    let config = AppConfig::load()?;
    telemetry::init_for_cli()?;
    Ok(TrendEngine::new(config.trends))
}

pub(crate) async fn run_trend_report(args: TrendReportArgs) -> Result<(), AppError> {
    let TrendReportArgs { csv, end, today } = args;

    let engine = load_engine()?;
    let import = SaleRecordImporter::from_path(csv)?;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let window = match end {
        Some(end) => engine.window_ending(end)?,
        None => engine.window_for(today)?,
    };

    let source = InMemoryMarketSource::new(engine.build(&window, import.records(), today));
    let overview = SourceCombiner
        .combine(source.breakdown(), source.trend())
        .await?;

    render_trend_report(source.report(), &overview, import.skipped_rows, today);
    Ok(())
}

pub(crate) fn run_trend_ranking(args: TrendRankArgs) -> Result<(), AppError> {
    let TrendRankArgs {
        csv,
        metric,
        self_location,
        end,
        today,
    } = args;

    let engine = load_engine()?;
    let import = SaleRecordImporter::from_path(csv)?;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let window = match end {
        Some(end) => engine.window_ending(end)?,
        None => engine.window_for(today)?,
    };

    let markets: Vec<LocationMarket> = import
        .by_location()
        .into_iter()
        .map(|(name, records)| LocationMarket {
            breakdown: engine.build(&window, &records, today).breakdown(),
            is_self: self_location
                .as_deref()
                .is_some_and(|own| own.eq_ignore_ascii_case(&name)),
            name,
        })
        .collect();

    let rankings = rank_markets(&markets, metric)?;
    render_rankings(metric, &rankings);
    Ok(())
}

pub(crate) fn render_trend_report(
    report: &TrendReport,
    overview: &MarketOverview,
    rejected_rows: usize,
    today: NaiveDate,
) {
    let summary = report.summary();
    let insights = report.insights();

    println!("Market trends report");
    println!(
        "Window: {} -> {} (evaluated {})",
        summary.window_start.label(),
        summary.window_end.label(),
        today
    );
    match summary.last_complete_month {
        Some(month) => println!("Last complete month: {}", month.label()),
        None => println!("Last complete month: none (every month is still pro-rated)"),
    }
    if report.skipped_records + rejected_rows > 0 {
        println!(
            "Skipped records: {} outside the window or excluded, {} unparseable",
            report.skipped_records, rejected_rows
        );
    }

    if !overview.has_data() {
        println!("\nNo sales recorded for {}", overview.breakdown.period.label());
        return;
    }

    let rollup = overview.rollup();
    println!("\n{} snapshot", overview.breakdown.period.label());
    println!(
        "- All types: {} sales | avg {:.0} | median {:.0} | sale-to-list {:.1}%",
        rollup.transaction_count,
        rollup.avg_price,
        rollup.median_price,
        rollup.sale_to_list_ratio * 100.0
    );
    for snapshot in overview.segments() {
        let bucket = &snapshot.bucket;
        println!(
            "- {} [{}]: {} sales | avg {:.0} | MoM {:+.1}% | YoY {:+.1}% | {:.1}% share",
            bucket.segment,
            snapshot.color,
            bucket.transaction_count,
            bucket.avg_price,
            bucket.price_delta.month_over_month * 100.0,
            bucket.price_delta.year_over_year * 100.0,
            snapshot.share_percent
        );
    }

    match &overview.trend {
        SourceStatus::Available => {
            println!("\nMonthly volume");
            for point in &overview.volume_series {
                let marker = if point.pro_rated { " (pro-rated)" } else { "" };
                println!(
                    "- {}: {} sales, avg {:.0}{}",
                    point.month.label(),
                    point.transaction_count,
                    point.avg_price,
                    marker
                );
            }
        }
        SourceStatus::Unavailable { reason } => {
            println!("\nMonthly volume unavailable: {}", reason);
        }
    }

    println!("\nMarket direction: {}", insights.direction_label);
    if let Some(notice) = &insights.pro_rated_notice {
        println!("Note: {}", notice);
    }
    if !insights.observations.is_empty() {
        println!("\nObservations");
        for note in &insights.observations {
            println!("- {}", note);
        }
    }
}

pub(crate) fn render_rankings(metric: RankingMetric, rankings: &[RankedLocation]) {
    println!("Location ranking by {}", metric.label());
    if rankings.is_empty() {
        println!("No locations found; add a Location column to the export");
        return;
    }
    for entry in rankings {
        let value = if entry.metric_value.is_finite() {
            format!("{:.2}", entry.metric_value)
        } else {
            "no sales".to_string()
        };
        let marker = if entry.is_self { " <- you" } else { "" };
        println!(
            "{:>3}. {} ({}){}",
            entry.rank, entry.location_name, value, marker
        );
    }
}

use crate::report::{run_trend_ranking, run_trend_report, TrendRankArgs, TrendReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use market_trends::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Market Trends",
    about = "Serve and query real-estate market trend reports from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Build trend reports and location rankings from a sales export
    Trends {
        #[command(subcommand)]
        command: TrendsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum TrendsCommand {
    /// Print the segment breakdown, monthly volume and market insights
    Report(TrendReportArgs),
    /// Rank locations in the export by a market metric
    Rank(TrendRankArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Trends {
            command: TrendsCommand::Report(args),
        } => run_trend_report(args).await,
        Command::Trends {
            command: TrendsCommand::Rank(args),
        } => run_trend_ranking(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_trends::ranking::RankingMetric;

    #[test]
    fn parses_rank_command() {
        let cli = Cli::try_parse_from([
            "market-trends",
            "trends",
            "rank",
            "--csv",
            "sales.csv",
            "--metric",
            "affordability",
            "--self-location",
            "Surrey",
        ])
        .expect("arguments parse");

        match cli.command {
            Some(Command::Trends {
                command: TrendsCommand::Rank(args),
            }) => {
                assert_eq!(args.metric, RankingMetric::Affordability);
                assert_eq!(args.self_location.as_deref(), Some("Surrey"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn report_command_validates_months() {
        assert!(Cli::try_parse_from([
            "market-trends",
            "trends",
            "report",
            "--csv",
            "sales.csv",
            "--end",
            "2024-13",
        ])
        .is_err());
    }
}

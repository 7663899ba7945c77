use std::path::PathBuf;

use clap::Parser;

use crate::platform::logging::LogDestination;

#[derive(Debug, Parser)]
#[command(name = "migrator")]
#[command(about = "Access to MySQL migration wizard with a simulated transfer", long_about = None)]
pub struct Cli {
    /// RON config file (defaults to ./migrator.ron when it exists)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Seed for reproducible transfer runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Milliseconds between simulation ticks
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// Walk through every step without reading commands from stdin
    #[arg(long)]
    pub auto: bool,

    /// Source file chosen by --auto
    #[arg(long, default_value = "Northwind.accdb")]
    pub source: String,

    /// Fail an item during --auto: `<object name>=<error message>`
    #[arg(long = "fail", value_parser = parse_fault)]
    pub faults: Vec<FaultSpec>,

    /// Where log output goes
    #[arg(long, value_enum)]
    pub log: Option<LogDestination>,

    /// Print transfer snapshots and the summary as JSON lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultSpec {
    pub name: String,
    pub message: String,
}

fn parse_fault(raw: &str) -> Result<FaultSpec, String> {
    let (name, message) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <name>=<message>, got {raw:?}"))?;
    let (name, message) = (name.trim(), message.trim());
    if name.is_empty() || message.is_empty() {
        return Err(format!("expected <name>=<message>, got {raw:?}"));
    }
    Ok(FaultSpec {
        name: name.to_string(),
        message: message.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_auto_run_with_faults() {
        let cli = Cli::try_parse_from([
            "migrator",
            "--auto",
            "--seed",
            "7",
            "--fail",
            "CustomerOrders=Syntax error in query",
            "--log",
            "both",
        ])
        .expect("valid arguments");
        assert!(cli.auto);
        assert_eq!(cli.seed, Some(7));
        assert_eq!(cli.source, "Northwind.accdb");
        assert_eq!(cli.log, Some(LogDestination::Both));
        assert_eq!(
            cli.faults,
            vec![FaultSpec {
                name: "CustomerOrders".into(),
                message: "Syntax error in query".into()
            }]
        );
    }

    #[test]
    fn rejects_malformed_fault() {
        assert!(Cli::try_parse_from(["migrator", "--fail", "Orders"]).is_err());
        assert!(Cli::try_parse_from(["migrator", "--fail", "=boom"]).is_err());
    }
}

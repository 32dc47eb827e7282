use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use snapkeep_btrfs::BtrfsProvider;
use snapkeep_core::{compute_plan, snapshot_name};
use snapkeep_provider::SnapshotProvider;
use snapkeep_runner::{doctor, run_once, Config};

#[derive(Parser)]
#[command(name = "snapkeep", version, about = "Tiered btrfs snapshot retention")]
struct Cli {
    #[command(flatten)]
    opts: GlobalOpts,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Args)]
struct GlobalOpts {
    /// Path to a snapkeep.toml; flags below override values from it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Mountpoint of the btrfs volume holding live subvolume and snapshots.
    #[arg(long, global = true)]
    mountpoint: Option<String>,

    /// Live subvolume name under the mountpoint.
    #[arg(long, global = true)]
    live_subvolume: Option<String>,

    /// Snapshot name prefix; snapshots are named {prefix}-{YYYY-MM-DD}.
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Take writable snapshots instead of read-only ones.
    #[arg(long, global = true)]
    writable: bool,

    /// Daily tier count.
    #[arg(long, global = true)]
    daily: Option<u32>,

    /// Weekly tier count.
    #[arg(long, global = true)]
    weekly: Option<u32>,

    /// Monthly tier count.
    #[arg(long, global = true)]
    monthly: Option<u32>,

    /// Weekday anchoring the weekly/monthly tiers, e.g. "monday".
    #[arg(long, global = true)]
    week_anchor: Option<String>,

    /// Override today's date (YYYY-MM-DD). Defaults to the local date.
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    /// Log verbosity.
    #[arg(long, global = true, value_enum, default_value = "info")]
    log_level: LogLevel,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Info,
    Debug,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Perform one retention run: ensure today's snapshot, prune the rest.
    Run {
        /// List and compute only; suppress snapshot creation and deletion.
        #[arg(long)]
        dry_run: bool,

        /// Print the run report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the retention plan for today without touching the volume.
    Plan {
        /// Print the plan as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List existing snapshots and the tiers that justify them.
    List,

    /// Check config and environment (mountpoint, live subvolume, btrfs).
    Doctor,

    /// Write a default snapkeep.toml.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.opts.log_level.as_filter()));
    fmt().with_target(false).with_env_filter(filter).init();

    let today = cli
        .opts
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    match cli.cmd {
        Command::Run { dry_run, json } => {
            let cfg = build_config(&cli.opts)?;
            doctor(&cfg)?;
            let provider = provider_for(&cfg);
            let policy = cfg.policy()?;
            let report = run_once(today, &policy, &provider, dry_run)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let verb = if report.dry_run { "would " } else { "" };
                match report.created {
                    Some(d) => println!("{}created {}", verb, snapshot_name(&cfg.volume.prefix, d)),
                    None => println!("snapshot for {} already exists", report.today),
                }
                println!("{}deleted {} snapshot(s)", verb, report.deleted.len());
            }
            if !report.all_deletions_succeeded() {
                error!(
                    "{} of {} deletions failed; they will be retried on the next run",
                    report.failed_deletions.len(),
                    report.failed_deletions.len() + report.deleted.len()
                );
            }
        }
        Command::Plan { json } => {
            let cfg = build_config(&cli.opts)?;
            let plan = compute_plan(today, &cfg.policy()?);
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!("retention plan for {}:", today);
                for date in plan.wanted() {
                    println!("  {}  [{}]", date, plan.tiers_for(date).join(", "));
                }
            }
        }
        Command::List => {
            let cfg = build_config(&cli.opts)?;
            let provider = provider_for(&cfg);
            let existing = provider.list()?;
            let plan = compute_plan(today, &cfg.policy()?);
            for date in existing {
                let tiers = plan.tiers_for(date);
                let status = if tiers.is_empty() {
                    "stale".to_string()
                } else {
                    tiers.join(", ")
                };
                println!("{}  [{}]", snapshot_name(&cfg.volume.prefix, date), status);
            }
        }
        Command::Doctor => {
            let cfg = build_config(&cli.opts)?;
            doctor(&cfg)?;
            println!("OK");
        }
        Command::Init { force } => {
            let path = cli
                .opts
                .config
                .clone()
                .unwrap_or_else(|| PathBuf::from("snapkeep.toml"));
            if path.exists() && !force {
                return Err(anyhow!("{} already exists (use --force to overwrite)", path.display()));
            }
            let mut cfg = Config::default();
            apply_overrides(&mut cfg, &cli.opts);
            cfg.validate()?;
            cfg.save_to(&path)?;
            println!("wrote {}", path.display());
        }
    }

    Ok(())
}

/// Config file (if any) with CLI flags layered on top, validated.
fn build_config(opts: &GlobalOpts) -> Result<Config> {
    let mut cfg = match &opts.config {
        Some(path) => Config::load_from(path)?,
        None => Config::default(),
    };
    apply_overrides(&mut cfg, opts);
    cfg.validate()?;
    Ok(cfg)
}

fn apply_overrides(cfg: &mut Config, opts: &GlobalOpts) {
    if let Some(mountpoint) = &opts.mountpoint {
        cfg.volume.mountpoint = mountpoint.clone();
    }
    if let Some(live) = &opts.live_subvolume {
        cfg.volume.live_subvolume = live.clone();
    }
    if let Some(prefix) = &opts.prefix {
        cfg.volume.prefix = prefix.clone();
    }
    if opts.writable {
        cfg.volume.read_only = false;
    }
    if let Some(daily) = opts.daily {
        cfg.retention.daily = daily;
    }
    if let Some(weekly) = opts.weekly {
        cfg.retention.weekly = weekly;
    }
    if let Some(monthly) = opts.monthly {
        cfg.retention.monthly = monthly;
    }
    if let Some(anchor) = &opts.week_anchor {
        cfg.retention.week_anchor = anchor.clone();
    }
}

fn provider_for(cfg: &Config) -> BtrfsProvider {
    BtrfsProvider::new(
        cfg.mountpoint_path(),
        cfg.volume.live_subvolume.clone(),
        cfg.volume.prefix.clone(),
        cfg.volume.read_only,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "snapkeep",
            "run",
            "--dry-run",
            "--mountpoint",
            "/mnt/data",
            "--prefix",
            "root-snap",
            "--daily",
            "14",
            "--week-anchor",
            "sun",
            "--writable",
        ]);
        let cfg = build_config(&cli.opts).unwrap();
        assert_eq!(cfg.volume.mountpoint, "/mnt/data");
        assert_eq!(cfg.volume.prefix, "root-snap");
        assert!(!cfg.volume.read_only);
        assert_eq!(cfg.retention.daily, 14);
        assert_eq!(cfg.policy().unwrap().week_anchor, chrono::Weekday::Sun);
    }

    #[test]
    fn bad_week_anchor_flag_is_rejected() {
        let cli = Cli::parse_from(["snapkeep", "plan", "--week-anchor", "someday"]);
        assert!(build_config(&cli.opts).is_err());
    }

    #[test]
    fn today_flag_parses_iso_dates() {
        let cli = Cli::parse_from(["snapkeep", "plan", "--today", "2024-03-15"]);
        assert_eq!(
            cli.opts.today,
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
    }
}

//! maturidade - journey maturity snapshots and timelines
//!
//! Builds maturity snapshots from imported facts and reads them back as
//! timelines, statistics, period comparisons and CSV exports.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/maturidade/data.db (~/.local/share/maturidade/data.db)
//! - Config: $XDG_CONFIG_HOME/maturidade/config.toml (~/.config/maturidade/config.toml)
//! - Logs: $XDG_STATE_HOME/maturidade/ (~/.local/state/maturidade/)

mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use maturidade_core::analytics::{self, AnalyticsContext, DateRange, RangePreset};
use maturidade_core::export::write_timeline_csv;
use maturidade_core::ingest::FactImporter;
use maturidade_core::{Config, Database, SnapshotType};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "maturidade")]
#[command(about = "Journey maturity snapshots, timelines and growth statistics")]
#[command(version)]
struct Args {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Import fact bundles (JSON files or directories of them)
    Import {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List the journey catalog
    Journeys,

    /// Build snapshots for the current (or given) bucket
    Snapshot {
        #[arg(long)]
        company: String,

        /// Journey id or slug (all journeys when omitted)
        #[arg(long)]
        journey: Option<String>,

        /// Snapshot type (default: from config)
        #[arg(long = "type")]
        snapshot_type: Option<SnapshotType>,

        /// Any date inside the bucket to build
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Build snapshots for every bucket in a date range
    Backfill {
        #[arg(long)]
        company: String,

        #[arg(long)]
        from: NaiveDate,

        #[arg(long)]
        to: NaiveDate,

        #[arg(long = "type")]
        snapshot_type: Option<SnapshotType>,
    },

    /// Show maturity over time
    Timeline {
        #[arg(long)]
        company: String,

        /// Journey id or slug (all journeys when omitted)
        #[arg(long)]
        journey: Option<String>,

        #[command(flatten)]
        range: RangeArgs,

        #[arg(long = "type")]
        snapshot_type: Option<SnapshotType>,

        /// Never build snapshots when the range is empty
        #[arg(long)]
        no_backfill: bool,
    },

    /// Company-wide statistics for a range
    Stats {
        #[arg(long)]
        company: String,

        #[command(flatten)]
        range: RangeArgs,

        #[arg(long = "type", conflicts_with = "all_types")]
        snapshot_type: Option<SnapshotType>,

        /// Sum across every snapshot type instead of one
        #[arg(long)]
        all_types: bool,
    },

    /// Compare a journey's maturity between two periods
    Compare {
        #[arg(long)]
        company: String,

        /// Journey id or slug
        #[arg(long)]
        journey: String,

        /// First period as START..END
        #[arg(long, value_parser = parse_range)]
        period1: DateRange,

        /// Second period as START..END
        #[arg(long, value_parser = parse_range)]
        period2: DateRange,
    },

    /// Export the timeline as CSV
    Export {
        #[arg(long)]
        company: String,

        #[command(flatten)]
        range: RangeArgs,

        #[arg(long = "type")]
        snapshot_type: Option<SnapshotType>,

        /// Output directory (default: from config, else current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete old snapshots
    Cleanup {
        /// Delete snapshots dated before this day
        #[arg(long, conflicts_with = "older_than_days")]
        before: Option<NaiveDate>,

        /// Delete snapshots older than this many days (default: from config)
        #[arg(long)]
        older_than_days: Option<u32>,

        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

/// Date range selection shared by the read commands.
#[derive(ClapArgs)]
struct RangeArgs {
    /// Preset range ending today: 30d, 3m, 6m or 1y (default: from config)
    #[arg(long, conflicts_with_all = ["from", "to"])]
    range: Option<RangePreset>,

    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,

    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,
}

impl RangeArgs {
    /// The selected range and its label for export filenames.
    fn resolve(&self, config: &Config, today: NaiveDate) -> (DateRange, String) {
        match (self.from, self.to) {
            (Some(start), Some(end)) => {
                let range = DateRange::new(start, end);
                (range, range.label())
            }
            _ => {
                let preset = self.range.unwrap_or(config.analytics.default_range);
                (preset.resolve(today), preset.label().to_string())
            }
        }
    }
}

fn parse_range(value: &str) -> std::result::Result<DateRange, String> {
    DateRange::parse(value).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        maturidade_core::logging::init(&config.logging).context("failed to initialize logging")?;

    // Open database
    let db_path = Config::database_path();
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        db = %db_path.display(),
        "maturidade started"
    );

    if args.verbose {
        eprintln!("Database: {}", db_path.display());
        eprintln!(
            "Log file: {}",
            maturidade_core::logging::current_log_file().display()
        );
    }

    let cli = Cli {
        db: &db,
        config: &config,
        format: args.format,
    };

    match args.command {
        Command::Import { paths } => cli.import(&paths),
        Command::Journeys => cli.journeys(),
        Command::Snapshot {
            company,
            journey,
            snapshot_type,
            date,
        } => cli.snapshot(&company, journey.as_deref(), snapshot_type, date),
        Command::Backfill {
            company,
            from,
            to,
            snapshot_type,
        } => cli.backfill(&company, from, to, snapshot_type),
        Command::Timeline {
            company,
            journey,
            range,
            snapshot_type,
            no_backfill,
        } => cli.timeline(&company, journey.as_deref(), &range, snapshot_type, no_backfill),
        Command::Stats {
            company,
            range,
            snapshot_type,
            all_types,
        } => cli.stats(&company, &range, snapshot_type, all_types),
        Command::Compare {
            company,
            journey,
            period1,
            period2,
        } => cli.compare(&company, &journey, period1, period2),
        Command::Export {
            company,
            range,
            snapshot_type,
            output,
        } => cli.export(&company, &range, snapshot_type, output),
        Command::Cleanup {
            before,
            older_than_days,
            yes,
        } => cli.cleanup(before, older_than_days, yes),
    }
}

struct Cli<'a> {
    db: &'a Database,
    config: &'a Config,
    format: OutputFormat,
}

impl Cli<'_> {
    fn ctx(&self) -> AnalyticsContext<'_> {
        AnalyticsContext::new(self.db)
    }

    fn snapshot_type(&self, requested: Option<SnapshotType>) -> SnapshotType {
        requested.unwrap_or(self.config.analytics.default_snapshot_type)
    }

    /// Resolve a journey id or slug; unknown values are used as ids as-is.
    fn journey_id(&self, id_or_slug: &str) -> Result<String> {
        Ok(self
            .db
            .find_journey(id_or_slug)?
            .map(|j| j.id)
            .unwrap_or_else(|| id_or_slug.to_string()))
    }

    fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn import(&self, paths: &[PathBuf]) -> Result<()> {
        let mut files = Vec::new();
        for path in paths {
            let found = FactImporter::discover(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            files.extend(found);
        }

        let result = FactImporter::new(self.db)
            .import_paths(&files)
            .context("fact import failed")?;

        if self.format == OutputFormat::Json {
            self.print_json(&result)?;
        } else {
            render::import_result(&result);
        }

        if !result.errors.is_empty() {
            anyhow::bail!("{} file(s) failed to import", result.errors.len());
        }
        Ok(())
    }

    fn journeys(&self) -> Result<()> {
        let journeys = self.db.list_journeys()?;
        if self.format == OutputFormat::Json {
            return self.print_json(&journeys);
        }

        if journeys.is_empty() {
            println!("No journeys found in database.");
            println!("Run 'maturidade import <PATH>' first to load facts.");
            return Ok(());
        }
        for journey in &journeys {
            println!("{:>3}  {:<20} {}", journey.position, journey.slug, journey.name);
        }
        Ok(())
    }

    fn snapshot(
        &self,
        company: &str,
        journey: Option<&str>,
        snapshot_type: Option<SnapshotType>,
        date: Option<NaiveDate>,
    ) -> Result<()> {
        let snapshot_type = self.snapshot_type(snapshot_type);
        let now = Utc::now();

        if let Some(journey) = journey {
            let journey_id = self.journey_id(journey)?;
            let snapshot =
                analytics::build_snapshot(self.ctx(), company, &journey_id, snapshot_type, date, now)
                    .context("failed to build snapshot")?;
            if self.format == OutputFormat::Json {
                return self.print_json(&snapshot);
            }
            render::snapshot(&snapshot);
            return Ok(());
        }

        let result = analytics::build_all_snapshots(self.ctx(), company, snapshot_type, date, now)
            .context("failed to build snapshots")?;
        if self.format == OutputFormat::Json {
            self.print_json(&result)?;
        } else {
            render::build_result(&result);
        }
        Ok(())
    }

    fn backfill(
        &self,
        company: &str,
        from: NaiveDate,
        to: NaiveDate,
        snapshot_type: Option<SnapshotType>,
    ) -> Result<()> {
        let snapshot_type = self.snapshot_type(snapshot_type);
        let now = Utc::now();
        let dates = analytics::backfill_dates(snapshot_type, from, to, now);

        let pb = if self.format == OutputFormat::Text {
            ProgressBar::new(dates.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .context("invalid progress template")?
                .progress_chars("#>-"),
        );

        let mut results = Vec::with_capacity(dates.len());
        for date in dates {
            pb.set_message(date.to_string());
            let result =
                analytics::build_all_snapshots(self.ctx(), company, snapshot_type, Some(date), now)
                    .with_context(|| format!("failed to build snapshots for {}", date))?;
            results.push(result);
            pb.inc(1);
        }
        pb.finish_and_clear();

        if self.format == OutputFormat::Json {
            return self.print_json(&results);
        }
        render::backfill(&results);
        Ok(())
    }

    fn timeline(
        &self,
        company: &str,
        journey: Option<&str>,
        range: &RangeArgs,
        snapshot_type: Option<SnapshotType>,
        no_backfill: bool,
    ) -> Result<()> {
        let snapshot_type = self.snapshot_type(snapshot_type);
        let now = Utc::now();
        let (range, _) = range.resolve(self.config, now.date_naive());

        if let Some(journey) = journey {
            let journey_id = self.journey_id(journey)?;
            let points = analytics::get_journey_timeline(
                self.ctx(),
                company,
                &journey_id,
                range.start,
                range.end,
                snapshot_type,
            )?;
            if self.format == OutputFormat::Json {
                return self.print_json(&points);
            }
            render::journey_timeline(&points);
            return Ok(());
        }

        let backfill = self.config.analytics.backfill_on_empty && !no_backfill;
        let dashboard =
            analytics::load_dashboard(self.ctx(), company, range, snapshot_type, now, backfill)
                .context("failed to load timeline")?;
        if self.format == OutputFormat::Json {
            return self.print_json(&dashboard);
        }
        render::dashboard(&dashboard);
        Ok(())
    }

    fn stats(
        &self,
        company: &str,
        range: &RangeArgs,
        snapshot_type: Option<SnapshotType>,
        all_types: bool,
    ) -> Result<()> {
        let (range, _) = range.resolve(self.config, Utc::now().date_naive());
        let stats = if all_types {
            analytics::get_company_maturity_stats(self.ctx(), company, range.start, range.end)?
        } else {
            analytics::get_company_maturity_stats_by_type(
                self.ctx(),
                company,
                range.start,
                range.end,
                self.snapshot_type(snapshot_type),
            )?
        };

        if self.format == OutputFormat::Json {
            return self.print_json(&stats);
        }
        render::stats(&stats.rounded());
        Ok(())
    }

    fn compare(
        &self,
        company: &str,
        journey: &str,
        period1: DateRange,
        period2: DateRange,
    ) -> Result<()> {
        let journey_id = self.journey_id(journey)?;
        let comparison = analytics::compare_maturity_periods(
            self.ctx(),
            company,
            &journey_id,
            period1.start,
            period1.end,
            period2.start,
            period2.end,
        )?;

        if self.format == OutputFormat::Json {
            return self.print_json(&comparison);
        }
        render::comparison(&comparison);
        Ok(())
    }

    fn export(
        &self,
        company: &str,
        range: &RangeArgs,
        snapshot_type: Option<SnapshotType>,
        output: Option<PathBuf>,
    ) -> Result<()> {
        let (range, label) = range.resolve(self.config, Utc::now().date_naive());
        let dir = self.config.export.resolve_dir(output.as_deref());
        let summary = write_timeline_csv(
            self.ctx(),
            company,
            range,
            &label,
            self.snapshot_type(snapshot_type),
            &dir,
        )
        .with_context(|| format!("failed to export to {}", dir.display()))?;

        if self.format == OutputFormat::Json {
            return self.print_json(&summary);
        }
        println!(
            "Exported {} row(s) x {} journey(s) to {}",
            summary.rows,
            summary.journeys,
            summary.path.display()
        );
        Ok(())
    }

    fn cleanup(
        &self,
        before: Option<NaiveDate>,
        older_than_days: Option<u32>,
        yes: bool,
    ) -> Result<()> {
        let cutoff = match before {
            Some(date) => date,
            None => analytics::retention_cutoff(
                Utc::now().date_naive(),
                older_than_days.unwrap_or(self.config.analytics.retention_days),
            ),
        };

        if !yes {
            anyhow::bail!(
                "refusing to delete snapshots dated before {} without --yes",
                cutoff
            );
        }

        let deleted = analytics::delete_old_snapshots(self.ctx(), cutoff)?;

        #[derive(Serialize)]
        struct CleanupResult {
            cutoff: NaiveDate,
            deleted: usize,
        }

        if self.format == OutputFormat::Json {
            return self.print_json(&CleanupResult { cutoff, deleted });
        }
        println!("Deleted {} snapshot(s) dated before {}", deleted, cutoff);
        Ok(())
    }
}

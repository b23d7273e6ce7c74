use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::warn;

mod classes;
mod config;
mod data;
mod filter;
mod ingest;
mod logging;
mod models;
mod report;
mod session;
mod summary;

use classes::ClassGate;
use config::IngestConfig;
use filter::{SortKey, StudentFilter};
use models::DateRange;
use report::ReportContext;
use session::DatasetSession;

#[derive(Parser)]
#[command(name = "attendance-dashboard")]
#[command(about = "Tardiness and absence summaries from school attendance exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Upload {
    /// Attendance export (.csv, .xlsx or .xls)
    #[arg(long)]
    file: PathBuf,
    #[arg(long, default_value = "")]
    start: String,
    #[arg(long, default_value = "")]
    end: String,
}

impl Upload {
    fn range(&self) -> DateRange {
        DateRange::new(&self.start, &self.end)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest an export and print its rows as JSON
    Rows {
        #[command(flatten)]
        upload: Upload,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show whether the export supports comparing classes
    Classes {
        #[command(flatten)]
        upload: Upload,
    },
    /// Render the filtered student table with its summary row
    Report {
        /// Processed data (studentStats, detailedStats, schoolYearDetails, weeklyDetails)
        #[arg(long)]
        data: PathBuf,
        /// Raw export; when given, class comparison follows its class column
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Weeks in the reporting window; defaults to the longest series in the data
        #[arg(long)]
        weeks: Option<usize>,
        #[arg(long = "class")]
        classes: Vec<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        min_tardies: Option<u32>,
        #[arg(long)]
        min_absences: Option<u32>,
        #[arg(long, value_enum, default_value_t = SortKey::Name)]
        sort: SortKey,
        #[arg(long)]
        desc: bool,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List every entry recorded for one student
    Details {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        student: String,
    },
    /// Check processed data for inconsistent students and week counts
    Validate {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        weeks: Option<usize>,
    },
}

fn emit(text: &str, out: Option<&Path>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Written to {}.", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing();

    let cli = Cli::parse();
    let mut session = DatasetSession::new(IngestConfig::from_env());

    match cli.command {
        Commands::Rows { upload, out } => {
            session.load(&upload.file, &upload.range()).await?;
            let rows = session.rows().map(|set| set.rows.as_slice()).unwrap_or_default();
            let json = serde_json::to_string_pretty(rows)?;
            emit(&format!("{json}\n"), out.as_deref())?;
        }
        Commands::Classes { upload } => {
            session.load(&upload.file, &upload.range()).await?;
            let availability = session.comparison_availability();
            if let Some(gate) = session.class_gate() {
                let classes: Vec<&str> = gate.classes().collect();
                println!("Column: {}", gate.column().unwrap_or("(none)"));
                println!("Classes ({}): {}", classes.len(), classes.join(", "));
            }
            match availability.message {
                None => println!("Class comparison available."),
                Some(message) => println!("Class comparison unavailable: {message}."),
            }
        }
        Commands::Report {
            data: data_path,
            file,
            start,
            end,
            weeks,
            classes,
            search,
            min_tardies,
            min_absences,
            sort,
            desc,
            format,
            out,
        } => {
            let mut processed = data::load(&data_path)?;
            let range = match (start, end) {
                (None, None) => None,
                (start, end) => Some(DateRange::new(
                    start.unwrap_or_default(),
                    end.unwrap_or_default(),
                )),
            };

            let comparison = match &file {
                Some(file) => {
                    let range = range.clone().unwrap_or_default();
                    session.load(file, &range).await?;
                    session.comparison_availability()
                }
                None => ClassGate::from_labels(processed.classes()).availability(),
            };

            let weeks = weeks.unwrap_or_else(|| processed.week_count());
            processed.pad_weeks(weeks);

            let student_filter = StudentFilter {
                classes,
                search,
                min_unexcused_tardies: min_tardies,
                min_unexcused_absences: min_absences,
            };
            let mut rows = student_filter.apply(&processed.student_stats);
            filter::sort_rows(&mut rows, sort, desc);

            let ctx = ReportContext {
                range: range.as_ref(),
                weeks,
                comparison: &comparison,
            };
            let text = match format {
                Format::Markdown => report::build_report(&ctx, &rows, &processed),
                Format::Json => format!("{}\n", report::build_json(&ctx, &rows, &processed)?),
            };
            emit(&text, out.as_deref())?;
        }
        Commands::Details {
            data: data_path,
            student,
        } => {
            let processed = data::load(&data_path)?;
            let details = processed
                .detailed_stats
                .get(&student)
                .with_context(|| format!("no student named '{student}' in {}", data_path.display()))?;
            print!("{}", report::render_details(&student, details));
        }
        Commands::Validate {
            data: data_path,
            weeks,
        } => {
            let processed = data::load(&data_path)?;
            let weeks = weeks.unwrap_or_else(|| processed.week_count());
            let issues = processed.validate(weeks);

            if issues.is_empty() {
                println!(
                    "{} students consistent across all maps ({} weeks).",
                    processed.student_stats.len(),
                    weeks
                );
                return Ok(());
            }

            for issue in &issues {
                warn!(%issue, "inconsistent processed data");
                println!("- {issue}");
            }
            anyhow::bail!("{} issues found in {}", issues.len(), data_path.display());
        }
    }

    Ok(())
}

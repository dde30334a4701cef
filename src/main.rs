use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use refdata_resolve::models::{IssueKind, IssueStatus, LoadCtx, SegmentCounts};
use refdata_resolve::parse::NameParser;
use refdata_resolve::pipeline::{self, Segment};
use refdata_resolve::progress::{format_duration, set_log_only};
use refdata_resolve::resolve::Resolver;
use refdata_resolve::source::{source_ops, SourceOps, SOURCE_NAMES};
use refdata_resolve::store::Store;

#[derive(Parser)]
#[command(name = "refdata-resolve")]
#[command(about = "Resolve reference-data name listings into a person registry")]
struct Cli {
    /// Registry database file
    #[arg(long, global = true, default_value = "refdata.db")]
    db: PathBuf,

    /// Hide progress bars for tail-friendly output
    #[arg(long, global = true)]
    log_only: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the registry schema
    Init {
        /// Drop and recreate existing tables
        #[arg(long)]
        force: bool,
    },
    /// Load fetched source segments into the registry
    Load {
        /// Directory holding fetched segments (data_dir/source/category/)
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Source name
        source: String,

        /// Entity category (composer, conductor, performer)
        category: String,

        /// Key spec: single key, comma list, or range (e.g. "a-f", "3-17").
        /// Defaults to the source's full key space.
        #[arg(long)]
        keys: Option<String>,

        /// Parse and print without writing to the registry
        #[arg(long)]
        dryrun: bool,
    },
    /// List conflict records
    Conflicts {
        /// Filter by status (open, in_process, resolved, withdrawn)
        #[arg(long)]
        status: Option<String>,
    },
    /// List failure records
    Failures {
        #[arg(long)]
        status: Option<String>,
    },
    /// Update the triage status of a conflict or failure record
    Triage {
        /// Which log the record lives in (conflict or failure)
        kind: String,

        /// Record id
        id: i64,

        /// New status (open, in_process, resolved, withdrawn)
        status: String,

        /// Person id the record was resolved into
        #[arg(long)]
        parent: Option<i64>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    set_log_only(cli.log_only);

    match cli.command {
        Command::Init { force } => {
            let store = Store::open(&cli.db)?;
            store.create_schema(force)?;
            info!("schema ready in {}", cli.db.display());
            Ok(())
        }
        Command::Load { data_dir, source, category, keys, dryrun } => {
            cmd_load(&cli.db, &data_dir, &source, &category, keys.as_deref(), dryrun)
        }
        Command::Conflicts { status } => cmd_issues(&cli.db, IssueKind::Conflict, status.as_deref()),
        Command::Failures { status } => cmd_issues(&cli.db, IssueKind::Failure, status.as_deref()),
        Command::Triage { kind, id, status, parent } => {
            cmd_triage(&cli.db, &kind, id, &status, parent)
        }
    }
}

fn cmd_load(
    db: &Path,
    data_dir: &Path,
    source: &str,
    category: &str,
    keys: Option<&str>,
    dryrun: bool,
) -> Result<()> {
    let ops = source_ops(source)
        .with_context(|| format!("unknown source '{}' (known: {})", source, SOURCE_NAMES.join(", ")))?;
    let keys = match keys {
        Some(spec) => ops.expand_keys(spec)?,
        None => ops.default_keys(),
    };

    let start = Instant::now();
    let segments = read_segments(data_dir, ops, category, &keys)?;
    if segments.is_empty() {
        bail!(
            "no segment files under {}",
            data_dir.join(source).join(category).display()
        );
    }
    info!("{} segment(s) to process", segments.len());

    let results = if dryrun {
        pipeline::dryrun_category(&NameParser::default(), ops, category, &segments)?
    } else {
        let store = Store::open(db)?;
        let resolver = Resolver::new(&store, NameParser::default());
        pipeline::load_category(&resolver, ops, category, &segments)?
    };

    let mut total = SegmentCounts::default();
    for (_, counts) in &results {
        total.merge(*counts);
    }
    info!(
        "done in {}: {} inserted, {} updated, {} skipped",
        format_duration(start.elapsed()),
        total.inserted,
        total.updated,
        total.skipped
    );
    Ok(())
}

/// Read the segment files for the requested keys. A missing file for a key is
/// skipped with a log line; sources do not publish every key.
fn read_segments(
    data_dir: &Path,
    ops: &dyn SourceOps,
    category: &str,
    keys: &[String],
) -> Result<Vec<Segment>> {
    let dir = data_dir.join(ops.name()).join(category);
    let mut segments = Vec::new();
    for key in keys {
        let file_name = format!("{}:{}.json", category, key);
        let path = dir.join(&file_name);
        if !path.exists() {
            info!("no segment for key '{}', skipping", key);
            continue;
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let doc = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        segments.push(Segment {
            ctx: LoadCtx {
                file: file_name,
                source: ops.name().to_string(),
                source_date: file_date(&path)?,
            },
            doc,
        });
    }
    Ok(segments)
}

/// Datestamp of a segment: the file's modification time, UTC date only.
fn file_date(path: &Path) -> Result<String> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("stat {}", path.display()))?;
    let dt: DateTime<Utc> = modified.into();
    Ok(dt.format("%Y-%m-%d").to_string())
}

fn cmd_issues(db: &Path, kind: IssueKind, status: Option<&str>) -> Result<()> {
    let status = status
        .map(|s| IssueStatus::parse(s).with_context(|| format!("unknown status '{}'", s)))
        .transpose()?;
    let store = Store::open(db)?;
    let issues = store.list_issues(kind, status)?;
    for issue in &issues {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            issue.id, issue.status, issue.operation, issue.entity_str, issue.entity_info
        );
    }
    info!("{} record(s)", issues.len());
    Ok(())
}

fn cmd_triage(db: &Path, kind: &str, id: i64, status: &str, parent: Option<i64>) -> Result<()> {
    let kind = match kind {
        "conflict" => IssueKind::Conflict,
        "failure" => IssueKind::Failure,
        _ => bail!("unknown record kind '{}' (conflict or failure)", kind),
    };
    let status = IssueStatus::parse(status)
        .with_context(|| format!("unknown status '{}'", status))?;
    let store = Store::open(db)?;
    store.set_issue_status(kind, id, status, parent)?;
    info!("{} record {} -> {}", kind.table(), id, status.as_str());
    Ok(())
}

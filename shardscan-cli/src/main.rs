use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use shardscan::{search, ConfigOverrides, SearchConfig, SearchOutput, SourceBytes};
use std::io::{self, BufWriter, Write};
use std::{num::NonZeroUsize, path::PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Exact byte pattern to search for
    pattern: String,

    /// File to search
    file: PathBuf,

    /// Number of workers to partition the file across
    #[arg(short = 'j', long = "workers")]
    workers: Option<NonZeroUsize>,

    /// Trailing bytes of the file to leave out of the search (e.g. 1 for a final newline)
    #[arg(short = 'x', long)]
    exclude_trailing: Option<usize>,

    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the offsets as a JSON array, even when the config file asks for stats
    #[arg(long, conflicts_with = "stats")]
    json: bool,

    /// Show only statistics, not offsets
    #[arg(short, long)]
    stats: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    log_level: Option<String>,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = SearchConfig::load_from(cli.config.as_deref())?.merge_with_cli(ConfigOverrides {
        worker_count: cli.workers,
        exclude_trailing: cli.exclude_trailing,
        log_level: cli.log_level,
        stats_only: cli.stats,
    });
    config.validate()?;
    init_tracing(&config.log_level);

    let source = SourceBytes::open(&cli.file)
        .with_context(|| format!("cannot search {}", cli.file.display()))?;
    debug!(
        "{} {} bytes from {}",
        if source.is_mapped() { "Mapped" } else { "Read" },
        source.len(),
        cli.file.display()
    );
    let output = search(&config, &source, cli.pattern.as_bytes())?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if cli.json {
        serde_json::to_writer(&mut out, &output.result)?;
        writeln!(out)?;
    } else if config.stats_only {
        print_stats(&mut out, &output)?;
    } else {
        print_offsets(&mut out, &output)?;
    }
    out.flush()?;
    Ok(())
}

fn print_offsets(out: &mut impl Write, output: &SearchOutput) -> io::Result<()> {
    for offset in output.offsets() {
        writeln!(out, "{}", offset)?;
    }
    Ok(())
}

fn print_stats(out: &mut impl Write, output: &SearchOutput) -> io::Result<()> {
    let stats = &output.stats;
    writeln!(
        out,
        "{} {}",
        "Matches:".green().bold(),
        output.total_matches()
    )?;
    writeln!(out, "{} {}", "Workers:".cyan(), output.workers)?;
    writeln!(
        out,
        "{} {} bytes",
        "Searchable:".cyan(),
        output.searchable_len
    )?;
    writeln!(
        out,
        "{} {} bytes (largest shard {} bytes)",
        "Scattered:".cyan(),
        stats.bytes_scattered,
        stats.largest_shard
    )?;
    writeln!(
        out,
        "{} {}",
        "Positions examined:".cyan(),
        stats.positions_examined
    )?;
    Ok(())
}

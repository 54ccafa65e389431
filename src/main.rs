use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use kira_regulons::input::overrides::load_threshold_overrides;
use kira_regulons::input::{load_expression, load_input};
use kira_regulons::logging::init_logging;
use kira_regulons::pipeline::stage6_report::{ReportContext, write_reports};
use kira_regulons::regulons::loader::load_regulons;
use kira_regulons::{CancelToken, ScoringConfig, ScoringInput, run_scoring};

#[derive(Parser, Debug)]
#[command(name = "kira-regulons", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score regulon activity per cell, binarize it and, given cell
    /// categories, compute regulon specificity
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// 10x matrix directory (matrix.mtx, features.tsv, barcodes.tsv; optionally gzipped)
    #[arg(long)]
    input: PathBuf,

    /// Regulon definitions (.gmt or two-column regulon<TAB>gene)
    #[arg(long)]
    regulons: PathBuf,

    /// Output directory
    #[arg(long)]
    out: PathBuf,

    /// Per-cell metadata TSV; first column is the barcode
    #[arg(long)]
    meta: Option<PathBuf>,

    /// Metadata column used as cell category for specificity scores
    #[arg(long, default_value = "cell_type")]
    group_by: String,

    /// JSON scoring configuration; omitted sections keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// TSV of regulon<TAB>threshold replacing estimated thresholds
    #[arg(long)]
    threshold_override: Option<PathBuf>,

    /// Worker threads (0 = all cores)
    #[arg(long, default_value_t = 0)]
    threads: usize,
}

fn main() {
    init_logging("info");
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run_command(&args),
    }
}

fn run_command(args: &RunArgs) -> Result<(), String> {
    if args.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build_global()
            .map_err(|e| e.to_string())?;
    }
    tracing::info!(threads = rayon::current_num_threads(), "thread pool ready");

    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read config {}: {e}", path.display()))?;
            ScoringConfig::from_json(&text).map_err(|e| e.to_string())?
        }
        None => ScoringConfig::default_v1(),
    };

    let overrides: BTreeMap<String, f32> = match &args.threshold_override {
        Some(path) => load_threshold_overrides(path).map_err(|e| e.to_string())?,
        None => BTreeMap::new(),
    };

    let bundle = load_input(&args.input, args.meta.as_deref()).map_err(|e| e.to_string())?;
    let annotation = match &bundle.meta {
        Some(meta) => Some(meta.annotation(&args.group_by).map_err(|e| e.to_string())?),
        None => None,
    };
    let expr = load_expression(&bundle).map_err(|e| e.to_string())?;
    let regulons = load_regulons(&args.regulons).map_err(|e| e.to_string())?;

    let cancel = CancelToken::new();
    let input = ScoringInput {
        expr: &expr,
        regulons: &regulons,
        annotation: annotation.as_ref(),
        overrides: &overrides,
    };
    let output = run_scoring(&input, &config, &cancel)
        .and_then(|out| out.complete())
        .map_err(|e| e.to_string())?;

    let ctx = ReportContext {
        n_genes: expr.n_genes(),
        n_regulons_defined: regulons.len(),
        annotation_column: annotation.as_ref().map(|_| args.group_by.as_str()),
        n_overrides: overrides.len(),
        config: &config,
    };
    write_reports(&output, &ctx, &args.out).map_err(|e| e.to_string())?;

    if !output.diagnostics.is_empty() {
        tracing::warn!(
            count = output.diagnostics.len(),
            "diagnostics recorded; see summary.json"
        );
    }
    Ok(())
}

#[cfg(test)]
#[path = "../tests/src_inline/main_inline.rs"]
mod tests;

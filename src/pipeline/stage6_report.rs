use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::model::config::ScoringConfig;
use crate::pipeline::ScoringOutput;
use crate::report::json::{InputSummary, SummaryData, ToolMeta, render_summary_json};
use crate::report::regulon_stats;
use crate::report::text::render_report_text;
use crate::report::tsv::{
    render_audits_tsv, render_auc_tsv, render_binary_tsv, render_rss_tsv, render_thresholds_tsv,
};

#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    pub n_genes: usize,
    pub n_regulons_defined: usize,
    pub annotation_column: Option<&'a str>,
    pub n_overrides: usize,
    pub config: &'a ScoringConfig,
}

/// Writes every result table plus `summary.json` and `report.txt` into
/// `out_dir`, creating it when needed. `rss.tsv` is written only when RSS
/// was computed.
pub fn write_reports(
    output: &ScoringOutput,
    ctx: &ReportContext<'_>,
    out_dir: &Path,
) -> std::io::Result<()> {
    fs::create_dir_all(out_dir)?;

    write_text(&out_dir.join("auc.tsv"), &render_auc_tsv(&output.auc))?;
    write_text(
        &out_dir.join("thresholds.tsv"),
        &render_thresholds_tsv(&output.thresholds, &output.binary),
    )?;
    write_text(&out_dir.join("binary.tsv"), &render_binary_tsv(&output.binary))?;
    write_text(&out_dir.join("regulons.tsv"), &render_audits_tsv(&output.audits))?;
    if let Some(rss) = &output.rss {
        write_text(&out_dir.join("rss.tsv"), &render_rss_tsv(rss))?;
    }

    let summary = build_summary(output, ctx);
    let json = render_summary_json(&summary).map_err(std::io::Error::other)?;
    write_text(&out_dir.join("summary.json"), &json)?;
    write_text(
        &out_dir.join("report.txt"),
        &render_report_text(&summary, output.rss.as_ref()),
    )?;

    tracing::info!(out = %out_dir.display(), "reports written");
    Ok(())
}

pub fn build_summary(output: &ScoringOutput, ctx: &ReportContext<'_>) -> SummaryData {
    SummaryData {
        tool: ToolMeta {
            name: "kira-regulons".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        input: InputSummary {
            n_cells: output.auc.n_cells(),
            n_genes: ctx.n_genes,
            n_regulons_defined: ctx.n_regulons_defined,
            n_regulons_scored: output.auc.n_regulons(),
            annotation_column: ctx.annotation_column.map(str::to_string),
        },
        config: ctx.config.clone(),
        cutoff_rank: output.cutoff_rank,
        cancelled: output.cancelled,
        n_bimodal: output.thresholds.n_confident(),
        n_overrides: ctx.n_overrides,
        regulons: regulon_stats(&output.auc, &output.thresholds, &output.binary),
        diagnostics: output.diagnostics.clone(),
    }
}

fn write_text(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(contents.as_bytes())?;
    w.flush()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage6_report.rs"]
mod tests;

use std::io::{BufRead, Write};
use std::path::Path;

use memescope_pipeline::LiveOrchestrator;

pub(crate) const DEFAULT_REQUEST: &str = "分析2025年全网最火的梗";
pub(crate) const PREVIEW_CHARS: usize = 2000;

/// Runs the pipeline and reports the outcome on stdout/stderr.
///
/// A failed run is reported, not propagated: only setup problems should
/// produce a non-zero exit status.
pub(crate) async fn execute(
    orchestrator: &LiveOrchestrator,
    request: Option<String>,
    preview: bool,
) -> anyhow::Result<()> {
    orchestrator.store().ensure_dirs().await?;

    let request = match request {
        Some(r) if !r.trim().is_empty() => r,
        _ => {
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            read_request(&mut stdin.lock(), &mut stdout)?
        }
    };

    match orchestrator.run(&request).await {
        Ok(summary) => {
            tracing::info!(
                run_id = %summary.run_id,
                memes = summary.meme_count,
                report = %summary.report_path.display(),
                "pipeline run complete"
            );
            println!("report: {}", summary.report_path.display());
            println!(
                "plan: {} ({}), memes: {}",
                summary.plan.intent, summary.plan.origin, summary.meme_count
            );
            if preview {
                if let Some(text) = load_preview(&summary.report_path).await {
                    println!("\n{text}");
                }
            }
        }
        Err(e) => {
            let err = anyhow::Error::new(e);
            tracing::error!(error = %err, "pipeline run failed");
            // `{:?}` prints the cause chain, plus the backtrace under RUST_BACKTRACE
            eprintln!("pipeline run failed: {err:?}");
        }
    }
    Ok(())
}

/// Prompts for a request; EOF or a blank line selects [`DEFAULT_REQUEST`].
pub(crate) fn read_request(
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> std::io::Result<String> {
    write!(output, "research request [{DEFAULT_REQUEST}]: ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let line = line.trim();
    Ok(if line.is_empty() {
        DEFAULT_REQUEST.to_owned()
    } else {
        line.to_owned()
    })
}

/// Reads the report for `--preview`; a read failure is logged, not fatal.
pub(crate) async fn load_preview(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(report) => Some(preview_text(&report)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read report for preview");
            None
        }
    }
}

pub(crate) fn preview_text(report: &str) -> String {
    let mut out: String = report.chars().take(PREVIEW_CHARS).collect();
    if report.chars().nth(PREVIEW_CHARS).is_some() {
        out.push_str("\n...");
    }
    out
}

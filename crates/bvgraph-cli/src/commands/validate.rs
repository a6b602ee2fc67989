//! Graph validation command.

use std::path::Path;

use anyhow::Result;
use bvgraph_engine::{GraphView, LoadConfig, VerifyOptions, verify};
use comfy_table::{Cell, Color};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::OutputFormat;
use crate::output::{self, Format};

/// Progress is redrawn every this many lists.
const PROGRESS_STEP: u64 = 4096;

/// Validation result output.
#[derive(Serialize)]
struct ValidationOutput {
    valid: bool,
    nodes_checked: u64,
    arcs_seen: u64,
    error_count: usize,
    warning_count: usize,
    errors: Vec<IssueOutput>,
    warnings: Vec<IssueOutput>,
}

/// Error or warning output.
#[derive(Serialize)]
struct IssueOutput {
    code: String,
    message: String,
    context: Option<String>,
}

/// Run the validate command.
pub fn run(path: &Path, sample_stride: u64, format: OutputFormat, quiet: bool) -> Result<()> {
    let graph = GraphView::open(path, &LoadConfig::random_access())?;

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(graph.vertex_count());
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} lists")?,
        );
        bar
    };

    let options = VerifyOptions {
        sample_stride,
        ..VerifyOptions::default()
    };
    let result = verify(&graph, &options, |done| {
        if done % PROGRESS_STEP == 0 {
            progress.set_position(done);
        }
    });
    progress.finish_and_clear();

    let to_output = |list: &[bvgraph_engine::Issue]| {
        list.iter()
            .map(|i| IssueOutput {
                code: i.code.clone(),
                message: i.message.clone(),
                context: i.context.clone(),
            })
            .collect::<Vec<_>>()
    };
    let output = ValidationOutput {
        valid: result.is_valid(),
        nodes_checked: result.nodes_checked,
        arcs_seen: result.arcs_seen,
        error_count: result.errors.len(),
        warning_count: result.warnings.len(),
        errors: to_output(&result.errors),
        warnings: to_output(&result.warnings),
    };

    let fmt: Format = format.into();
    match fmt {
        Format::Json => output::print_json(&output, quiet)?,
        Format::Table => {
            if !quiet {
                if output.valid {
                    println!("{}", output::verdict("✓ Graph is valid", true));
                } else {
                    println!("{}", output::verdict("✗ Graph has errors", false));
                }

                println!(
                    "\nLists: {}, Arcs: {}, Errors: {}, Warnings: {}\n",
                    output.nodes_checked,
                    output.arcs_seen,
                    output.error_count,
                    output.warning_count
                );

                for (title, issues, color) in [
                    ("Errors", &output.errors, Color::Red),
                    ("Warnings", &output.warnings, Color::Yellow),
                ] {
                    if issues.is_empty() {
                        continue;
                    }
                    let mut table = output::table_with_header(&["Code", "Message", "Context"]);
                    for issue in issues {
                        table.add_row(vec![
                            Cell::new(&issue.code).fg(color),
                            Cell::new(&issue.message),
                            Cell::new(issue.context.as_deref().unwrap_or("-")),
                        ]);
                    }
                    println!("{title}:\n{table}\n");
                }
            }
        }
    }

    // Return error exit code if validation failed
    if !output.valid {
        std::process::exit(1);
    }

    Ok(())
}

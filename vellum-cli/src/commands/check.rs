//! Check command implementation.

use anyhow::{Context as _, Result};
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use vellum_core::{CallState, Node, OutputFormat, Pipeline, PipelineOptions};
use vellum_stdlib::standard_libraries;

struct Diagnostic {
    function: String,
    message: String,
}

/// Compiles a document in lenient mode and reports every failing call site,
/// without emitting output. Exits non-zero when any diagnostic is found.
pub fn check(input: &Path, json: bool) -> Result<ExitCode> {
    let source = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let options = PipelineOptions {
        format: OutputFormat::PlainText,
        working_directory: input.parent().map(|p| p.to_path_buf()),
        ..Default::default()
    };

    let mut pipeline = Pipeline::new(standard_libraries(), options);
    pipeline
        .execute(&source)
        .with_context(|| format!("compilation of {} failed", input.display()))?;

    let diagnostics: Vec<Diagnostic> = pipeline
        .context()
        .calls()
        .iter()
        .filter_map(|site| match &site.state {
            CallState::Expanded(children) => children.iter().find_map(|node| match node {
                Node::ErrorBox { message, .. } => Some(Diagnostic {
                    function: site.name.clone(),
                    message: message.clone(),
                }),
                _ => None,
            }),
            CallState::Pending => None,
        })
        .collect();

    if json {
        let report: Vec<serde_json::Value> = diagnostics
            .iter()
            .map(|d| serde_json::json!({ "function": d.function, "message": d.message }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if diagnostics.is_empty() {
        println!("{}: no problems found", input.display());
    } else {
        for diagnostic in &diagnostics {
            println!(
                "{}: error in '.{}': {}",
                input.display(),
                diagnostic.function,
                diagnostic.message
            );
        }
    }

    Ok(if diagnostics.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

//! Compile command implementation.

use anyhow::{Context as _, Result};
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use vellum_core::{ErrorPolicy, OutputFormat, Pipeline, PipelineOptions};
use vellum_stdlib::standard_libraries;

/// Compiles a document and writes the emitted resources next to the input
/// (or into `output`).
pub fn compile(
    input: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    strict: bool,
    wrap: bool,
) -> Result<ExitCode> {
    let source = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let working_directory = input.parent().map(|p| p.to_path_buf());
    let options = PipelineOptions {
        error_policy: if strict {
            ErrorPolicy::Strict
        } else {
            ErrorPolicy::Lenient
        },
        format,
        wrap_output: wrap,
        resource_name: input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned()),
        working_directory,
    };

    tracing::info!("compiling {}", input.display());
    let mut pipeline = Pipeline::new(standard_libraries(), options);
    let resources = pipeline
        .execute(&source)
        .with_context(|| format!("compilation of {} failed", input.display()))?;

    let target_dir = output
        .map(|p| p.to_path_buf())
        .or_else(|| input.parent().map(|p| p.to_path_buf()))
        .unwrap_or_default();
    fs::create_dir_all(&target_dir)
        .with_context(|| format!("failed to create {}", target_dir.display()))?;

    for resource in &resources {
        let path = target_dir.join(resource.file_name());
        fs::write(&path, &resource.content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("wrote {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}

//! Data-reading functions.
//!
//! Reads run synchronously and fail fast with a descriptive error; there is
//! no retry.

use std::path::PathBuf;
use vellum_core::{Function, Library, ParamType, Parameter, Value};

/// The `data` library.
pub fn library() -> Library {
    Library::new("data", vec![read_function()])
}

/// `.read {path} lines:{x..y}` — reads a text file, optionally sliced to a
/// 1-indexed, inclusive line range. A range outside the file's line count is
/// a runtime error.
fn read_function() -> Function {
    Function::native(
        "read",
        vec![
            Parameter::new("path", ParamType::String),
            Parameter::new("lines", ParamType::Range).optional(),
        ],
        |ctx, invocation| {
            let path = invocation.string("path")?;
            let resolved = match &ctx.options.working_directory {
                Some(base) => base.join(&path),
                None => PathBuf::from(&path),
            };

            let content = std::fs::read_to_string(&resolved).map_err(|error| {
                invocation.error(format!("cannot read '{}': {}", resolved.display(), error))
            })?;

            match invocation.value("lines") {
                Some(Value::Range(range)) => {
                    let lines: Vec<&str> = content.lines().collect();
                    let start = range.start.unwrap_or(1);
                    let end = range.end.unwrap_or(lines.len() as i64);
                    if start < 1 || end > lines.len() as i64 || start > end {
                        return Err(invocation.error(format!(
                            "line range {} is out of bounds for {} lines",
                            range,
                            lines.len()
                        )));
                    }
                    Ok(Value::String(
                        lines[start as usize - 1..end as usize].join("\n"),
                    ))
                }
                _ => Ok(Value::String(content)),
            }
        },
    )
}

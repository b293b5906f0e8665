//! Helpers for dealing with `none` values, e.g. optional function
//! parameters that were not supplied.

use vellum_core::{Function, Library, ParamType, Parameter, Value};

/// The `optionality` library.
pub fn library() -> Library {
    Library::new("optionality", vec![isnone_function(), otherwise_function()])
}

fn isnone_function() -> Function {
    Function::native(
        "isnone",
        vec![Parameter::new("value", ParamType::Any)],
        |_, invocation| {
            let value = invocation
                .value("value")
                .cloned()
                .unwrap_or(Value::None);
            Ok(Value::Boolean(value.unwrap_dynamic().is_none()))
        },
    )
}

/// `.value::otherwise {fallback}` — simulates a default for `none`.
fn otherwise_function() -> Function {
    Function::native(
        "otherwise",
        vec![
            Parameter::new("value", ParamType::Any),
            Parameter::new("fallback", ParamType::Any),
        ],
        |_, invocation| {
            let value = invocation
                .value("value")
                .cloned()
                .unwrap_or(Value::None);
            if value.unwrap_dynamic().is_none() {
                Ok(invocation
                    .value("fallback")
                    .cloned()
                    .unwrap_or(Value::None))
            } else {
                Ok(value)
            }
        },
    )
}

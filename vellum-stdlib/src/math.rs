//! Arithmetic functions.
//!
//! Results normalize integral values back to integers, so `.sum {2} {3}`
//! prints `5`, not `5.0`.

use vellum_core::{Function, Library, Number, ParamType, Parameter, Value};

/// The `math` library.
pub fn library() -> Library {
    Library::new(
        "math",
        vec![
            sum_function(),
            subtract_function(),
            multiply_function(),
            divide_function(),
            pow_function(),
            iseven_function(),
        ],
    )
}

fn binary(name: &str, body: vellum_core::function::NativeFn) -> Function {
    Function::native(
        name,
        vec![
            Parameter::new("a", ParamType::Number),
            Parameter::new("b", ParamType::Number),
        ],
        body,
    )
}

fn sum_function() -> Function {
    binary("sum", |_, invocation| {
        let (a, b) = (invocation.number("a")?, invocation.number("b")?);
        Ok(Value::Number(Number::from_f64(a.as_f64() + b.as_f64())))
    })
}

fn subtract_function() -> Function {
    binary("subtract", |_, invocation| {
        let (a, b) = (invocation.number("a")?, invocation.number("b")?);
        Ok(Value::Number(Number::from_f64(a.as_f64() - b.as_f64())))
    })
}

fn multiply_function() -> Function {
    binary("multiply", |_, invocation| {
        let (a, b) = (invocation.number("a")?, invocation.number("b")?);
        Ok(Value::Number(Number::from_f64(a.as_f64() * b.as_f64())))
    })
}

/// `.divide {a} {b}` — division by zero is a runtime error, not infinity.
fn divide_function() -> Function {
    binary("divide", |_, invocation| {
        let (a, b) = (invocation.number("a")?, invocation.number("b")?);
        if b.as_f64() == 0.0 {
            return Err(invocation.error("division by zero"));
        }
        Ok(Value::Number(Number::from_f64(a.as_f64() / b.as_f64())))
    })
}

fn pow_function() -> Function {
    Function::native(
        "pow",
        vec![
            Parameter::new("base", ParamType::Number),
            Parameter::new("exponent", ParamType::Number),
        ],
        |_, invocation| {
            let base = invocation.number("base")?;
            let exponent = invocation.number("exponent")?;
            Ok(Value::Number(Number::from_f64(
                base.as_f64().powf(exponent.as_f64()),
            )))
        },
    )
}

fn iseven_function() -> Function {
    Function::native(
        "iseven",
        vec![Parameter::new("value", ParamType::Number)],
        |_, invocation| {
            let value = invocation
                .number("value")?
                .as_i64()
                .ok_or_else(|| invocation.error("parity is only defined for integers"))?;
            Ok(Value::Boolean(value % 2 == 0))
        },
    )
}

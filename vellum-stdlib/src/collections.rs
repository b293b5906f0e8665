//! Collection and dictionary functions.

use vellum_core::{Function, Library, Number, ParamType, Parameter, Value};

/// The `collections` library.
pub fn library() -> Library {
    Library::new(
        "collections",
        vec![
            pair_function(),
            first_function(),
            second_function(),
            size_function(),
            getat_function(),
            sorted_function(),
            dictionary_function(),
            get_function(),
        ],
    )
}

/// `.pair {first} {second}` — a two-element value, destructurable in loops.
fn pair_function() -> Function {
    Function::native(
        "pair",
        vec![
            Parameter::new("first", ParamType::Any),
            Parameter::new("second", ParamType::Any),
        ],
        |_, invocation| {
            let first = invocation
                .value("first")
                .cloned()
                .unwrap_or(Value::None);
            let second = invocation
                .value("second")
                .cloned()
                .unwrap_or(Value::None);
            Ok(Value::pair(first, second))
        },
    )
}

fn first_function() -> Function {
    Function::native(
        "first",
        vec![Parameter::new("from", ParamType::Iterable)],
        |_, invocation| {
            let elements = invocation.iterable("from")?;
            Ok(elements.into_iter().next().unwrap_or(Value::None))
        },
    )
}

fn second_function() -> Function {
    Function::native(
        "second",
        vec![Parameter::new("from", ParamType::Iterable)],
        |_, invocation| {
            let elements = invocation.iterable("from")?;
            Ok(elements.into_iter().nth(1).unwrap_or(Value::None))
        },
    )
}

fn size_function() -> Function {
    Function::native(
        "size",
        vec![Parameter::new("from", ParamType::Iterable)],
        |_, invocation| {
            let elements = invocation.iterable("from")?;
            Ok(Value::Number(Number::Int(elements.len() as i64)))
        },
    )
}

/// `.getat {index} from:{collection}` — 1-indexed; out of bounds is `none`.
fn getat_function() -> Function {
    Function::native(
        "getat",
        vec![
            Parameter::new("index", ParamType::Number),
            Parameter::new("from", ParamType::Iterable),
        ],
        |_, invocation| {
            let index = invocation
                .number("index")?
                .as_i64()
                .ok_or_else(|| invocation.error("index must be an integer"))?;
            let elements = invocation.iterable("from")?;
            if index < 1 {
                return Ok(Value::None);
            }
            Ok(elements
                .into_iter()
                .nth(index as usize - 1)
                .unwrap_or(Value::None))
        },
    )
}

/// `.sorted {collection} order:{descending}` — sorts by the elements'
/// textual rendition; numeric elements sort numerically.
fn sorted_function() -> Function {
    Function::native(
        "sorted",
        vec![
            Parameter::new("from", ParamType::Iterable),
            Parameter::new(
                "order",
                ParamType::Enum(vec!["ascending".to_string(), "descending".to_string()]),
            )
            .optional(),
        ],
        |_, invocation| {
            let mut elements = invocation.iterable("from")?;
            elements.sort_by(|a, b| {
                let numeric = |v: &Value| v.to_display_string().parse::<f64>().ok();
                match (numeric(a), numeric(b)) {
                    (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
                    _ => a.to_display_string().cmp(&b.to_display_string()),
                }
            });
            if matches!(invocation.value("order"), Some(Value::Enum(order)) if order == "descending")
            {
                elements.reverse();
            }
            Ok(Value::Ordered(elements))
        },
    )
}

/// `.dictionary` with a markdown-list body of `key: value` entries.
fn dictionary_function() -> Function {
    Function::native(
        "dictionary",
        vec![Parameter::new("entries", ParamType::Dictionary).body()],
        |_, invocation| {
            Ok(Value::Dictionary(invocation.dictionary("entries")?))
        },
    )
}

/// `.get {key} from:{dictionary}` — missing keys yield `none`.
fn get_function() -> Function {
    Function::native(
        "get",
        vec![
            Parameter::new("key", ParamType::String),
            Parameter::new("from", ParamType::Dictionary),
        ],
        |_, invocation| {
            let key = invocation.string("key")?;
            let entries = invocation.dictionary("from")?;
            Ok(entries.get(&key).cloned().unwrap_or(Value::None))
        },
    )
}

//! End-to-end tests of the standard libraries through the full pipeline.

use vellum_core::{OutputFormat, Pipeline, PipelineOptions};
use vellum_stdlib::standard_libraries;

fn compile_plain(source: &str) -> String {
    let options = PipelineOptions {
        format: OutputFormat::PlainText,
        ..Default::default()
    };
    let mut pipeline = Pipeline::new(standard_libraries(), options);
    pipeline.execute(source).unwrap()[0].content.clone()
}

#[test]
fn conditional_evaluates_body_only_when_true() {
    let shown = compile_plain(".if {yes}\n  I need apples.\n");
    assert!(shown.contains("I need apples."));

    let hidden = compile_plain(".if {no}\n  I need apples.\n");
    assert!(!hidden.contains("I need apples."));
}

#[test]
fn ifnot_is_the_complement_of_if() {
    let shown = compile_plain(".ifnot {no}\n  Visible\n");
    assert!(shown.contains("Visible"));

    let hidden = compile_plain(".ifnot {yes}\n  Visible\n");
    assert!(!hidden.contains("Visible"));
}

#[test]
fn foreach_maps_a_markdown_list() {
    let source = "\
.var {collection}
  - apple
  - banana

.foreach {.collection}
  item:
  .uppercase {.item}
";
    let content = compile_plain(source);
    let apple = content.find("APPLE").expect("APPLE missing");
    let banana = content.find("BANANA").expect("BANANA missing");
    assert!(apple < banana, "iteration order must be preserved");
}

#[test]
fn foreach_iterates_a_numeric_range() {
    let content = compile_plain(".foreach {2..4}\n  N\\: .1\n");
    for expected in ["N: 2", "N: 3", "N: 4"] {
        assert!(content.contains(expected), "missing '{}'", expected);
    }
}

#[test]
fn foreach_rejects_a_right_open_range() {
    let content = compile_plain(".foreach {2..}\n  .1\n");
    assert!(content.contains("[error in .foreach"));
}

#[test]
fn repeat_counts_from_one() {
    let content = compile_plain(".repeat {3}\n  Iteration .1\n");
    for expected in ["Iteration 1", "Iteration 2", "Iteration 3"] {
        assert!(content.contains(expected), "missing '{}'", expected);
    }
}

#[test]
fn custom_function_binds_positional_and_named_arguments() {
    let source = "\
.function {greet}
  from to:
  **Hello .to** from .from

.greet {John} to:{world}
";
    let content = compile_plain(source);
    assert!(content.contains("Hello world"));
    assert!(content.contains("from John"));
}

#[test]
fn custom_function_with_missing_argument_fails() {
    let source = "\
.function {greet}
  from to:
  Hello .to from .from

.greet {John}
";
    let content = compile_plain(source);
    assert!(content.contains("[error in .greet"));
    assert!(content.contains("missing mandatory parameter"));
}

#[test]
fn optional_parameter_defaults_through_otherwise() {
    let source = "\
.function {greet}
  from to?:
  Hello .to::otherwise {world} from .from

.greet {John}
";
    let content = compile_plain(source);
    assert!(content.contains("Hello world from John"));
}

#[test]
fn variable_reassignment_from_a_nested_scope() {
    let source = "\
.var {x} {1}

.if {yes}
  .x {2}

Value is .x now.
";
    let content = compile_plain(source);
    assert!(content.contains("Value is 2 now."));
}

#[test]
fn let_binds_a_temporary_value() {
    let content = compile_plain(".let {world}\n  item:\n  Hello, .item\n");
    assert!(content.contains("Hello, world"));
}

#[test]
fn dictionary_destructures_into_loop_variables() {
    let source = "\
.var {d}
  .dictionary
    - x: 1
    - y: 2

.foreach {.d}
  key value:
  .key has value .value
";
    let content = compile_plain(source);
    assert!(content.contains("x has value 1"));
    assert!(content.contains("y has value 2"));
}

#[test]
fn chained_calls_pass_output_forward() {
    let content = compile_plain("Result: .lowercase {HI}::capitalize\n");
    assert!(content.contains("Result: Hi"));
}

#[test]
fn arithmetic_normalizes_integral_results() {
    let content = compile_plain(".sum {2} {3}\n\n.divide {3} {2}\n\n.multiply {2} {2.5}\n");
    assert!(content.contains("5"));
    assert!(content.contains("1.5"));
    // 2 * 2.5 normalizes back to an integer.
    assert!(content.contains("5"));
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let content = compile_plain(".divide {5} {0}\n");
    assert!(content.contains("[error in .divide"));
    assert!(content.contains("division by zero"));
}

#[test]
fn nested_calls_in_arguments() {
    let content = compile_plain("Total: .sum {.sum {1} {2}} {3}\n");
    assert!(content.contains("Total: 6"));
}

#[test]
fn collections_access_functions() {
    let source = "\
.var {fruits}
  - kiwi
  - mango
  - pear

Size .size {.fruits}, first .first {.fruits}, third .getat {3} from:{.fruits}.
";
    let content = compile_plain(source);
    assert!(content.contains("Size 3, first kiwi, third pear."));
}

#[test]
fn dictionary_lookup_by_key() {
    let source = "\
.var {ports}
  .dictionary
    - http: 80
    - https: 443

https is .get {https} from:{.ports}.
";
    let content = compile_plain(source);
    assert!(content.contains("https is 443."));
}

#[test]
fn text_functions() {
    let content =
        compile_plain(".uppercase {hello}\n\n.capitalize {vellum}\n\n.length {naïve}\n");
    assert!(content.contains("HELLO"));
    assert!(content.contains("Vellum"));
    assert!(content.contains("5"));
}

#[test]
fn sorted_orders_elements() {
    let source = "\
.var {nums}
  - 10
  - 2
  - 33

.foreach {.sorted {.nums}}
  n:
  (.n)
";
    let content = compile_plain(source);
    let two = content.find("(2)").expect("(2) missing");
    let ten = content.find("(10)").expect("(10) missing");
    let big = content.find("(33)").expect("(33) missing");
    assert!(two < ten && ten < big, "numeric ascending order expected");
}

#[test]
fn sorted_descending_via_enum_constant() {
    let source = ".foreach {.sorted {1..3} order:{Descending}}\n  (.1)\n";
    let content = compile_plain(source);
    let three = content.find("(3)").expect("(3) missing");
    let one = content.find("(1)").expect("(1) missing");
    assert!(three < one, "descending order expected");
}

#[test]
fn full_document_snapshot() {
    let content = compile_plain("# Title\n\n.repeat {2}\n  Row .1\n");
    insta::assert_snapshot!(content, @r###"
    # Title

    Row 1

    Row 2
    "###);
}

#[test]
fn docname_reads_frontmatter_metadata() {
    let content = compile_plain("---\nname: Field Notes\n---\nThis document is .docname.\n");
    assert!(content.contains("This document is Field Notes."));
}

/// A temp dir whose name is free of leading dots, which would read as call
/// syntax inside an argument.
fn data_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("vellum-data")
        .tempdir()
        .unwrap()
}

#[test]
fn read_slices_a_line_range() {
    let dir = data_dir();
    let path = dir.path().join("lines.txt");
    std::fs::write(&path, "alpha\nbeta\ngamma\ndelta\n").unwrap();

    let content = compile_plain(&format!(".read {{{}}} lines:{{2..3}}\n", path.display()));
    assert!(content.contains("beta"));
    assert!(content.contains("gamma"));
    assert!(!content.contains("alpha"));
}

#[test]
fn read_rejects_an_out_of_bounds_range() {
    let dir = data_dir();
    let path = dir.path().join("short.txt");
    std::fs::write(&path, "only one line\n").unwrap();

    let content = compile_plain(&format!(".read {{{}}} lines:{{2..9}}\n", path.display()));
    assert!(content.contains("[error in .read"));
    assert!(content.contains("out of bounds"));
}

#[test]
fn read_fails_fast_on_a_missing_file() {
    let content = compile_plain(".read {does-not-exist.txt}\n");
    assert!(content.contains("[error in .read"));
}

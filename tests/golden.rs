//! End-to-end tests comparing generated bindings against checked-in
//! expected output. On mismatch the differing lines are printed.

use std::fs;
use std::path::Path;

use c2cffi::processor::{process_file, ProcessOptions};

fn check(input: &str, expected: &str) {
    let input_path = Path::new("tests/inputs").join(input);
    let expected_path = Path::new("tests/expected").join(expected);
    let mut output = Vec::new();
    process_file(&input_path, &ProcessOptions::default(), &mut output)
        .unwrap_or_else(|error| panic!("processing {} failed: {}", input, error));
    let actual = String::from_utf8(output).unwrap();
    let expected = fs::read_to_string(&expected_path)
        .unwrap_or_else(|error| panic!("reading {}: {}", expected_path.display(), error));
    if actual != expected {
        panic!(
            "========= TEST FAILED =========\ninput: {}\n{}",
            input,
            diff_report(&actual, &expected)
        );
    }
}

fn diff_report(actual: &str, expected: &str) -> String {
    let mut report = String::new();
    for (index, (actual_line, expected_line)) in
        actual.lines().zip(expected.lines()).enumerate()
    {
        if actual_line != expected_line {
            report.push_str(&format!(
                "line {}:\n  expected: {}\n  actual:   {}\n",
                index + 1,
                expected_line,
                actual_line
            ));
        }
    }
    let actual_lines = actual.lines().count();
    let expected_lines = expected.lines().count();
    if actual_lines != expected_lines {
        report.push_str(&format!(
            "expected {} lines, got {}\n",
            expected_lines, actual_lines
        ));
    }
    report
}

#[test]
fn standard_types() {
    check("standard_types.h", "standard-types.lisp");
}

#[test]
fn simple_struct() {
    check("simple_struct.h", "simple-struct.lisp");
}

#[test]
fn nested_struct() {
    check("nested_struct.h", "nested-struct.lisp");
}

#[test]
fn enums() {
    check("enums.h", "enums.lisp");
}

#[test]
fn macros() {
    check("macros.h", "macros.lisp");
}

#[test]
fn callbacks_emit_only_the_main_file() {
    check("callbacks.h", "callbacks.lisp");
}

#[test]
fn batch_job_applies_package_and_expansion_rules() {
    let dir = std::env::temp_dir().join(format!("c2cffi-batch-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let output_path = dir.join("geometry.lisp");
    let batch_path = dir.join("jobs.yaml");
    let input = Path::new("tests/inputs/simple_struct.h")
        .canonicalize()
        .unwrap();
    let yaml = format!(
        "- files: [{}]\n  output: {}\n  package: geom\n  pointer-expansion:\n    exclude:\n      names: [rect]\n",
        input.display(),
        output_path.display()
    );
    fs::write(&batch_path, yaml).unwrap();

    c2cffi::batch::process_batch_file(&batch_path).unwrap();
    let written = fs::read_to_string(&output_path).unwrap();
    fs::remove_dir_all(&dir).ok();

    assert_eq!(
        written,
        "(cl:in-package :geom)\n\n\
         (defcstruct point\n  (x :int32)\n  (y :int32))\n\n\
         (defctype point-t (:struct point))\n\n\
         (defcstruct rect\n  (top-left (:struct point))\n  (bottom-right (:struct point)))\n\n\
         (defcfun \"contains\" :int\n  (r :pointer)\n  (p (:struct point)))\n\n"
    );
}

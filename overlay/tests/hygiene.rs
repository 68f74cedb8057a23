//! Hygiene: enforces coding standards at test time.
//!
//! Scans the overlay crate's production sources for patterns that crash the
//! page or swallow errors. Every budget is zero. A new exception means fixing
//! an existing one first; budgets never grow.

use std::fs;
use std::path::Path;

struct SourceFile {
    path: String,
    content: String,
}

struct Budget {
    pattern: &'static str,
    max: usize,
}

// Panics abort the wasm instance and take the viewer down with them.
const UNWRAP: Budget = Budget { pattern: ".unwrap()", max: 0 };
const EXPECT: Budget = Budget { pattern: ".expect(", max: 0 };
const PANIC: Budget = Budget { pattern: "panic!(", max: 0 };
const UNREACHABLE: Budget = Budget { pattern: "unreachable!(", max: 0 };
const TODO: Budget = Budget { pattern: "todo!(", max: 0 };
const UNIMPLEMENTED: Budget = Budget { pattern: "unimplemented!(", max: 0 };

// Silent loss: results dropped without being looked at.
const SILENT_DISCARD: Budget = Budget { pattern: "let _ =", max: 0 };
const DOT_OK: Budget = Budget { pattern: ".ok()", max: 0 };

const ALLOW_DEAD_CODE: Budget = Budget { pattern: "#[allow(dead_code)]", max: 0 };

/// Production `.rs` files under `overlay/src/`, test files excluded.
fn source_files() -> Vec<SourceFile> {
    let mut files = Vec::new();
    collect_rs_files(Path::new("src"), &mut files);
    files
}

fn collect_rs_files(dir: &Path, out: &mut Vec<SourceFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rs_files(&path, out);
            continue;
        }
        let path_str = path.to_string_lossy().to_string();
        if !path_str.ends_with(".rs") || path_str.ends_with("_test.rs") {
            continue;
        }
        if let Ok(content) = fs::read_to_string(&path) {
            out.push(SourceFile { path: path_str, content });
        }
    }
}

fn hits(files: &[SourceFile], pattern: &str) -> Vec<(String, usize)> {
    files
        .iter()
        .map(|f| (f.path.clone(), f.content.lines().filter(|l| l.contains(pattern)).count()))
        .filter(|(_, count)| *count > 0)
        .collect()
}

fn check(budget: &Budget) {
    let files = source_files();
    assert!(!files.is_empty(), "no sources found; run from the overlay crate root");
    let found = hits(&files, budget.pattern);
    let count: usize = found.iter().map(|(_, c)| c).sum();
    let listing = found
        .iter()
        .map(|(path, c)| format!("  {path}: {c}"))
        .collect::<Vec<_>>()
        .join("\n");
    assert!(
        count <= budget.max,
        "`{}` budget exceeded: found {count}, max {}.\n{listing}",
        budget.pattern,
        budget.max
    );
}

#[test]
fn unwrap_budget() {
    check(&UNWRAP);
}

#[test]
fn expect_budget() {
    check(&EXPECT);
}

#[test]
fn panic_budget() {
    check(&PANIC);
}

#[test]
fn unreachable_budget() {
    check(&UNREACHABLE);
}

#[test]
fn todo_budget() {
    check(&TODO);
}

#[test]
fn unimplemented_budget() {
    check(&UNIMPLEMENTED);
}

#[test]
fn silent_discard_budget() {
    check(&SILENT_DISCARD);
}

#[test]
fn dot_ok_budget() {
    check(&DOT_OK);
}

#[test]
fn allow_dead_code_budget() {
    check(&ALLOW_DEAD_CODE);
}

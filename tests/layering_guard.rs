//! Layering guardrails to keep the outcome core free of the runtime stack.
//!
//! `nestrun_core` holds plain data (outcome records and their aggregation) and may be reused by tools that
//! never drive a tree. This test scans its `Cargo.toml` and fails if anything besides `serde` appears in
//! `[dependencies]`.

const ALLOWED: &[&str] = &["serde"];

fn dependency_names(manifest: &str) -> Vec<String> {
    let mut in_dependencies = false;
    let mut names = Vec::new();

    for raw_line in manifest.lines() {
        let line = raw_line.trim();
        // Track when we enter/exit the `[dependencies]` table.
        if line.starts_with('[') {
            in_dependencies = line == "[dependencies]";
            continue;
        }

        if !in_dependencies || line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Strip inline comments for robustness.
        let line_no_comment = line.split('#').next().unwrap_or("").trim();
        if let Some((name, _)) = line_no_comment.split_once('=') {
            names.push(name.trim().to_string());
        }
    }
    names
}

#[test]
fn core_depends_only_on_serde() {
    let manifest = include_str!("../crates/nestrun_core/Cargo.toml");
    let names = dependency_names(manifest);
    assert!(!names.is_empty(), "expected a [dependencies] table in nestrun_core");

    for name in names {
        if !ALLOWED.contains(&name.as_str()) {
            panic!("`{name}` must not appear in nestrun_core [dependencies]; keep the core free of the runtime stack");
        }
    }
}

#[test]
fn root_crate_uses_core_by_path() {
    let manifest = include_str!("../Cargo.toml");
    let names = dependency_names(manifest);
    assert!(names.iter().any(|n| n == "nestrun_core"));
}

//! Export definition file parser.
//!
//! A tiny line-oriented format controlling what goes into the dynamic symbol
//! table:
//!
//! ```text
//! # comment
//! LIBRARY libdemo.so
//! EXPORTS
//! init
//! frobnicate
//! ```
//!
//! Names listed under `EXPORTS` become the exact export set; `LIBRARY` sets
//! the soname. Lines that fit neither form are ignored.

/// Parse a `.def` file into `(export names, optional library name)`.
pub fn parse_def_file(path: &str) -> Result<(Vec<String>, Option<String>), String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("{}: cannot read export definitions: {}", path, e))?;
    Ok(parse_def(&content))
}

fn parse_def(content: &str) -> (Vec<String>, Option<String>) {
    let mut exports = Vec::new();
    let mut lib_name = None;
    let mut in_exports = false;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(rest) = line.strip_prefix("LIBRARY") {
            let name = rest.trim();
            if !name.is_empty() {
                lib_name = Some(name.to_string());
            }
            continue;
        }
        if line == "EXPORTS" {
            in_exports = true;
            continue;
        }

        if in_exports {
            // First token only; anything after a space is ignored
            if let Some(name) = line.split_whitespace().next() {
                exports.push(name.to_string());
            }
        }
    }

    (exports, lib_name)
}

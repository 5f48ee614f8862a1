//! Integration-file parser (`spec.md` §4.3): extracts the single package
//! directive and the list of unit operations out of a change-request's
//! integration text.
//!
//! Validation here is **tolerant**: a malformed unit header or an
//! unparsable payload drops that one unit with a warning rather than
//! failing the whole file — only a missing or duplicated *package* header
//! is fatal, since the engine cannot proceed at all without knowing which
//! file is being targeted.

use crengine_error::{CrError, CrResult};
use crengine_header::{parse_package_header, parse_unit_header};
use crengine_source::parse_single_statement;
use crengine_types::{Api, HeaderKind, PackageDirective, PayloadNode, UnitOp, UnitOpKind};

fn detect(line: &str) -> Option<HeaderKind> {
    crengine_header::detect_kind(line)
}

/// One unit op and its (possibly absent) payload, plus the op's place in
/// the file for ordering — input order is semantically significant to the
/// multi-pass driver (`spec.md` §4.7).
#[derive(Debug, Clone)]
pub struct ParsedUnit {
    pub op: UnitOp,
    pub payload: Option<PayloadNode>,
}

/// The full result of parsing an integration file.
#[derive(Debug, Clone)]
pub struct IntegrationFile {
    pub package: PackageDirective,
    pub units: Vec<ParsedUnit>,
    /// Human-readable notices for anything tolerated rather than failed:
    /// skipped units, an empty op list on a non-`create` run, and so on.
    pub warnings: Vec<String>,
}

/// Removes the common leading whitespace from every non-blank line,
/// mirroring Python's `textwrap.dedent`.
fn dedent(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let min_indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.chars().take_while(|c| *c == ' ' || *c == '\t').count())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| if l.len() >= min_indent { &l[min_indent..] } else { "" })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Dedents, replaces non-breaking spaces, and strips a raw payload span
/// (`spec.md` §4.3 step 3).
fn normalize_payload(raw: &str) -> String {
    dedent(&raw.replace('\u{a0}', " ")).trim().to_string()
}

fn find_package_header(lines: &[&str]) -> CrResult<(PackageDirective, usize)> {
    let package_lines: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| detect(l) == Some(HeaderKind::Package))
        .map(|(i, _)| i)
        .collect();

    if package_lines.len() != 1 {
        return Err(CrError::bad_header(
            lines.first().copied().unwrap_or(""),
            format!("expected exactly one package header, found {}", package_lines.len()),
        ));
    }
    let idx = package_lines[0];
    let first_non_blank = lines.iter().position(|l| !l.trim().is_empty());
    if first_non_blank != Some(idx) {
        return Err(CrError::bad_header(
            lines[idx],
            "package header must be the first non-blank line of the file",
        ));
    }
    let directive = parse_package_header(lines[idx])?;
    Ok((directive, idx))
}

/// Checks the presence-of-payload rules from `spec.md` §3/§4.3 for a unit
/// whose header parsed successfully.
fn validate_payload(op: &UnitOp, payload: &str) -> Result<Option<String>, String> {
    if op.op == UnitOpKind::Remove {
        if !payload.is_empty() {
            return Err("`remove` must not carry a payload".to_string());
        }
        return Ok(None);
    }
    if payload.is_empty() {
        return Err(format!("`{}` requires a payload", op.op.as_str()));
    }
    match parse_single_statement(payload) {
        Ok(_) => Ok(Some(payload.to_string())),
        Err(e) => Err(format!("payload does not parse as one statement: {e}")),
    }
}

/// Returns the integration text after its package header line, verbatim —
/// the whole-file body a `create` run installs when the file carries no
/// unit ops at all (`spec.md` §9 Open Question c: the package header
/// itself is never part of this body).
pub fn raw_body_after_package_header(source: &str) -> CrResult<String> {
    let lines: Vec<&str> = source.lines().collect();
    let (_, idx) = find_package_header(&lines)?;
    Ok(lines[idx + 1..].join("\n"))
}

/// Parses a full integration file's text into a package directive and a
/// tolerant list of unit operations.
pub fn parse(source: &str, api: Api) -> CrResult<IntegrationFile> {
    let lines: Vec<&str> = source.lines().collect();
    let (package, _package_idx) = find_package_header(&lines)?;

    let header_lines: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| detect(l).is_some())
        .map(|(i, _)| i)
        .collect();

    let mut units = Vec::new();
    let mut warnings = Vec::new();

    for &idx in &header_lines {
        if detect(lines[idx]) != Some(HeaderKind::Unit) {
            continue;
        }
        let header_text = lines[idx];
        let next = header_lines.iter().find(|&&j| j > idx).copied().unwrap_or(lines.len());
        let raw_payload = lines[idx + 1..next].join("\n");
        let payload = normalize_payload(&raw_payload);

        let op = match parse_unit_header(header_text) {
            Ok(op) => op,
            Err(e) => {
                warnings.push(format!("skipped unit `{header_text}`: {e}"));
                continue;
            }
        };

        match validate_payload(&op, &payload) {
            Ok(text) => {
                units.push(ParsedUnit { op, payload: text.map(|text| PayloadNode { text }) });
            }
            Err(reason) => {
                warnings.push(format!("skipped unit `{header_text}`: {reason}"));
            }
        }
    }

    if units.is_empty() && api != Api::Create {
        warnings.push("no valid operations found in integration file".to_string());
    }

    Ok(IntegrationFile { package, units, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crengine_types::PackageOp;

    #[test]
    fn parses_package_and_unit_ops() {
        let src = "#--- cr_op: update, cr_type: file, cr_anc: a.py ---#\n\
                   #-- cr_op: insert_after, cr_type: import, cr_anc: import time --#\n\
                   import re\n";
        let file = parse(src, Api::Update).unwrap();
        assert_eq!(file.package.op, PackageOp::Update);
        assert_eq!(file.units.len(), 1);
        assert_eq!(file.units[0].payload.as_ref().unwrap().text, "import re");
        assert!(file.warnings.is_empty());
    }

    #[test]
    fn fails_without_exactly_one_package_header() {
        let src = "import os\n#-- cr_op: replace, cr_type: function, cr_anc: f --#\ndef f():\n    pass\n";
        assert!(parse(src, Api::Update).is_err());
    }

    #[test]
    fn fails_when_package_header_is_not_first_non_blank_line() {
        let src = "\n\nnot a header\n#--- cr_op: update, cr_type: file, cr_anc: a.py ---#\n";
        assert!(parse(src, Api::Update).is_err());
    }

    #[test]
    fn skips_unit_with_unparsable_payload_as_a_warning() {
        let src = "#--- cr_op: update, cr_type: file, cr_anc: a.py ---#\n\
                   #-- cr_op: replace, cr_type: function, cr_anc: f --#\n\
                   def f(:\n";
        let file = parse(src, Api::Update).unwrap();
        assert!(file.units.is_empty());
        assert_eq!(file.warnings.len(), 1);
    }

    #[test]
    fn remove_op_requires_an_empty_payload() {
        let src = "#--- cr_op: update, cr_type: file, cr_anc: a.py ---#\n\
                   #-- cr_op: remove, cr_type: function, cr_anc: f --#\n";
        let file = parse(src, Api::Update).unwrap();
        assert_eq!(file.units.len(), 1);
        assert!(file.units[0].payload.is_none());
    }

    #[test]
    fn empty_op_list_is_accepted_but_reported_outside_create() {
        let src = "#--- cr_op: update, cr_type: file, cr_anc: a.py ---#\n";
        let file = parse(src, Api::Update).unwrap();
        assert!(file.units.is_empty());
        assert_eq!(file.warnings.len(), 1);
    }

    #[test]
    fn empty_op_list_is_silently_accepted_for_create() {
        let src = "#--- cr_op: create, cr_type: file, cr_anc: a.py ---#\n";
        let file = parse(src, Api::Create).unwrap();
        assert!(file.units.is_empty());
        assert!(file.warnings.is_empty());
    }

    #[test]
    fn raw_body_strips_only_the_package_header_line() {
        let src = "#--- cr_op: create, cr_type: file, cr_anc: a.py ---#\nimport os\n\ndef f():\n    pass\n";
        let body = raw_body_after_package_header(src).unwrap();
        assert_eq!(body, "import os\n\ndef f():\n    pass");
    }
}

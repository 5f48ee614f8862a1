//! Header grammar: parsing and re-emitting the two directive line syntaxes
//! (`spec.md` §3, §4.1).
//!
//! ```text
//! #--- cr_op: update, cr_type: file, cr_anc: foo.py, cr_id: 2025-09-25-00-00-00 ---#
//! #-- cr_op: replace, cr_type: method, cr_anc: Widget.render, cr_id: 2025-09-25-00-00-00 --#
//! ```
//!
//! A header line is a flat `key: value` mapping wrapped in one of the two
//! delimiter pairs. This module only ever produces or accepts the closed
//! enumerations defined in `crengine-types`; any other key or value is a
//! [`CrError::BadHeader`].

use crengine_error::{CrError, CrResult};
use crengine_types::{HeaderKind, NodeKind, PackageDirective, PackageOp, TimeStamp, UnitOp, UnitOpKind};
use once_cell::sync::Lazy;
use regex::Regex;

const PACKAGE_OPEN: &str = "#---";
const PACKAGE_CLOSE: &str = "---#";
const UNIT_OPEN: &str = "#--";
const UNIT_CLOSE: &str = "--#";

/// Fixed re-emission order (`spec.md` §3): fields not present are omitted,
/// never reordered.
const FIELD_ORDER: [&str; 5] = ["cr_op", "cr_type", "cr_anc", "install", "cr_id"];

static IMPORT_ANCHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(import \w+|from \w+(\.\w+)* import \w+)$").expect("static regex")
});

/// Detects which delimiter pair a raw line opens with. Package delimiters
/// are checked first since `#---` is also a valid prefix match for `#--`.
pub fn detect_kind(line: &str) -> Option<HeaderKind> {
    let line = line.trim();
    if line.starts_with(PACKAGE_OPEN) && line.ends_with(PACKAGE_CLOSE) {
        Some(HeaderKind::Package)
    } else if line.starts_with(UNIT_OPEN) && line.ends_with(UNIT_CLOSE) {
        Some(HeaderKind::Unit)
    } else {
        None
    }
}

/// A flat, order-preserving-on-input, validated-on-lookup field map.
struct Fields(Vec<(String, String)>);

impl Fields {
    fn parse(body: &str, header: &str) -> CrResult<Self> {
        let mut fields = Vec::new();
        for part in body.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, value) = part.split_once(':').ok_or_else(|| {
                CrError::bad_header(header, format!("malformed field `{part}` (expected `key: value`)"))
            })?;
            let key = key.trim().to_string();
            let value = value.trim().to_string();
            if !FIELD_ORDER.contains(&key.as_str()) {
                return Err(CrError::bad_header(header, format!("unrecognized key `{key}`")));
            }
            fields.push((key, value));
        }
        Ok(Self(fields))
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn require(&self, key: &str, header: &str) -> CrResult<&str> {
        self.get(key)
            .ok_or_else(|| CrError::bad_header(header, format!("missing required key `{key}`")))
    }
}

fn strip_delimiters<'a>(line: &'a str, open: &str, close: &str) -> &'a str {
    let trimmed = line.trim();
    let without_open = trimmed.strip_prefix(open).unwrap_or(trimmed);
    let without_close = without_open.strip_suffix(close).unwrap_or(without_open);
    without_close.trim()
}

fn parse_install(fields: &Fields, header: &str) -> CrResult<Option<bool>> {
    match fields.get("install") {
        None => Ok(None),
        Some("true") | Some("True") => Ok(Some(true)),
        Some("false") | Some("False") => Ok(Some(false)),
        Some(other) => Err(CrError::bad_header(header, format!("`install` must be true/false, got `{other}`"))),
    }
}

fn parse_cr_id(fields: &Fields, header: &str) -> CrResult<Option<TimeStamp>> {
    match fields.get("cr_id") {
        None => Ok(None),
        Some(raw) => TimeStamp::parse(raw)
            .map(Some)
            .map_err(|e| CrError::bad_header(header, e.to_string())),
    }
}

/// Validates a `cr_type: import` anchor against the two accepted import
/// statement shapes.
fn validate_import_anchor(anchor: &str, header: &str) -> CrResult<()> {
    if IMPORT_ANCHOR_RE.is_match(anchor) {
        Ok(())
    } else {
        Err(CrError::bad_header(
            header,
            format!("`{anchor}` is not a recognized import statement"),
        ))
    }
}

/// Splits a `Class.method` anchor into its two halves. Exactly one dot is
/// required; `a.b.c` and `nodot` are both rejected.
fn split_method_anchor(anchor: &str, header: &str) -> CrResult<(String, String)> {
    let mut parts = anchor.splitn(2, '.');
    let class = parts.next().unwrap_or_default();
    let rest = parts.next().ok_or_else(|| {
        CrError::bad_header(header, format!("`{anchor}` is not a `Class.method` anchor"))
    })?;
    if rest.contains('.') || class.is_empty() || rest.is_empty() {
        return Err(CrError::bad_header(
            header,
            format!("`{anchor}` is not a `Class.method` anchor"),
        ));
    }
    Ok((class.to_string(), rest.to_string()))
}

/// Parses a `#--- … ---#` package header line.
pub fn parse_package_header(line: &str) -> CrResult<PackageDirective> {
    let trimmed = line.trim();
    if detect_kind(trimmed) != Some(HeaderKind::Package) {
        return Err(CrError::bad_header(trimmed, "not a package header"));
    }
    let body = strip_delimiters(trimmed, PACKAGE_OPEN, PACKAGE_CLOSE);
    let fields = Fields::parse(body, trimmed)?;

    let op = PackageOp::parse(fields.require("cr_op", trimmed)?)
        .ok_or_else(|| CrError::bad_header(trimmed, "unrecognized cr_op for a package header"))?;
    let kind = NodeKind::parse(fields.require("cr_type", trimmed)?)
        .ok_or_else(|| CrError::bad_header(trimmed, "unrecognized cr_type"))?;
    if kind != NodeKind::File {
        return Err(CrError::bad_header(trimmed, "package header cr_type must be `file`"));
    }
    let anchor = fields.require("cr_anc", trimmed)?.to_string();
    let install = parse_install(&fields, trimmed)?;
    let cr_id = parse_cr_id(&fields, trimmed)?;

    Ok(PackageDirective { op, kind, anchor, install, cr_id })
}

/// Parses a `#-- … --#` unit header line.
pub fn parse_unit_header(line: &str) -> CrResult<UnitOp> {
    let trimmed = line.trim();
    if detect_kind(trimmed) != Some(HeaderKind::Unit) {
        return Err(CrError::bad_header(trimmed, "not a unit header"));
    }
    let body = strip_delimiters(trimmed, UNIT_OPEN, UNIT_CLOSE);
    let fields = Fields::parse(body, trimmed)?;

    let op = UnitOpKind::parse(fields.require("cr_op", trimmed)?)
        .ok_or_else(|| CrError::bad_header(trimmed, "unrecognized cr_op for a unit header"))?;
    let kind = NodeKind::parse(fields.require("cr_type", trimmed)?)
        .ok_or_else(|| CrError::bad_header(trimmed, "unrecognized cr_type"))?;
    if kind == NodeKind::File {
        return Err(CrError::bad_header(trimmed, "unit header cr_type cannot be `file`"));
    }
    let raw_anchor = fields.require("cr_anc", trimmed)?.to_string();

    let (anchor, class_name) = match kind {
        NodeKind::Import => {
            validate_import_anchor(&raw_anchor, trimmed)?;
            (raw_anchor, None)
        }
        NodeKind::Method => {
            let (class, method) = split_method_anchor(&raw_anchor, trimmed)?;
            (method, Some(class))
        }
        NodeKind::Class | NodeKind::Function => (raw_anchor, None),
        NodeKind::File => unreachable!("checked above"),
    };

    let install = parse_install(&fields, trimmed)?;
    let cr_id = parse_cr_id(&fields, trimmed)?;

    Ok(UnitOp { op, kind, anchor, class_name, cr_id, install })
}

/// Builds the ordered `key: value, …` body shared by both header shapes.
fn build_body(entries: &[(&str, Option<String>)]) -> String {
    entries
        .iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| format!("{key}: {v}")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Re-emits a package directive as a `#--- … ---#` header line, field order
/// fixed at `[cr_op, cr_type, cr_anc, install, cr_id]`.
pub fn emit_package_header(directive: &PackageDirective) -> String {
    let body = build_body(&[
        ("cr_op", Some(directive.op.as_str().to_string())),
        ("cr_type", Some(directive.kind.as_str().to_string())),
        ("cr_anc", Some(directive.anchor.clone())),
        ("install", directive.install.map(|b| b.to_string())),
        ("cr_id", directive.cr_id.as_ref().map(|t| t.as_str().to_string())),
    ]);
    format!("{PACKAGE_OPEN} {body} {PACKAGE_CLOSE}")
}

/// Re-emits a unit op as a `#-- … --#` header line.
pub fn emit_unit_header(op: &UnitOp) -> String {
    let body = build_body(&[
        ("cr_op", Some(op.op.as_str().to_string())),
        ("cr_type", Some(op.kind.as_str().to_string())),
        ("cr_anc", Some(op.marker_anchor())),
        ("install", op.install.map(|b| b.to_string())),
        ("cr_id", op.cr_id.as_ref().map(|t| t.as_str().to_string())),
    ]);
    format!("{UNIT_OPEN} {body} {UNIT_CLOSE}")
}

/// Rebuilds the single-line provenance marker left in applied source: the
/// unit header stamped with `cr_id`, the current change-request id rather
/// than whatever id (if any) the op carried at parse time.
pub fn emit_marker(op: &UnitOp, cr_id: &TimeStamp) -> String {
    let stamped = UnitOp { cr_id: Some(cr_id.clone()), ..op.clone() };
    emit_unit_header(&stamped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_unit() -> UnitOp {
        UnitOp {
            op: UnitOpKind::Replace,
            kind: NodeKind::Method,
            anchor: "render".to_string(),
            class_name: Some("Widget".to_string()),
            cr_id: Some(TimeStamp::parse("2025-09-25-00-00-00").unwrap()),
            install: None,
        }
    }

    #[test]
    fn detects_package_before_unit() {
        assert_eq!(detect_kind("#--- cr_op: update, cr_type: file, cr_anc: a.py ---#"), Some(HeaderKind::Package));
        assert_eq!(detect_kind("#-- cr_op: replace, cr_type: function, cr_anc: f --#"), Some(HeaderKind::Unit));
        assert_eq!(detect_kind("not a header"), None);
    }

    #[test]
    fn round_trips_a_method_header() {
        let line = emit_unit_header(&sample_unit());
        let parsed = parse_unit_header(&line).unwrap();
        assert_eq!(parsed.anchor, "render");
        assert_eq!(parsed.class_name.as_deref(), Some("Widget"));
        assert_eq!(parsed.kind, NodeKind::Method);
        assert_eq!(emit_unit_header(&parsed), line);
    }

    #[test]
    fn round_trips_a_package_header() {
        let directive = PackageDirective {
            op: PackageOp::Create,
            kind: NodeKind::File,
            anchor: "widgets.py".to_string(),
            install: Some(true),
            cr_id: None,
        };
        let line = emit_package_header(&directive);
        assert_eq!(line, "#--- cr_op: create, cr_type: file, cr_anc: widgets.py, install: true ---#");
        let parsed = parse_package_header(&line).unwrap();
        assert_eq!(parsed, directive);
    }

    #[test]
    fn rejects_unknown_key() {
        let err = parse_unit_header("#-- cr_op: replace, cr_type: function, cr_anc: f, bogus: 1 --#");
        assert!(err.is_err());
    }

    #[test]
    fn rejects_package_header_with_non_file_type() {
        let err = parse_package_header("#--- cr_op: update, cr_type: class, cr_anc: Foo ---#");
        assert!(err.is_err());
    }

    #[test]
    fn validates_import_anchor_shape() {
        assert!(validate_import_anchor("import os", "x").is_ok());
        assert!(validate_import_anchor("from a.b import c", "x").is_ok());
        assert!(validate_import_anchor("import os as o", "x").is_err());
    }

    #[test]
    fn splits_method_anchor_on_single_dot() {
        let (class, method) = split_method_anchor("Widget.render", "x").unwrap();
        assert_eq!(class, "Widget");
        assert_eq!(method, "render");
        assert!(split_method_anchor("a.b.c", "x").is_err());
        assert!(split_method_anchor("nodot", "x").is_err());
    }

    #[test]
    fn marker_stamps_fresh_cr_id() {
        let op = UnitOp { cr_id: None, ..sample_unit() };
        let fresh = TimeStamp::parse("2026-01-01-00-00-00").unwrap();
        let marker = emit_marker(&op, &fresh);
        assert!(marker.contains("cr_id: 2026-01-01-00-00-00"));
    }
}

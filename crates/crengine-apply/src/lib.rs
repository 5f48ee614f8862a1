//! Operation applier (`spec.md` §4.6): splices a resolved [`UnitOp`] into a
//! scope's statement list.
//!
//! Every insertion is prefixed by exactly one freshly stamped marker — the
//! unit header re-emitted with the run's current `cr_id` — so that a diff
//! shows which change-request touched a line. Re-running the same op is
//! idempotent: a marker comment left by a prior run is recognized as
//! *stale* and stripped before the fresh one is written, and an op whose
//! payload already matches its neighbor is a silent no-op.

use crengine_error::CrResult;
use crengine_header::emit_marker;
use crengine_source::{parse_single_statement, Stmt, StmtKind};
use crengine_types::{NodeKind, TimeStamp, UnitOp, UnitOpKind};

/// Whether applying an op actually changed the scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The payload already matched its neighbor; nothing was spliced.
    NoOp,
}

fn is_marker_line(line: &str) -> bool {
    line.trim().starts_with("#--")
}

fn is_marker_only_stmt(stmt: &Stmt) -> bool {
    is_marker_line(&stmt.text)
}

/// The nearest statement at or before `index` that isn't itself a
/// `remove`'s leftover marker placeholder, skipped so de-dup never compares
/// a payload against mere provenance (`spec.md` §4.6).
fn nearest_non_marker_backward(scope: &[Stmt], index: usize) -> Option<usize> {
    (0..index).rev().find(|&i| !is_marker_only_stmt(&scope[i]))
}

/// The forward counterpart of [`nearest_non_marker_backward`], used by
/// `insert_after`.
fn nearest_non_marker_forward(scope: &[Stmt], index: usize) -> Option<usize> {
    (index + 1..scope.len()).find(|&i| !is_marker_only_stmt(&scope[i]))
}

/// The column at which this scope's statements sit, read off its first
/// statement's own text. Module scope is always column 0; a class body
/// carries whatever indent width the source used. Freshly parsed payloads
/// and markers are flat/dedented, so every inserting function reindents
/// them to this width before splicing them in.
fn scope_indent(scope: &[Stmt]) -> usize {
    scope.first().map(|s| first_line_indent(&s.text)).unwrap_or(0)
}

fn first_line_indent(text: &str) -> usize {
    text.lines().next().unwrap_or("").chars().take_while(|c| *c == ' ').count()
}

/// Shifts every non-blank line of `text` right by `indent` spaces, so a
/// flat payload (or a bare marker line) lands at the scope's actual
/// statement column instead of column 0.
fn reindent_text(text: &str, indent: usize) -> String {
    if indent == 0 {
        return text.to_string();
    }
    let pad = " ".repeat(indent);
    text.lines().map(|line| if line.is_empty() { line.to_string() } else { format!("{pad}{line}") }).collect::<Vec<_>>().join("\n")
}

/// Strips a trailing run of stale marker lines (and one blank line
/// immediately preceding them, left over from a `class`/`method` marker's
/// extra spacing) off the end of `trivia`, in place.
fn strip_stale_markers(trivia: &mut Vec<String>) {
    while let Some(last) = trivia.last() {
        if is_marker_line(last) {
            trivia.pop();
        } else if last.trim().is_empty() && trivia.iter().rev().nth(1).map(|l| is_marker_line(l)).unwrap_or(false) {
            trivia.pop();
        } else {
            break;
        }
    }
}

fn payload_stmt(payload: &str) -> CrResult<Stmt> {
    parse_single_statement(payload)
}

/// Applies `op` at `index` within `scope`, using `payload` (already
/// dedented/validated by the integration parser) when the op carries one.
/// `cr_id` is stamped into the fresh marker.
pub fn apply(
    scope: &mut Vec<Stmt>,
    index: usize,
    op: &UnitOp,
    payload: Option<&str>,
    cr_id: &TimeStamp,
) -> CrResult<Outcome> {
    let marker = emit_marker(op, cr_id);
    match op.op {
        UnitOpKind::InsertBefore => apply_insert_before(scope, index, op, payload, &marker),
        UnitOpKind::InsertAfter => apply_insert_after(scope, index, op, payload, &marker),
        UnitOpKind::Replace => apply_replace(scope, index, payload, &marker),
        UnitOpKind::Remove => apply_remove(scope, index, &marker),
    }
}

fn apply_insert_before(
    scope: &mut Vec<Stmt>,
    index: usize,
    op: &UnitOp,
    payload: Option<&str>,
    marker: &str,
) -> CrResult<Outcome> {
    let payload = payload.unwrap_or_default();
    let indent = scope_indent(scope);

    let mut stmt = payload_stmt(payload)?;
    stmt.text = reindent_text(&stmt.text, indent);

    if let Some(neighbor) = nearest_non_marker_backward(scope, index) {
        if stmt.text.trim() == scope[neighbor].normalized_code() {
            return Ok(Outcome::NoOp);
        }
    }
    strip_stale_markers(&mut scope[index].leading_trivia);

    let mut trivia = Vec::new();
    if op.kind == NodeKind::Method {
        trivia.push(String::new());
    }
    trivia.push(reindent_text(marker, indent));
    stmt.leading_trivia = trivia;

    scope.insert(index, stmt);
    Ok(Outcome::Applied)
}

fn apply_insert_after(
    scope: &mut Vec<Stmt>,
    index: usize,
    op: &UnitOp,
    payload: Option<&str>,
    marker: &str,
) -> CrResult<Outcome> {
    let payload = payload.unwrap_or_default();
    let indent = scope_indent(scope);

    let mut stmt = payload_stmt(payload)?;
    stmt.text = reindent_text(&stmt.text, indent);

    if let Some(neighbor) = nearest_non_marker_forward(scope, index) {
        if stmt.text.trim() == scope[neighbor].normalized_code() {
            return Ok(Outcome::NoOp);
        }
    }

    let mut trivia = Vec::new();
    if op.kind == NodeKind::Class {
        trivia.push(String::new());
        trivia.push(String::new());
    }
    trivia.push(reindent_text(marker, indent));
    stmt.leading_trivia = trivia;

    let insert_at = index + 1;
    if insert_at < scope.len() && scope[insert_at].leading_trivia.first().map(|l| is_marker_line(l)).unwrap_or(false)
    {
        scope[insert_at] = stmt;
    } else {
        scope.insert(insert_at, stmt);
    }
    Ok(Outcome::Applied)
}

fn apply_replace(scope: &mut Vec<Stmt>, index: usize, payload: Option<&str>, marker: &str) -> CrResult<Outcome> {
    let payload = payload.unwrap_or_default();
    let indent = scope_indent(scope);

    let mut stmt = payload_stmt(payload)?;
    stmt.text = reindent_text(&stmt.text, indent);

    if stmt.text.trim() == scope[index].normalized_code() {
        return Ok(Outcome::NoOp);
    }
    let mut trivia = std::mem::take(&mut scope[index].leading_trivia);
    strip_stale_markers(&mut trivia);
    trivia.push(reindent_text(marker, indent));

    stmt.leading_trivia = trivia;
    scope[index] = stmt;
    Ok(Outcome::Applied)
}

fn apply_remove(scope: &mut Vec<Stmt>, index: usize, marker: &str) -> CrResult<Outcome> {
    let indent = scope_indent(scope);
    let mut trivia = std::mem::take(&mut scope[index].leading_trivia);
    strip_stale_markers(&mut trivia);
    trivia.push(String::new());

    scope[index] = Stmt {
        leading_trivia: trivia,
        text: reindent_text(marker, indent),
        kind: StmtKind::Other,
        body: None,
    };
    Ok(Outcome::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crengine_source::SourceTree;

    fn op(kind: UnitOpKind, node: NodeKind, anchor: &str) -> UnitOp {
        UnitOp { op: kind, kind: node, anchor: anchor.to_string(), class_name: None, cr_id: None, install: None }
    }

    fn ts() -> TimeStamp {
        TimeStamp::parse("2025-09-25-00-00-00").unwrap()
    }

    #[test]
    fn insert_after_splices_marker_then_payload() {
        let tree = SourceTree::parse("import os\nimport time\n").unwrap();
        let mut stmts = tree.stmts;
        let outcome = apply(
            &mut stmts,
            1,
            &op(UnitOpKind::InsertAfter, NodeKind::Import, "import time"),
            Some("import re"),
            &ts(),
        )
        .unwrap();
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[2].text, "import re");
        assert!(stmts[2].leading_trivia[0].starts_with("#--"));
    }

    #[test]
    fn insert_after_is_idempotent_on_rerun() {
        let tree = SourceTree::parse("import os\nimport time\n").unwrap();
        let mut stmts = tree.stmts;
        apply(&mut stmts, 1, &op(UnitOpKind::InsertAfter, NodeKind::Import, "import time"), Some("import re"), &ts())
            .unwrap();
        let outcome =
            apply(&mut stmts, 1, &op(UnitOpKind::InsertAfter, NodeKind::Import, "import time"), Some("import re"), &ts())
                .unwrap();
        assert_eq!(outcome, Outcome::NoOp, "the payload already matches the spliced-in neighbor");
        assert_eq!(stmts.len(), 3, "re-run should recognize the identical neighbor and no-op rather than duplicate");
    }

    #[test]
    fn insert_before_is_idempotent_on_rerun() {
        let tree = SourceTree::parse("import os\nimport time\n").unwrap();
        let mut stmts = tree.stmts;
        apply(&mut stmts, 1, &op(UnitOpKind::InsertBefore, NodeKind::Import, "import time"), Some("import re"), &ts())
            .unwrap();
        let anchor = stmts.iter().position(|s| s.text == "import time").unwrap();
        let outcome = apply(
            &mut stmts,
            anchor,
            &op(UnitOpKind::InsertBefore, NodeKind::Import, "import time"),
            Some("import re"),
            &ts(),
        )
        .unwrap();
        assert_eq!(outcome, Outcome::NoOp, "the payload already matches the spliced-in neighbor");
        assert_eq!(stmts.len(), 3, "re-run should recognize the identical neighbor and no-op rather than duplicate");
    }

    #[test]
    fn dedup_compares_against_the_insertion_side_neighbor_not_the_anchor() {
        let tree = SourceTree::parse("import os\nimport time\nimport re\n").unwrap();
        let mut stmts = tree.stmts;
        let outcome =
            apply(&mut stmts, 1, &op(UnitOpKind::InsertAfter, NodeKind::Import, "import time"), Some("import re"), &ts())
                .unwrap();
        assert_eq!(outcome, Outcome::NoOp, "`import re` already sits right after the anchor");
        assert_eq!(stmts.len(), 3);
    }

    #[test]
    fn remove_replaces_statement_with_blank_and_marker() {
        let tree = SourceTree::parse("def f():\n    pass\n\ndef g():\n    pass\n").unwrap();
        let mut stmts = tree.stmts;
        let outcome = apply(&mut stmts, 0, &op(UnitOpKind::Remove, NodeKind::Function, "f"), None, &ts()).unwrap();
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].leading_trivia.last(), Some(&String::new()));
        assert!(stmts[0].text.starts_with("#--"), "the marker remains as provenance for the removed statement");
    }

    #[test]
    fn replace_overwrites_statement_keeping_marker() {
        let tree = SourceTree::parse("def f():\n    return 1\n").unwrap();
        let mut stmts = tree.stmts;
        let outcome =
            apply(&mut stmts, 0, &op(UnitOpKind::Replace, NodeKind::Function, "f"), Some("def f():\n    return 2"), &ts())
                .unwrap();
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].text.contains("return 2"));
        assert!(stmts[0].leading_trivia.last().unwrap().starts_with("#--"));
    }
}

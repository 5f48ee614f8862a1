//! Anchor resolution (`spec.md` §4.5): locating the statement a [`UnitOp`]
//! targets within a given scope (a module's top-level statements, or one
//! class's body — the caller picks which statement slice to pass in).
//!
//! `method` ops are resolved exactly like `function` ops here: the driver
//! (`spec.md` §4.7) is responsible for first locating the enclosing class
//! and handing this resolver that class's body's statements as the scope;
//! `UnitOp` already carries only the bare method name in `anchor` by the
//! time it reaches this crate (`crengine_types::UnitOp::marker_anchor`
//! rejoins the two halves only for display/marker purposes).
//!
//! Scopes are plain `&[Stmt]` rather than `&SourceTree` so the multi-pass
//! driver can resolve against a scope it is concurrently splicing via
//! `crengine-apply`, without forcing a `SourceTree` wrapper in and out on
//! every pass.

use crengine_source::{Stmt, StmtKind};
use crengine_types::{NodeKind, UnitOp};

/// The outcome of an anchor lookup. `NotFound` is routine, not fatal: the
/// multi-pass driver defers and retries on a later pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Found(usize),
    NotFound,
}

fn normalize_anchor(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase()
}

fn is_class_def(stmt: &Stmt) -> bool {
    matches!(stmt.kind, StmtKind::ClassDef { .. })
}

fn is_function_def(stmt: &Stmt) -> bool {
    matches!(stmt.kind, StmtKind::FunctionDef { .. })
}

fn find_by_name(scope: &[Stmt], anchor: &str, is_match_kind: fn(&Stmt) -> bool) -> Resolution {
    for (i, stmt) in scope.iter().enumerate() {
        if is_match_kind(stmt) && stmt.def_name() == Some(anchor) {
            return Resolution::Found(i);
        }
    }
    Resolution::NotFound
}

/// Last-resort fallback for non-`import` kinds: any statement whose
/// whitespace-stripped, lowercased text equals the similarly normalized
/// anchor.
fn fallback_match(scope: &[Stmt], anchor: &str) -> Resolution {
    let target = normalize_anchor(anchor);
    for (i, stmt) in scope.iter().enumerate() {
        if stmt.fallback_normalized() == target {
            return Resolution::Found(i);
        }
    }
    Resolution::NotFound
}

/// Resolves `op`'s anchor within `scope`.
pub fn resolve(scope: &[Stmt], op: &UnitOp) -> Resolution {
    let anchor = op.anchor.trim();
    match op.kind {
        NodeKind::Import => {
            for (i, stmt) in scope.iter().enumerate() {
                if matches!(stmt.kind, StmtKind::Import) && stmt.normalized_code().starts_with(anchor) {
                    return Resolution::Found(i);
                }
            }
            Resolution::NotFound
        }
        NodeKind::Class => match find_by_name(scope, anchor, is_class_def) {
            Resolution::Found(i) => Resolution::Found(i),
            Resolution::NotFound => fallback_match(scope, anchor),
        },
        NodeKind::Function | NodeKind::Method => match find_by_name(scope, anchor, is_function_def) {
            Resolution::Found(i) => Resolution::Found(i),
            Resolution::NotFound => fallback_match(scope, anchor),
        },
        NodeKind::File => Resolution::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crengine_source::SourceTree;
    use crengine_types::UnitOpKind;

    fn op(kind: NodeKind, anchor: &str) -> UnitOp {
        UnitOp { op: UnitOpKind::InsertAfter, kind, anchor: anchor.to_string(), class_name: None, cr_id: None, install: None }
    }

    #[test]
    fn resolves_import_by_prefix_match() {
        let tree = SourceTree::parse("import os\nimport time  # noqa\n").unwrap();
        let resolved = resolve(&tree.stmts, &op(NodeKind::Import, "import time"));
        assert_eq!(resolved, Resolution::Found(1));
    }

    #[test]
    fn resolves_function_by_name() {
        let tree = SourceTree::parse("def a():\n    pass\n\ndef b():\n    pass\n").unwrap();
        assert_eq!(resolve(&tree.stmts, &op(NodeKind::Function, "b")), Resolution::Found(1));
    }

    #[test]
    fn resolves_class_by_name() {
        let tree = SourceTree::parse("class A:\n    pass\n\nclass B:\n    pass\n").unwrap();
        assert_eq!(resolve(&tree.stmts, &op(NodeKind::Class, "B")), Resolution::Found(1));
    }

    #[test]
    fn resolves_method_within_class_scope() {
        let tree = SourceTree::parse("class Widget:\n    def render(self):\n        return 1\n").unwrap();
        let body = tree.find_class("Widget").unwrap();
        assert_eq!(resolve(&body.stmts, &op(NodeKind::Method, "render")), Resolution::Found(0));
    }

    #[test]
    fn falls_back_to_normalized_text_match() {
        let tree = SourceTree::parse("x=1\n").unwrap();
        assert_eq!(resolve(&tree.stmts, &op(NodeKind::Function, "x = 1")), Resolution::Found(0));
    }

    #[test]
    fn import_has_no_fallback() {
        let tree = SourceTree::parse("import os\n").unwrap();
        assert_eq!(resolve(&tree.stmts, &op(NodeKind::Import, "import time")), Resolution::NotFound);
    }

    #[test]
    fn not_found_when_nothing_matches() {
        let tree = SourceTree::parse("def a():\n    pass\n").unwrap();
        assert_eq!(resolve(&tree.stmts, &op(NodeKind::Function, "missing")), Resolution::NotFound);
    }
}

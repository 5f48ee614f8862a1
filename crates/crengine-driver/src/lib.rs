//! Multi-pass driver (`spec.md` §4.7): applies a batch of unit ops to a
//! module's source tree.
//!
//! Module-scope ops (`import`, `class`, `function`) and class-scope ops
//! (`method`) are separated and run through two independent fixpoint
//! loops. Each loop resolves and applies in input order, deferring any op
//! whose anchor does not yet resolve; a loop stops when either every op
//! has applied or a whole pass makes no further progress. This lets ops
//! depend on earlier ops in the same batch — e.g. inserting a class, then
//! inserting a method into that just-inserted class — without needing
//! recursive CST visitors: the fixpoint is a flat loop over an
//! applied/deferred partition (`spec.md` §9 Design Notes).

use crengine_anchor::{resolve, Resolution};
use crengine_apply::apply;
use crengine_header::emit_marker;
use crengine_integration::ParsedUnit;
use crengine_source::{parse_single_statement, SourceTree, Stmt, StmtKind};
use crengine_types::{NodeKind, TimeStamp, UnitOp, UnitOpKind};

#[derive(Debug, Clone)]
struct OpItem {
    op: UnitOp,
    payload: Option<String>,
}

impl From<&ParsedUnit> for OpItem {
    fn from(unit: &ParsedUnit) -> Self {
        OpItem { op: unit.op.clone(), payload: unit.payload.as_ref().map(|p| p.text.clone()) }
    }
}

/// The result of running a batch of ops against one source tree.
pub struct DriverOutput {
    pub tree: SourceTree,
    /// Anchors that never resolved, reported but not fatal.
    pub warnings: Vec<String>,
}

fn split(units: &[ParsedUnit]) -> (Vec<OpItem>, Vec<OpItem>) {
    let mut module_ops = Vec::new();
    let mut method_ops = Vec::new();
    for unit in units {
        if unit.op.kind.is_module_scope() {
            module_ops.push(OpItem::from(unit));
        } else {
            method_ops.push(OpItem::from(unit));
        }
    }
    (module_ops, method_ops)
}

/// Runs the module-scope fixpoint directly against `scope`.
fn module_fixpoint(scope: &mut Vec<Stmt>, mut ops: Vec<OpItem>, cr_id: &TimeStamp) -> Vec<OpItem> {
    loop {
        let mut deferred = Vec::new();
        let mut progressed = false;
        for item in ops {
            match resolve(scope, &item.op) {
                Resolution::Found(index) => match apply(scope, index, &item.op, item.payload.as_deref(), cr_id) {
                    Ok(_) => progressed = true,
                    Err(_) => deferred.push(item),
                },
                Resolution::NotFound => deferred.push(item),
            }
        }
        ops = deferred;
        if !progressed || ops.is_empty() {
            return ops;
        }
    }
}

fn last_import_index(scope: &[Stmt]) -> Option<usize> {
    scope.iter().rposition(|s| matches!(s.kind, StmtKind::Import))
}

fn looks_like_module_docstring(stmt: &Stmt) -> bool {
    let t = stmt.text.trim_start();
    t.starts_with("\"\"\"") || t.starts_with("'''")
}

/// Where an import lands when its anchor never resolves: after the last
/// existing import, after a leading module docstring, or at index 0.
fn positional_fallback_index(scope: &[Stmt]) -> usize {
    if let Some(last) = last_import_index(scope) {
        last + 1
    } else if scope.first().map(looks_like_module_docstring).unwrap_or(false) {
        1
    } else {
        0
    }
}

/// Retries unresolved `import`-kind insertions at a positional fallback spot
/// (`SPEC_FULL.md` §4.6, grounded in
/// `transformer.ApplyChangesTransformer.leave_Module`'s non-targeted-insertion
/// branch): only `insert_before`/`insert_after` are eligible, since
/// `replace`/`remove` on an anchor that was never found has nothing sane to
/// target positionally.
fn import_positional_fallback(scope: &mut Vec<Stmt>, ops: Vec<OpItem>, cr_id: &TimeStamp) -> Vec<OpItem> {
    let mut remaining = Vec::new();
    for item in ops {
        let eligible =
            item.op.kind == NodeKind::Import && matches!(item.op.op, UnitOpKind::InsertBefore | UnitOpKind::InsertAfter);
        if !eligible {
            remaining.push(item);
            continue;
        }
        let Ok(mut stmt) = parse_single_statement(item.payload.as_deref().unwrap_or_default()) else {
            remaining.push(item);
            continue;
        };
        let index = positional_fallback_index(scope);
        stmt.leading_trivia = vec![emit_marker(&item.op, cr_id)];
        scope.insert(index, stmt);
    }
    remaining
}

fn find_class_index(module: &SourceTree, name: &str) -> Option<usize> {
    module.stmts.iter().position(|s| matches!(&s.kind, StmtKind::ClassDef { name: n } if n == name))
}

/// Runs the class-scope fixpoint: for each method op, locates its class in
/// the (already module-fixpoint'd) module, then resolves and applies
/// within that class's body.
fn method_fixpoint(module: &mut SourceTree, mut ops: Vec<OpItem>, cr_id: &TimeStamp) -> Vec<OpItem> {
    loop {
        let mut deferred = Vec::new();
        let mut progressed = false;
        for item in ops {
            let class_name = item.op.class_name.clone().unwrap_or_default();
            let Some(class_idx) = find_class_index(module, &class_name) else {
                deferred.push(item);
                continue;
            };
            let body = module.stmts[class_idx].body.get_or_insert_with(SourceTree::default);
            match resolve(&body.stmts, &item.op) {
                Resolution::Found(index) => {
                    match apply(&mut body.stmts, index, &item.op, item.payload.as_deref(), cr_id) {
                        Ok(_) => progressed = true,
                        Err(_) => deferred.push(item),
                    }
                }
                Resolution::NotFound => deferred.push(item),
            }
        }
        ops = deferred;
        if !progressed || ops.is_empty() {
            return ops;
        }
    }
}

fn describe(item: &OpItem) -> String {
    if let Some(class) = &item.op.class_name {
        format!("{}.{} ({})", class, item.op.anchor, item.op.op.as_str())
    } else {
        format!("{} ({})", item.op.anchor, item.op.op.as_str())
    }
}

/// Applies every unit op in `units` to `tree`, in two fixpoint passes.
/// Ops whose anchor never resolves are dropped with a warning, never
/// failed outright (`spec.md` §4.7).
pub fn apply_all(mut tree: SourceTree, units: &[ParsedUnit], cr_id: &TimeStamp) -> DriverOutput {
    let (module_ops, method_ops) = split(units);

    let unresolved_module = module_fixpoint(&mut tree.stmts, module_ops, cr_id);
    let unresolved_module = import_positional_fallback(&mut tree.stmts, unresolved_module, cr_id);
    let unresolved_method = method_fixpoint(&mut tree, method_ops, cr_id);

    let warnings: Vec<String> = unresolved_module
        .iter()
        .chain(unresolved_method.iter())
        .map(|item| format!("unresolved anchor: {}", describe(item)))
        .collect();
    for warning in &warnings {
        tracing::warn!(%warning, "unit op left unapplied after the final pass");
    }

    DriverOutput { tree, warnings }
}

// Scenario coverage for spec.md §8's S1-S6 lives in tests/end_to_end.rs,
// exercised against this module's public `apply_all` entry point.

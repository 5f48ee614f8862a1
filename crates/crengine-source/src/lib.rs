//! CST-lite source model (`spec.md` §4.2, §9 Design Notes).
//!
//! No whitespace/comment-preserving CST crate exists in the Rust ecosystem
//! for an arbitrary target language (the `syn` family only covers Rust), so
//! this crate implements the fallback the specification documents itself: a
//! line+range statement model. A [`SourceTree`] is a sequence of [`Stmt`]s,
//! each carrying its own leading trivia (blank lines, `#`-comments,
//! `@decorator` lines) as raw text rather than structured nodes — comments
//! and whitespace are preserved as spans, not reparsed.
//!
//! Only `class` bodies recurse into a nested [`SourceTree`]; everything else
//! (including `def` bodies) is kept as one flat statement span, because the
//! engine only ever needs to address two scopes: module-level and
//! method-level inside a class (`spec.md` §4.7).

use crengine_error::{CrError, CrResult};

/// What kind of statement a [`Stmt`] is, as far as the engine needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    Import,
    ClassDef { name: String },
    FunctionDef { name: String },
    Other,
}

/// One top-level (or class-body-level) statement, with its attached leading
/// trivia preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    /// Contiguous blank/comment/decorator lines immediately preceding this
    /// statement, in original order, without their own trailing newlines.
    pub leading_trivia: Vec<String>,
    /// The statement's own text span: for `class`, just the header line;
    /// for everything else, the header plus every more-deeply-indented
    /// continuation line, joined with `\n`.
    pub text: String,
    pub kind: StmtKind,
    /// Present only for `ClassDef`.
    pub body: Option<SourceTree>,
}

impl Stmt {
    pub fn def_name(&self) -> Option<&str> {
        match &self.kind {
            StmtKind::ClassDef { name } | StmtKind::FunctionDef { name } => Some(name),
            _ => None,
        }
    }

    /// Outer-whitespace-stripped text, used for the de-duplication /
    /// idempotence check in the operation applier (`spec.md` §4.6).
    pub fn normalized_code(&self) -> String {
        self.text.trim().to_string()
    }

    /// Whitespace-removed, lowercased text, used only by the anchor
    /// resolver's last-resort fallback match (`spec.md` §4.5).
    pub fn fallback_normalized(&self) -> String {
        self.text.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase()
    }

    /// Reconstructs this statement's original text, trivia included.
    pub fn emit(&self) -> String {
        let mut out = String::new();
        for line in &self.leading_trivia {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&self.text);
        if let Some(body) = &self.body {
            out.push('\n');
            out.push_str(&body.emit());
        }
        out
    }
}

/// An ordered sequence of statements at one scope (module, or one class's
/// body), plus any trivia trailing the last statement.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceTree {
    pub stmts: Vec<Stmt>,
    pub trailing_trivia: Vec<String>,
    /// Whether the original text this tree was parsed from ended in a
    /// newline. `str::lines` drops that distinction, so it's tracked
    /// separately and restored by `emit` to keep the empty-op-list identity
    /// property (`spec.md` §8) byte-for-byte, not just line-for-line. Only
    /// meaningful at the module-level tree; nested class-body trees never
    /// set it, since a body's newline is supplied by its enclosing `Stmt`.
    pub ends_with_newline: bool,
}

impl SourceTree {
    /// Parses a whole source file into a module-scope tree.
    pub fn parse(source: &str) -> CrResult<SourceTree> {
        let lines: Vec<&str> = source.lines().collect();
        let (stmts, trailing_trivia, _) = parse_scope(&lines, 0, Some(0));
        Ok(SourceTree { stmts, trailing_trivia, ends_with_newline: source.ends_with('\n') })
    }

    pub fn emit(&self) -> String {
        let mut chunks: Vec<String> = self.stmts.iter().map(Stmt::emit).collect();
        if !self.trailing_trivia.is_empty() {
            chunks.push(self.trailing_trivia.join("\n"));
        }
        let mut out = chunks.join("\n");
        if self.ends_with_newline && !out.is_empty() {
            out.push('\n');
        }
        out
    }

    /// Looks up a class body by name, used by the anchor resolver to scope
    /// a method op to its enclosing class.
    pub fn find_class<'a>(&'a self, name: &str) -> Option<&'a SourceTree> {
        self.stmts.iter().find_map(|s| match &s.kind {
            StmtKind::ClassDef { name: n } if n == name => s.body.as_ref(),
            _ => None,
        })
    }
}

/// Parses dedented payload text (`spec.md` §4.3) as exactly one top-level
/// statement. More than one, or none at all, is a [`CrError::Parse`].
pub fn parse_single_statement(text: &str) -> CrResult<Stmt> {
    if text.trim().is_empty() {
        return Err(CrError::parse("<payload>", "payload is empty"));
    }
    let lines: Vec<&str> = text.lines().collect();
    let (stmts, _trailing, _) = parse_scope(&lines, 0, Some(0));
    match stmts.len() {
        1 => Ok(stmts.into_iter().next().expect("checked len == 1")),
        0 => Err(CrError::parse("<payload>", "payload contains no statement")),
        n => Err(CrError::parse("<payload>", format!("expected exactly one statement, found {n}"))),
    }
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

fn is_decorator(line: &str) -> bool {
    line.trim_start().starts_with('@')
}

fn extract_name(rest: &str) -> String {
    rest.chars().take_while(|c| c.is_alphanumeric() || *c == '_').collect()
}

fn classify(line: &str) -> StmtKind {
    let t = line.trim_start();
    if let Some(rest) = t.strip_prefix("import ") {
        let _ = rest;
        StmtKind::Import
    } else if t.starts_with("from ") && t.contains(" import ") {
        StmtKind::Import
    } else if let Some(rest) = t.strip_prefix("class ") {
        StmtKind::ClassDef { name: extract_name(rest) }
    } else if let Some(rest) = t.strip_prefix("def ") {
        StmtKind::FunctionDef { name: extract_name(rest) }
    } else {
        StmtKind::Other
    }
}

/// Scans `lines[start..]` for a sequence of statements at one indentation
/// scope, returning the statements, the trivia trailing the last one (or
/// preceding the line that ended the scope), and the index of the first
/// line not consumed by this scope.
///
/// `fixed_indent` pins the scope's statement column (`Some(0)` at module
/// level); `None` means "discover it from the first non-blank line", used
/// when recursing into a class body whose indent width is whatever the
/// source actually uses.
fn parse_scope(lines: &[&str], mut i: usize, fixed_indent: Option<usize>) -> (Vec<Stmt>, Vec<String>, usize) {
    let mut stmts = Vec::new();
    let mut base_indent = fixed_indent;

    loop {
        let mut trivia = Vec::new();
        loop {
            if i >= lines.len() {
                return (stmts, trivia, i);
            }
            let line = lines[i];
            if is_blank(line) {
                trivia.push(line.to_string());
                i += 1;
                continue;
            }
            let ind = indent_of(line);
            match base_indent {
                Some(b) if ind < b => return (stmts, trivia, i),
                Some(b) if ind > b => return (stmts, trivia, i),
                None => base_indent = Some(ind),
                _ => {}
            }
            if is_comment(line) || is_decorator(line) {
                trivia.push(line.to_string());
                i += 1;
                continue;
            }
            break;
        }
        if i >= lines.len() {
            return (stmts, trivia, i);
        }

        let b = base_indent.expect("set above");
        let stmt_start = i;
        let kind = classify(lines[i]);
        i += 1;

        let mut pending_blanks = 0usize;
        loop {
            if i >= lines.len() {
                i -= pending_blanks;
                break;
            }
            let line = lines[i];
            if is_blank(line) {
                pending_blanks += 1;
                i += 1;
                continue;
            }
            if indent_of(line) > b {
                pending_blanks = 0;
                i += 1;
            } else {
                i -= pending_blanks;
                break;
            }
        }

        let text_lines = &lines[stmt_start..i];
        if let StmtKind::ClassDef { .. } = &kind {
            let header = text_lines[0].to_string();
            let (body_stmts, body_trailing, _) = parse_scope(text_lines, 1, None);
            stmts.push(Stmt {
                leading_trivia: trivia,
                text: header,
                kind,
                body: Some(SourceTree { stmts: body_stmts, trailing_trivia: body_trailing, ends_with_newline: false }),
            });
        } else {
            stmts.push(Stmt {
                leading_trivia: trivia,
                text: text_lines.join("\n"),
                kind,
                body: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_imports() {
        let src = "import os\nimport time\n\ndef f():\n    pass\n";
        let tree = SourceTree::parse(src).unwrap();
        assert_eq!(tree.stmts.len(), 3);
        assert_eq!(tree.stmts[0].kind, StmtKind::Import);
        assert_eq!(tree.stmts[1].kind, StmtKind::Import);
        assert_eq!(tree.stmts[2].def_name(), Some("f"));
    }

    #[test]
    fn attaches_comment_as_leading_trivia() {
        let src = "import os\n# a note\nimport time\n";
        let tree = SourceTree::parse(src).unwrap();
        assert_eq!(tree.stmts[1].leading_trivia, vec!["# a note".to_string()]);
    }

    #[test]
    fn parses_class_body_as_nested_tree() {
        let src = "class Widget:\n    def render(self):\n        return 1\n\n    def close(self):\n        pass\n";
        let tree = SourceTree::parse(src).unwrap();
        let class = &tree.stmts[0];
        assert_eq!(class.def_name(), Some("Widget"));
        let body = class.body.as_ref().unwrap();
        assert_eq!(body.stmts.len(), 2);
        assert_eq!(body.stmts[0].def_name(), Some("render"));
        assert_eq!(body.stmts[1].def_name(), Some("close"));
    }

    #[test]
    fn find_class_looks_up_by_name() {
        let src = "class A:\n    def m(self):\n        pass\n\nclass B:\n    def n(self):\n        pass\n";
        let tree = SourceTree::parse(src).unwrap();
        assert!(tree.find_class("B").is_some());
        assert!(tree.find_class("Z").is_none());
    }

    #[test]
    fn emit_round_trips_a_simple_module() {
        let src = "import os\nimport time\n";
        let tree = SourceTree::parse(src).unwrap();
        assert_eq!(tree.emit(), src);
    }

    #[test]
    fn emit_round_trips_a_module_with_no_trailing_newline() {
        let src = "import os\nimport time";
        let tree = SourceTree::parse(src).unwrap();
        assert_eq!(tree.emit(), src);
    }

    #[test]
    fn emit_is_byte_for_byte_identity_with_no_ops_applied() {
        let src = "import os\n\n# a note\nclass C:\n    def m(self):\n        pass\n\n\ndef f():\n    return 1\n";
        let tree = SourceTree::parse(src).unwrap();
        assert_eq!(tree.emit(), src);
    }

    #[test]
    fn parse_single_statement_accepts_exactly_one() {
        let stmt = parse_single_statement("import re").unwrap();
        assert_eq!(stmt.kind, StmtKind::Import);
    }

    #[test]
    fn parse_single_statement_rejects_multiple() {
        assert!(parse_single_statement("import re\nimport os").is_err());
    }

    #[test]
    fn parse_single_statement_rejects_empty() {
        assert!(parse_single_statement("   \n").is_err());
    }

    #[test]
    fn normalized_code_strips_outer_whitespace_only() {
        let stmt = parse_single_statement("  import re  ").unwrap();
        assert_eq!(stmt.normalized_code(), "import re");
    }

    #[test]
    fn fallback_normalized_strips_all_whitespace_and_lowercases() {
        let stmt = parse_single_statement("import  RE").unwrap();
        assert_eq!(stmt.fallback_normalized(), "importre");
    }
}

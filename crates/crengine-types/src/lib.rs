//! Shared data model for the change-request refactoring engine.
//!
//! This crate has no business logic: it only defines the sum types and
//! plain structs that every other `crengine-*` crate passes around, so
//! that invalid combinations (e.g. `cr_type: file` on a unit header) are
//! unrepresentable rather than checked at runtime.

mod timestamp;

pub use timestamp::{TimeStamp, TimeStampError};

use serde::{Deserialize, Serialize};

/// Distinguishes the two header line syntaxes by delimiter width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeaderKind {
    /// `#--- … ---#`
    Package,
    /// `#-- … --#`
    Unit,
}

/// Operation verbs valid on a package (file-level) header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageOp {
    Update,
    Create,
    Remove,
}

impl PackageOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageOp::Update => "update",
            PackageOp::Create => "create",
            PackageOp::Remove => "remove",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "update" => Some(Self::Update),
            "create" => Some(Self::Create),
            "remove" => Some(Self::Remove),
            _ => None,
        }
    }
}

/// Operation verbs valid on a unit header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitOpKind {
    InsertBefore,
    InsertAfter,
    Replace,
    Remove,
}

impl UnitOpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitOpKind::InsertBefore => "insert_before",
            UnitOpKind::InsertAfter => "insert_after",
            UnitOpKind::Replace => "replace",
            UnitOpKind::Remove => "remove",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "insert_before" => Some(Self::InsertBefore),
            "insert_after" => Some(Self::InsertAfter),
            "replace" => Some(Self::Replace),
            "remove" => Some(Self::Remove),
            _ => None,
        }
    }

    /// `insert_before` / `insert_after` / `replace` require a payload unless
    /// the unit kind is `import` (the anchor string carries the content).
    pub fn requires_payload_unless_import(&self) -> bool {
        !matches!(self, UnitOpKind::Remove)
    }
}

/// The kind of syntactic object a directive targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    File,
    Import,
    Class,
    Function,
    Method,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Import => "import",
            NodeKind::Class => "class",
            NodeKind::Function => "function",
            NodeKind::Method => "method",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(Self::File),
            "import" => Some(Self::Import),
            "class" => Some(Self::Class),
            "function" => Some(Self::Function),
            "method" => Some(Self::Method),
            _ => None,
        }
    }

    /// Module-scope kinds are resolved against the whole module's statement
    /// list; `method` is the only class-scope kind (§4.7).
    pub fn is_module_scope(&self) -> bool {
        matches!(self, NodeKind::Import | NodeKind::Class | NodeKind::Function)
    }
}

/// A package-level directive: exactly one must exist per integration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDirective {
    pub op: PackageOp,
    /// Always `NodeKind::File` — kept as a field (rather than dropped) so
    /// the header round-trips field-for-field.
    pub kind: NodeKind,
    /// File basename this directive targets.
    pub anchor: String,
    pub install: Option<bool>,
    pub cr_id: Option<TimeStamp>,
}

/// A single localized change-request unit operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOp {
    pub op: UnitOpKind,
    pub kind: NodeKind,
    /// For `method`, this is the method name only; the class half is split
    /// off into `class_name` at parse time (§3 clarifications).
    pub anchor: String,
    /// Present only when `kind == Method`.
    pub class_name: Option<String>,
    pub cr_id: Option<TimeStamp>,
    pub install: Option<bool>,
}

impl UnitOp {
    /// The anchor as it should appear in a re-emitted marker: `Class.method`
    /// for method ops, otherwise the bare anchor.
    pub fn marker_anchor(&self) -> String {
        match &self.class_name {
            Some(class) if self.kind == NodeKind::Method => format!("{class}.{}", self.anchor),
            _ => self.anchor.clone(),
        }
    }
}

/// A payload statement attached to a `UnitOp`, carried as raw source text.
///
/// The engine's CST-lite source model (`crengine-source`) is responsible
/// for turning this text into a concrete statement; `crengine-types` only
/// knows it as opaque text so that this crate stays free of parsing logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadNode {
    pub text: String,
}

/// One of the four pipeline phases, in their fixed execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Prompt,
    Json,
    Integration,
    Processing,
}

pub const PHASE_ORDER: [Phase; 4] = [
    Phase::Prompt,
    Phase::Json,
    Phase::Integration,
    Phase::Processing,
];

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Prompt => "prompt",
            Phase::Json => "json",
            Phase::Integration => "integration",
            Phase::Processing => "processing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "prompt" => Some(Self::Prompt),
            "json" => Some(Self::Json),
            "integration" => Some(Self::Integration),
            "processing" => Some(Self::Processing),
            _ => None,
        }
    }

    pub fn index(&self) -> usize {
        PHASE_ORDER.iter().position(|p| p == self).expect("exhaustive")
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            Phase::Prompt => "md",
            Phase::Json => "json",
            Phase::Integration | Phase::Processing => "py",
        }
    }
}

/// `api` value the caller invoked the run with (`spec.md` §3, §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Api {
    Create,
    Update,
}

impl Api {
    pub fn as_str(&self) -> &'static str {
        match self {
            Api::Create => "create",
            Api::Update => "update",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_op_kind_round_trips() {
        for kind in [
            UnitOpKind::InsertBefore,
            UnitOpKind::InsertAfter,
            UnitOpKind::Replace,
            UnitOpKind::Remove,
        ] {
            assert_eq!(UnitOpKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn method_marker_anchor_rejoins_class_and_method() {
        let op = UnitOp {
            op: UnitOpKind::Replace,
            kind: NodeKind::Method,
            anchor: "m".to_string(),
            class_name: Some("C".to_string()),
            cr_id: None,
            install: None,
        };
        assert_eq!(op.marker_anchor(), "C.m");
    }

    #[test]
    fn phase_order_is_prompt_json_integration_processing() {
        assert_eq!(
            PHASE_ORDER,
            [Phase::Prompt, Phase::Json, Phase::Integration, Phase::Processing]
        );
    }
}

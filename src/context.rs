//! The cross-cutting `Context` value (`SPEC_FULL.md` §9 Design Notes,
//! "Dynamic keyword passing"): collapses the identifiers almost every
//! component ends up needing — `cr_id`, `pg_name`, `work_file_name`, the
//! project and resources directories — into one immutable value built
//! once by the CLI and threaded by reference, instead of the source's
//! pervasive untyped kwargs bag.

use crengine_types::TimeStamp;
use std::path::PathBuf;

/// Identifiers shared across a single change-request run.
#[derive(Debug, Clone)]
pub struct Context {
    pub cr_id: TimeStamp,
    pub pg_name: String,
    pub work_file_name: String,
    pub verbose: u8,
    pub resources_dir: PathBuf,
    pub project_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_plain_data() {
        let ctx = Context {
            cr_id: TimeStamp::parse("2025-09-25-00-00-00").unwrap(),
            pg_name: "pkg".to_string(),
            work_file_name: "a.py".to_string(),
            verbose: 0,
            resources_dir: PathBuf::from("/tmp/res"),
            project_dir: PathBuf::from("/tmp/proj"),
        };
        let cloned = ctx.clone();
        assert_eq!(cloned.pg_name, "pkg");
    }
}

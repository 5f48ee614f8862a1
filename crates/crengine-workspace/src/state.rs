//! The CR State Record (`spec.md` §3, §8 C8): one mutable record tracking
//! a single change request's identity, phase progress, and on-disk
//! artifact existence.
//!
//! Grounded in `original_source/codeon/cr_info.py`'s `CrData` dataclass: the same
//! fields (`cr_id`, `pg_name`, `work_file_name`, `api`, `entry_phase`,
//! `current_phase`, `up_to_phase`, `hot`, the per-phase `*_string`
//! snapshots, and the six derived paths with their `*_file_exists` flags)
//! expressed as a plain Rust struct instead of a `kwargs`-driven
//! `@dataclass`.

use crate::paths::CrPaths;
use crengine_types::{Api, Phase, TimeStamp, PHASE_ORDER};
use std::path::{Path, PathBuf};

/// Directories skipped while searching for a source file by basename
/// (`original_source/codeon/settings.py::ignore_dirs`).
const IGNORE_DIRS: [&str; 10] =
    [".git", "build", "gp", "dist", "models", "__pycache__", ".pytest_cache", ".tox", "helpers", "node_modules"];

const MAX_SEARCH_DEPTH: usize = 5;

/// Per-phase boolean existence flags, refreshed from disk at every phase
/// boundary (`spec.md` §3 Invariant 2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseExists {
    pub prompt: bool,
    pub json: bool,
    pub integration: bool,
    pub processing: bool,
}

impl PhaseExists {
    fn get(&self, phase: Phase) -> bool {
        match phase {
            Phase::Prompt => self.prompt,
            Phase::Json => self.json,
            Phase::Integration => self.integration,
            Phase::Processing => self.processing,
        }
    }

    fn set(&mut self, phase: Phase, value: bool) {
        match phase {
            Phase::Prompt => self.prompt = value,
            Phase::Json => self.json = value,
            Phase::Integration => self.integration = value,
            Phase::Processing => self.processing = value,
        }
    }
}

/// The single mutable record a [`crate`]-external phase driver advances
/// through `prompt -> json -> integration -> processing`.
#[derive(Debug, Clone)]
pub struct CrState {
    pub cr_id: TimeStamp,
    pub pg_name: String,
    pub work_file_name: String,
    pub api: Api,
    pub entry_phase: Option<Phase>,
    pub current_phase: Option<Phase>,
    pub up_to_phase: Phase,
    pub hot: bool,

    pub prompt_string: Option<String>,
    pub json_string: Option<String>,
    pub integration_string: Option<String>,
    pub processing_string: Option<String>,

    pub paths: CrPaths,
    pub exists: PhaseExists,

    /// `None` mirrors `spec.md`'s "may be `not-yet-created`": the work
    /// file does not exist anywhere under `project_dir` yet (a `create`
    /// run).
    pub source_path: Option<PathBuf>,
    pub project_dir: PathBuf,
    pub work_dir: Option<PathBuf>,
}

impl CrState {
    /// Builds a fresh record: resolves `source_path` (searching
    /// `project_dir` if it isn't known yet), derives the six artifact
    /// paths, creates their directories, and probes the filesystem to
    /// populate `exists` and `entry_phase` (`spec.md` §3 Lifecycle).
    pub fn new(
        resources_dir: &Path,
        pg_name: impl Into<String>,
        work_file_name: impl Into<String>,
        cr_id: TimeStamp,
        api: Api,
        up_to_phase: Phase,
        hot: bool,
        project_dir: PathBuf,
        source_path_hint: Option<PathBuf>,
    ) -> crengine_error::CrResult<CrState> {
        let pg_name = pg_name.into();
        let work_file_name = work_file_name.into();
        let paths = CrPaths::new(resources_dir, &pg_name, &work_file_name, cr_id.as_str());
        paths.create_dirs()?;

        let source_path = match source_path_hint {
            Some(p) if p.is_file() => Some(p),
            _ => find_file_path(&project_dir, &work_file_name, MAX_SEARCH_DEPTH),
        };

        let mut state = CrState {
            cr_id,
            pg_name,
            work_file_name,
            api,
            entry_phase: None,
            current_phase: None,
            up_to_phase,
            hot,
            prompt_string: None,
            json_string: None,
            integration_string: None,
            processing_string: None,
            paths,
            exists: PhaseExists::default(),
            source_path,
            project_dir,
            work_dir: None,
        };
        state.refresh_exists();
        Ok(state)
    }

    /// Re-probes the filesystem for every phase artifact (`spec.md` §3
    /// Invariant 2) and, the first time this runs, sets `entry_phase` to
    /// the first phase in order whose artifact already exists (Invariant
    /// 3). Re-running never changes an already-set `entry_phase`.
    pub fn refresh_exists(&mut self) {
        let mut first_existing = None;
        for &phase in &PHASE_ORDER {
            let exists = self.paths.exists(phase);
            self.exists.set(phase, exists);
            if exists && first_existing.is_none() {
                first_existing = Some(phase);
            }
        }
        if self.entry_phase.is_none() {
            self.entry_phase = first_existing;
        }
    }

    /// Advances `current_phase` to `phase`. Panics if `phase` would move
    /// backwards in phase order (`spec.md` §3 Invariant 4: `current_phase`
    /// monotonically advances and never regresses) — a caller bug, not a
    /// recoverable runtime condition.
    pub fn advance_to(&mut self, phase: Phase) {
        if let Some(current) = self.current_phase {
            assert!(phase.index() >= current.index(), "phase must not regress: {current:?} -> {phase:?}");
        }
        self.current_phase = Some(phase);
        self.refresh_exists();
    }

    /// Whether `phase` falls within `[entry_phase, up_to_phase]`, i.e.
    /// should actually run rather than be skipped-but-refreshed
    /// (`spec.md` §4.8).
    pub fn phase_in_range(&self, phase: Phase) -> bool {
        let entry = self.entry_phase.unwrap_or(Phase::Prompt);
        phase.index() >= entry.index() && phase.index() <= self.up_to_phase.index()
    }

    pub fn phase_exists(&self, phase: Phase) -> bool {
        self.exists.get(phase)
    }

    /// The in-memory string for `phase`, if the caller has supplied or
    /// loaded one yet.
    pub fn phase_string(&self, phase: Phase) -> Option<&str> {
        match phase {
            Phase::Prompt => self.prompt_string.as_deref(),
            Phase::Json => self.json_string.as_deref(),
            Phase::Integration => self.integration_string.as_deref(),
            Phase::Processing => self.processing_string.as_deref(),
        }
    }

    pub fn set_phase_string(&mut self, phase: Phase, value: String) {
        match phase {
            Phase::Prompt => self.prompt_string = Some(value),
            Phase::Json => self.json_string = Some(value),
            Phase::Integration => self.integration_string = Some(value),
            Phase::Processing => self.processing_string = Some(value),
        }
    }
}

/// Walks `project_dir` looking for a file named `file_name`, skipping
/// `IGNORE_DIRS` and anything deeper than `max_depth` directories below
/// the root (`original_source/codeon/cr_info.py::CrData.find_file_path`).
fn find_file_path(project_dir: &Path, file_name: &str, max_depth: usize) -> Option<PathBuf> {
    fn is_ignored(name: &str) -> bool {
        IGNORE_DIRS.iter().any(|ignored| name == *ignored || name.ends_with(ignored.trim_start_matches('*')))
    }

    fn walk(dir: &Path, file_name: &str, depth: usize, max_depth: usize) -> Option<PathBuf> {
        if depth > max_depth {
            return None;
        }
        let entries = std::fs::read_dir(dir).ok()?;
        let mut subdirs = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if path.is_dir() {
                if !is_ignored(&name) {
                    subdirs.push(path);
                }
            } else if name == file_name {
                return Some(path);
            }
        }
        for subdir in subdirs {
            if let Some(found) = walk(&subdir, file_name, depth + 1, max_depth) {
                return Some(found);
            }
        }
        None
    }

    walk(project_dir, file_name, 0, max_depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> TimeStamp {
        TimeStamp::parse("2025-09-25-00-00-00").unwrap()
    }

    #[test]
    fn entry_phase_is_the_first_existing_artifact() {
        let resources = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let paths = CrPaths::new(resources.path(), "pkg", "a.py", "2025-09-25-00-00-00");
        paths.create_dirs().unwrap();
        std::fs::write(&paths.json_path, "{}").unwrap();

        let state = CrState::new(
            resources.path(), "pkg", "a.py", ts(), Api::Update, Phase::Processing, false, project.path().to_path_buf(), None,
        )
        .unwrap();

        assert_eq!(state.entry_phase, Some(Phase::Json));
    }

    #[test]
    fn advance_to_is_monotonic() {
        let resources = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let mut state = CrState::new(
            resources.path(), "pkg", "a.py", ts(), Api::Create, Phase::Processing, false, project.path().to_path_buf(), None,
        )
        .unwrap();
        state.advance_to(Phase::Prompt);
        state.advance_to(Phase::Json);
        assert_eq!(state.current_phase, Some(Phase::Json));
    }

    #[test]
    #[should_panic(expected = "phase must not regress")]
    fn advance_to_panics_on_regression() {
        let resources = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let mut state = CrState::new(
            resources.path(), "pkg", "a.py", ts(), Api::Create, Phase::Processing, false, project.path().to_path_buf(), None,
        )
        .unwrap();
        state.advance_to(Phase::Integration);
        state.advance_to(Phase::Json);
    }

    #[test]
    fn finds_source_file_by_walking_the_project_dir() {
        let resources = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let nested = project.path().join("pkg").join("sub");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("widgets.py"), "import os\n").unwrap();

        let state = CrState::new(
            resources.path(), "pkg", "widgets.py", ts(), Api::Update, Phase::Processing, false, project.path().to_path_buf(), None,
        )
        .unwrap();

        assert_eq!(state.source_path, Some(nested.join("widgets.py")));
    }

    #[test]
    fn source_path_is_none_when_the_file_does_not_exist_yet() {
        let resources = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let state = CrState::new(
            resources.path(), "pkg", "new_widget.py", ts(), Api::Create, Phase::Processing, false, project.path().to_path_buf(), None,
        )
        .unwrap();
        assert_eq!(state.source_path, None);
    }

    #[test]
    fn ignored_directories_are_skipped_during_search() {
        let resources = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let ignored = project.path().join("build");
        std::fs::create_dir_all(&ignored).unwrap();
        std::fs::write(ignored.join("a.py"), "import os\n").unwrap();

        let state = CrState::new(
            resources.path(), "pkg", "a.py", ts(), Api::Update, Phase::Processing, false, project.path().to_path_buf(), None,
        )
        .unwrap();
        assert_eq!(state.source_path, None);
    }
}

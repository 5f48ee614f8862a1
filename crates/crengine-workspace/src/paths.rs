//! On-disk artifact layout (`spec.md` §6):
//!
//! ```text
//! <resources>/P/prompts/cr_<id>_<name>.md
//! <resources>/P/jsons/cr_<id>_<name>.json
//! <resources>/P/integrations/cr_<id>_<name>.py
//! <resources>/P/processing/cr_<id>_<name>.py
//! <resources>/P/<P>_archive/cr_<id>_<name>.py         (restore)
//! <resources>/P/logs/cr_<id>_<name>.py                (yaml record)
//! ```
//!
//! Grounded in `original_source/codeon/settings.py`'s `cr_paths` table of
//! `(dir_fn, file_name_fn)` pairs, collapsed here into one plain struct
//! since every directory/extension is now known statically per phase
//! rather than looked up by string key.

use crengine_error::{CrError, CrResult};
use crengine_types::Phase;
use std::path::{Path, PathBuf};

/// The six derived paths for one change request, plus the directory they
/// all live under (`<resources>/<pg_name>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrPaths {
    pub temp_dir: PathBuf,
    pub prompt_path: PathBuf,
    pub json_path: PathBuf,
    pub integration_path: PathBuf,
    pub processing_path: PathBuf,
    pub restore_path: PathBuf,
    pub log_path: PathBuf,
}

/// `spec.md`'s `work_file_name.split(".")[0]` stem: everything before the
/// *first* dot, not the usual last-dot file stem.
pub fn leading_stem(work_file_name: &str) -> &str {
    work_file_name.split('.').next().unwrap_or(work_file_name)
}

impl CrPaths {
    pub fn new(resources_dir: &Path, pg_name: &str, work_file_name: &str, cr_id: &str) -> CrPaths {
        let temp_dir = resources_dir.join(pg_name);
        let stem = leading_stem(work_file_name);
        let artifact = |subdir: &str, ext: &str| temp_dir.join(subdir).join(format!("cr_{cr_id}_{stem}.{ext}"));

        CrPaths {
            prompt_path: artifact("prompts", "md"),
            json_path: artifact("jsons", "json"),
            integration_path: artifact("integrations", "py"),
            processing_path: artifact("processing", "py"),
            restore_path: artifact(&format!("{pg_name}_archive"), "py"),
            log_path: artifact("logs", "py"),
            temp_dir,
        }
    }

    pub fn for_phase(&self, phase: Phase) -> &Path {
        match phase {
            Phase::Prompt => &self.prompt_path,
            Phase::Json => &self.json_path,
            Phase::Integration => &self.integration_path,
            Phase::Processing => &self.processing_path,
        }
    }

    /// Every directory an artifact lives in, for `mk_cr_dirs`.
    fn artifact_dirs(&self) -> Vec<PathBuf> {
        [&self.prompt_path, &self.json_path, &self.integration_path, &self.processing_path, &self.restore_path, &self.log_path]
            .iter()
            .filter_map(|p| p.parent().map(Path::to_path_buf))
            .collect()
    }

    /// Creates every artifact directory that doesn't already exist
    /// (`original_source/codeon/cr_info.py`'s `CrData.mk_cr_dirs`).
    pub fn create_dirs(&self) -> CrResult<()> {
        for dir in self.artifact_dirs() {
            if !dir.is_dir() {
                std::fs::create_dir_all(&dir).map_err(|e| CrError::io(&dir, e))?;
            }
        }
        Ok(())
    }

    pub fn exists(&self, phase: Phase) -> bool {
        self.for_phase(phase).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_stem_splits_on_first_dot() {
        assert_eq!(leading_stem("widgets.py"), "widgets");
        assert_eq!(leading_stem("widgets.test.py"), "widgets");
        assert_eq!(leading_stem("no_extension"), "no_extension");
    }

    #[test]
    fn builds_all_six_paths_under_the_package_directory() {
        let paths = CrPaths::new(Path::new("/home/u/.crengine"), "myproj", "widgets.py", "2025-09-25-00-00-00");
        assert_eq!(paths.prompt_path, Path::new("/home/u/.crengine/myproj/prompts/cr_2025-09-25-00-00-00_widgets.md"));
        assert_eq!(paths.json_path, Path::new("/home/u/.crengine/myproj/jsons/cr_2025-09-25-00-00-00_widgets.json"));
        assert_eq!(paths.restore_path, Path::new("/home/u/.crengine/myproj/myproj_archive/cr_2025-09-25-00-00-00_widgets.py"));
        assert_eq!(paths.log_path, Path::new("/home/u/.crengine/myproj/logs/cr_2025-09-25-00-00-00_widgets.py"));
    }

    #[test]
    fn create_dirs_makes_every_artifact_directory() {
        let dir = tempfile::tempdir().unwrap();
        let paths = CrPaths::new(dir.path(), "myproj", "a.py", "2025-09-25-00-00-00");
        paths.create_dirs().unwrap();
        assert!(paths.prompt_path.parent().unwrap().is_dir());
        assert!(paths.restore_path.parent().unwrap().is_dir());
        assert!(paths.log_path.parent().unwrap().is_dir());
    }

    #[test]
    fn exists_reflects_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let paths = CrPaths::new(dir.path(), "myproj", "a.py", "2025-09-25-00-00-00");
        paths.create_dirs().unwrap();
        assert!(!paths.exists(Phase::Json));
        std::fs::write(&paths.json_path, "{}").unwrap();
        assert!(paths.exists(Phase::Json));
    }
}

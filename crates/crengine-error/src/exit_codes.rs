//! Exit code constants, mirroring the teacher's `exit_codes` module but
//! scoped to the exit-code contract in `spec.md` §6: 0 on success, 1 on
//! fatal validation failure, non-zero otherwise.

use crate::CrError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FATAL_VALIDATION: ExitCode = ExitCode(1);
    pub const PHASE_FAILED: ExitCode = ExitCode(2);
    pub const IO_ERROR: ExitCode = ExitCode(3);
    pub const INTERNAL: ExitCode = ExitCode(70);

    pub fn as_i32(self) -> i32 {
        self.0
    }
}

impl From<&CrError> for ExitCode {
    fn from(err: &CrError) -> Self {
        match err {
            CrError::BadHeader { .. } | CrError::Parse { .. } => ExitCode::FATAL_VALIDATION,
            CrError::PhaseFailed { .. } | CrError::RepairFailed { .. } => ExitCode::PHASE_FAILED,
            CrError::Io { .. } => ExitCode::IO_ERROR,
            CrError::AnchorNotFound { .. } => ExitCode::INTERNAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_header_is_fatal_validation() {
        let err = CrError::bad_header("#-- … --#", "unknown key");
        assert_eq!(ExitCode::from(&err), ExitCode::FATAL_VALIDATION);
        assert_eq!(ExitCode::FATAL_VALIDATION.as_i32(), 1);
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Access denied opening process {pid}: {message}")]
    AccessDenied { pid: u32, message: String },

    #[error("Module not found in process snapshot: {0}")]
    ModuleNotFound(String),

    #[error("Signature pattern not found: {0}")]
    PatternNotFound(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Offset table has no entry for '{0}'")]
    MissingOffset(String),

    #[error("Offset table has no build '{requested}' (available: {available})")]
    UnknownBuild { requested: String, available: String },

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Whether the error happened while attaching to the target.
    pub fn is_attach_failure(&self) -> bool {
        matches!(
            self,
            Error::ProcessNotFound(_) | Error::AccessDenied { .. } | Error::ModuleNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.is_not_found());

        let other_io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err2 = Error::Io(other_io_err);
        assert!(!err2.is_not_found());
    }

    #[test]
    fn test_attach_failures() {
        assert!(Error::ProcessNotFound("SoTGame.exe".into()).is_attach_failure());
        assert!(
            Error::AccessDenied {
                pid: 4,
                message: "denied".into()
            }
            .is_attach_failure()
        );
        assert!(!Error::PatternNotFound("world".into()).is_attach_failure());
    }

    #[test]
    fn test_missing_offset_message() {
        let err = Error::MissingOffset("AActor.actorId".into());
        assert_eq!(
            err.to_string(),
            "Offset table has no entry for 'AActor.actorId'"
        );
    }
}

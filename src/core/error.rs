use thiserror::Error;

/// Failure kinds surfaced by the trimming engine.
///
/// Every core operation returns one of these instead of logging or aborting;
/// the CLI turns them into a non-zero exit status.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrimError {
    #[error("Invalid alignment: {0}")]
    InvalidAlignment(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Overlap filtering did not converge after {passes} passes")]
    NonConvergence { passes: usize },

    #[error("Trimming removed every {0}; relax the thresholds or allow empty output")]
    EmptyResult(EmptyAxis),

    #[error("Incompatible alignment set: {0}")]
    IncompatibleSet(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Which axis of the alignment ended up empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyAxis {
    Column,
    Sequence,
}

impl std::fmt::Display for EmptyAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Column => write!(f, "column"),
            Self::Sequence => write!(f, "sequence"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TrimError::NonConvergence { passes: 25 };
        assert_eq!(
            err.to_string(),
            "Overlap filtering did not converge after 25 passes"
        );

        let err = TrimError::EmptyResult(EmptyAxis::Column);
        assert!(err.to_string().contains("every column"));
    }
}

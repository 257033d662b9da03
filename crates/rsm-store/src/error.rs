/// Errors that can occur in the backing store layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached: connection refused or dropped,
    /// pool exhausted, or a connect/wait timeout.
    ///
    /// Sessions are unusable while this persists. The adapter never
    /// retries; the caller sees this on the first failure.
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    /// The store was reachable but rejected the command
    /// (e.g. a key holding the wrong type).
    #[error("store command failed: {0}")]
    Command(String),

    /// The connection settings are unusable. Reported on first use.
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    /// Returns `true` for connectivity failures.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Errors raised while evaluating access.
///
/// A denial is not an error; it is an [`AccessDecision`](crate::AccessDecision).
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The authorization collaborator failed to answer.
    #[error("authorization directory error: {0}")]
    Directory(String),

    /// The directory configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type GateResult<T> = Result<T, GateError>;

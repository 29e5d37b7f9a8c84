use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("player key is not an integer: {0}")]
    InvalidPlayerKey(String),
    #[error("score overflow")]
    ScoreOverflow,
}

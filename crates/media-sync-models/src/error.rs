use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("rating {0} is outside the 1-10 range")]
    RatingOutOfRange(u8),

    #[error("item has an empty catalog id")]
    EmptyId,
}

pub type GlazeResult<T> = Result<T, GlazeError>;

#[derive(thiserror::Error, Debug)]
pub enum GlazeError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("surface error: {0}")]
    Surface(String),

    #[error("paint error: {0}")]
    Paint(String),

    #[error("input error: {0}")]
    Input(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GlazeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn surface(msg: impl Into<String>) -> Self {
        Self::Surface(msg.into())
    }

    pub fn paint(msg: impl Into<String>) -> Self {
        Self::Paint(msg.into())
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }
}

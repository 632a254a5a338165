use crate::store::StorageError;

/// Input the user has to fix before the operation can go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyTitle,
    PastDateTime,
    DailyQuotaReached,
    DivisionByZero,
    OutOfRange,
    ClearRequired,
    InvalidDuration,
    BlankValue,
    NotFound,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            ValidationError::EmptyTitle => "please enter a title",
            ValidationError::PastDateTime => "please select a future date and time",
            ValidationError::DailyQuotaReached => "daily limit of tasks reached",
            ValidationError::DivisionByZero => "cannot divide by zero",
            ValidationError::OutOfRange => "result is too large to display",
            ValidationError::ClearRequired => "clear the error before entering more input",
            ValidationError::InvalidDuration => "duration must be at least one minute",
            ValidationError::BlankValue => "value must not be blank",
            ValidationError::NotFound => "item not found",
        };
        f.write_str(message)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug)]
pub enum AppError {
    Storage(StorageError),
    Validation(ValidationError),
}

impl AppError {
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            AppError::Validation(err) => Some(err),
            AppError::Storage(_) => None,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Storage(err) => write!(f, "storage error: {err}"),
            AppError::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Storage(err) => Some(err),
            AppError::Validation(err) => Some(err),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(value: StorageError) -> Self {
        AppError::Storage(value)
    }
}

impl From<ValidationError> for AppError {
    fn from(value: ValidationError) -> Self {
        AppError::Validation(value)
    }
}

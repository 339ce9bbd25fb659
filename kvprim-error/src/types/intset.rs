use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки компактного множества целых чисел `IntSet`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntSetError {
    /// Значение уже есть во множестве, состояние не изменено.
    #[error("Value {value} is already a member")]
    AlreadyPresent { value: i64 },

    /// Значения нет во множестве, состояние не изменено.
    #[error("Value {value} is not a member")]
    NotFound { value: i64 },

    /// Аллокатор не смог выделить память; прежний буфер не изменён.
    #[error("Out of memory: failed to reserve {requested} bytes")]
    OutOfMemory { requested: usize },

    /// Количество элементов не помещается в 32-битное поле заголовка.
    #[error("Length overflow: {requested} elements exceeds maximum of {max}")]
    LengthOverflow { requested: usize, max: usize },

    /// Несогласованное бинарное представление.
    #[error("Invalid intset blob: {reason}")]
    InvalidBlob { reason: String },
}

impl ErrorExt for IntSetError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::AlreadyPresent { .. } => StatusCode::AlreadyExists,
            Self::NotFound { .. } => StatusCode::NotFound,
            Self::OutOfMemory { .. } => StatusCode::OutOfMemory,
            Self::LengthOverflow { .. } => StatusCode::SizeLimit,
            Self::InvalidBlob { .. } => StatusCode::CorruptedData,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            IntSetError::AlreadyPresent { value: 1 }.status_code(),
            StatusCode::AlreadyExists
        );
        assert_eq!(
            IntSetError::NotFound { value: 1 }.status_code(),
            StatusCode::NotFound
        );
        assert_eq!(
            IntSetError::LengthOverflow {
                requested: 1,
                max: 0
            }
            .status_code(),
            StatusCode::SizeLimit
        );
    }

    #[test]
    fn test_client_message_is_display() {
        let err = IntSetError::NotFound { value: -3 };
        assert_eq!(err.client_message(), "Value -3 is not a member");
    }
}

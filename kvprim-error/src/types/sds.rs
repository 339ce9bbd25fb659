use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки динамической строки `Sds`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SdsError {
    /// Аллокатор не смог выделить память; прежний буфер не изменён.
    #[error("Out of memory: failed to reserve {requested} bytes")]
    OutOfMemory { requested: usize },

    /// Длина или свободное место не помещаются в 32-битное поле заголовка.
    #[error("Length overflow: {requested} bytes exceeds maximum of {max}")]
    LengthOverflow { requested: usize, max: usize },

    /// `incr_len` вышел за пределы `[-len, free]`.
    #[error("Length increment {incr} out of range (len {len}, free {free})")]
    LengthOutOfRange { incr: isize, len: usize, free: usize },

    /// Незакрытая кавычка или кавычка, за которой сразу идёт не пробел.
    #[error("Unbalanced quotes in argument line at offset {offset}")]
    UnbalancedQuotes { offset: usize },

    /// Несогласованное бинарное представление.
    #[error("Invalid sds blob: {reason}")]
    InvalidBlob { reason: String },
}

impl ErrorExt for SdsError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::OutOfMemory { .. } => StatusCode::OutOfMemory,
            Self::LengthOverflow { .. } => StatusCode::SizeLimit,
            Self::LengthOutOfRange { .. } => StatusCode::IndexOutOfBounds,
            Self::UnbalancedQuotes { .. } => StatusCode::ParseError,
            Self::InvalidBlob { .. } => StatusCode::CorruptedData,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

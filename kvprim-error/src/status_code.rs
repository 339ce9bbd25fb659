use std::fmt;

use num_enum::TryFromPrimitive;

/// Коды статуса для категоризации ошибок примитивов.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки
/// - 2xxx: Ошибки данных (логические ошибки операций над структурами)
/// - 5xxx: Память и бинарные представления
/// - 6xxx: IO
/// - 8xxx: Разбор и кодирование
///
/// `num_enum::TryFromPrimitive` даёт `TryFrom<u32>`, что удобно, когда код
/// приходит из внешнего представления.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Unknown = 1000,
    Unexpected = 1002,
    Internal = 1003,
    InvalidArgs = 1004,

    // === 2xxx: Ошибки данных ===
    NotFound = 2000,
    AlreadyExists = 2001,
    InvalidValue = 2004,
    IndexOutOfBounds = 2006,
    InvalidData = 2009,

    // === 5xxx: Память / бинарные представления ===
    OutOfMemory = 5000,
    CorruptedData = 5002,
    SerializationFailed = 5003,
    DeserializationFailed = 5004,

    // === 6xxx: IO ===
    Io = 6000,
    UnexpectedEof = 6007,

    // === 8xxx: Разбор/кодирование ===
    InvalidUtf8 = 8004,
    SizeLimit = 8007,
    ParseError = 8009,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Пытается получить вариант `StatusCode` из `u32`.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Является ли код ошибкой со стороны вызывающего кода: неверный
    /// аргумент, отсутствующий элемент, дубликат.
    pub fn is_client_error(&self) -> bool {
        let c = self.code();
        if (2000..=2999).contains(&c) || (8000..=8999).contains(&c) {
            return true;
        }
        matches!(self, Self::InvalidArgs)
    }

    /// Требуется ли логировать как критическую ошибку.
    ///
    /// Нехватка памяти и повреждённый blob означают, что вызывающая сторона
    /// должна прервать операцию целиком.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::Internal | Self::OutOfMemory | Self::CorruptedData
        )
    }

    /// Рекомендуемый уровень логирования для данного кода.
    pub fn log_level(&self) -> LogLevel {
        if self.is_critical() {
            return LogLevel::Error;
        }
        match self {
            Self::Success => LogLevel::Trace,
            Self::NotFound | Self::AlreadyExists => LogLevel::Debug,
            Self::InvalidArgs
            | Self::InvalidValue
            | Self::InvalidData
            | Self::IndexOutOfBounds
            | Self::ParseError => LogLevel::Info,
            _ => LogLevel::Warn,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

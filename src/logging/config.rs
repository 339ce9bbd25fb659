use serde::{Deserialize, Serialize};

/// Формат вывода событий.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Настройки логирования.
///
/// `level` может быть как простым уровнем (`debug`), так и полной
/// директивой `EnvFilter` (`kvprim=trace,warn`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            with_ansi: true,
            with_target: false,
        }
    }
}

const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

impl LoggingConfig {
    /// Директива фильтра для `EnvFilter`.
    ///
    /// Простой уровень применяется к крейту и CLI, остальные цели получают
    /// `warn`. Строка с `=` или `,` используется как есть.
    pub fn build_filter_directive(&self) -> String {
        let level = self.level.trim();
        if level.contains('=') || level.contains(',') {
            return level.to_string();
        }
        let level = level.to_ascii_lowercase();
        format!("warn,kvprim={level},kvprim_cli={level}")
    }

    /// Проверяет, что простой уровень известен.
    pub fn validate(&self) -> Result<(), String> {
        let level = self.level.trim();
        if level.contains('=') || level.contains(',') {
            return Ok(());
        }
        if LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            Ok(())
        } else {
            Err(format!(
                "Invalid log level '{}'; expected one of {}",
                self.level,
                LEVELS.join(", ")
            ))
        }
    }
}

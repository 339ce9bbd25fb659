use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::logging::LoggingConfig;

/// Формат вывода результатов CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Человекочитаемый текст
    #[default]
    Text,
    /// Один JSON-объект на команду
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logging: LoggingConfig,
    pub output: OutputFormat,
}

impl Settings {
    /// Значения по умолчанию и переменные окружения `KVPRIM_*`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Слои по возрастанию приоритета: значения по умолчанию, файл (если
    /// указан, формат по расширению), переменные окружения с префиксом
    /// `KVPRIM` и разделителем `__`, например `KVPRIM_LOGGING__LEVEL=debug`.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = LoggingConfig::default();

        let mut builder = Config::builder()
            .set_default("logging.level", defaults.level)?
            .set_default("logging.format", "compact")?
            .set_default("logging.with_ansi", defaults.with_ansi)?
            .set_default("logging.with_target", defaults.with_target)?
            .set_default("output", "text")?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let cfg = builder
            .add_source(
                Environment::with_prefix("KVPRIM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        cfg.try_deserialize()
    }
}

//! CLI kvprim
//!
//! Утилита командной строки для работы с примитивами kvprim: разбор строки
//! команды на аргументы, разбиение и обрезка строк, сборка и просмотр
//! бинарных представлений `IntSet` и `Sds`.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kvprim::{
    database::sds, logging, ErrorExt, IntSet, IntSetError, LogLevel, OutputFormat, Sds, SdsError,
    Settings, StackError,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, trace, warn};

/// Основная структура CLI аргументов
#[derive(Parser)]
#[command(name = "kvprim-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "kvprim CLI - inspect dynamic strings and integer sets", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Файл настроек (TOML, JSON, YAML)
    #[arg(long, global = true, help = "Путь к файлу настроек")]
    config: Option<PathBuf>,
    /// Включить подробный вывод (debug)
    #[arg(short, long, global = true, help = "Включить подробный вывод для отладки")]
    verbose: bool,
    /// Подавить логирование
    #[arg(short = 'q', long, global = true, help = "Подавить логирование")]
    quiet: bool,
    /// Формат вывода; по умолчанию берётся из настроек
    #[arg(long, value_enum, global = true, help = "Формат вывода результата")]
    output: Option<OutputFormat>,
    /// Подкоманда для выполнения
    #[command(subcommand)]
    command: Commands,
}

/// Подкоманды CLI
#[derive(Subcommand)]
enum Commands {
    /// Разобрать строку команды на аргументы (кавычки, экранирование)
    SplitArgs {
        #[arg(help = "Строка команды, например: set \"a b\" 'c'")]
        line: String,
    },
    /// Разбить строку по точному разделителю
    Split {
        #[arg(help = "Входная строка")]
        input: String,
        #[arg(short, long, help = "Разделитель (может быть многобайтовым)")]
        sep: String,
    },
    /// Обрезать байты из набора с обоих концов
    Trim {
        #[arg(help = "Входная строка")]
        input: String,
        #[arg(short = 's', long = "set", help = "Набор обрезаемых символов")]
        cset: String,
    },
    /// Оставить диапазон [start, end] включительно
    #[command(allow_negative_numbers = true)]
    Range {
        #[arg(help = "Входная строка")]
        input: String,
        #[arg(help = "Начало (отрицательное считается от конца)")]
        start: i64,
        #[arg(help = "Конец включительно (отрицательный считается от конца)")]
        end: i64,
    },
    /// Собрать IntSet из значений и записать его blob в файл
    #[command(allow_negative_numbers = true)]
    IntsetBuild {
        #[arg(required = true, help = "Целые значения, дубликаты игнорируются")]
        values: Vec<i64>,
        #[arg(short, long, help = "Файл для записи blob")]
        out: PathBuf,
    },
    /// Прочитать blob IntSet и показать его содержимое
    IntsetDump {
        #[arg(help = "Файл с blob")]
        file: PathBuf,
    },
    /// Прочитать blob Sds и показать заголовок и содержимое
    SdsDump {
        #[arg(help = "Файл с blob")]
        file: PathBuf,
    },
    /// Версия и параметры сборки
    Info,
}

/// Точка входа в CLI
///
/// Загружает настройки, инициализирует логирование и вызывает обработчик
/// команды.
fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_from(cli.config.as_deref())
        .context("Не удалось загрузить настройки")?;
    if cli.quiet {
        settings.logging.level = "off".to_string();
    } else if cli.verbose {
        settings.logging.level = "debug".to_string();
    }
    let output = cli.output.unwrap_or(settings.output);

    logging::init_logging(&settings.logging)
        .map_err(|e| anyhow::anyhow!("Ошибка инициализации логирования: {e}"))?;
    debug!(?output, "settings loaded");

    match handle_command(&cli.command) {
        Ok(report) => report.print(output),
        Err(e) => std::process::exit(report_error(&e, output)),
    }
}

/// Логирует ошибку с уровнем по её статусу, печатает сообщение и возвращает
/// код выхода: `2` для ошибок во входных данных, `1` для остальных.
fn report_error(
    err: &anyhow::Error,
    output: OutputFormat,
) -> i32 {
    let Some(root) = root_error(err) else {
        eprintln!("Error: {err:#}");
        return 1;
    };

    let code = root.status_code();
    let kind = root.type_name();
    let details = root.log_message();
    match code.log_level() {
        LogLevel::Error => error!(%code, %kind, %details, "command failed"),
        LogLevel::Warn => warn!(%code, %kind, %details, "command failed"),
        LogLevel::Info => info!(%code, %kind, %details, "command failed"),
        LogLevel::Debug => debug!(%code, %kind, %details, "command failed"),
        LogLevel::Trace => trace!(%code, %kind, %details, "command failed"),
    }

    match output {
        OutputFormat::Text => eprintln!("Error: {err:#}"),
        OutputFormat::Json => println!(
            "{}",
            json!({ "error": root.client_message(), "code": code.code() })
        ),
    }

    exit_code(root)
}

/// Корневая ошибка библиотеки под контекстами `anyhow`, если она есть.
fn root_error(err: &anyhow::Error) -> Option<&dyn ErrorExt> {
    if let Some(stack) = err.downcast_ref::<StackError>() {
        return Some(stack.root());
    }
    if let Some(e) = err.downcast_ref::<SdsError>() {
        return Some(e as &dyn ErrorExt);
    }
    err.downcast_ref::<IntSetError>()
        .map(|e| e as &dyn ErrorExt)
}

fn exit_code(root: &dyn ErrorExt) -> i32 {
    if root.status_code().is_client_error() {
        2
    } else {
        1
    }
}

/// Результат команды в двух представлениях.
struct Report {
    lines: Vec<String>,
    json: Value,
}

impl Report {
    fn print(
        &self,
        output: OutputFormat,
    ) -> Result<()> {
        match output {
            OutputFormat::Text => {
                for line in &self.lines {
                    println!("{line}");
                }
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&self.json)?),
        }
        Ok(())
    }
}

/// Обработчик выполнения команд
fn handle_command(command: &Commands) -> Result<Report> {
    match command {
        Commands::SplitArgs { line } => {
            let args = sds::split_args(line.as_bytes()).context("Не удалось разобрать строку")?;
            list_report(&args)
        }

        Commands::Split { input, sep } => {
            let parts = sds::split_len(input.as_bytes(), sep.as_bytes());
            list_report(&parts)
        }

        Commands::Trim { input, cset } => {
            let mut s = Sds::new(input);
            s.trim(cset.as_bytes());
            sds_report(&s)
        }

        Commands::Range { input, start, end } => {
            let mut s = Sds::new(input);
            s.range(*start, *end);
            sds_report(&s)
        }

        Commands::IntsetBuild { values, out } => {
            let set = build_intset(values)?;
            let blob = set.to_blob()?;
            fs::write(out, &blob)
                .with_context(|| format!("Не удалось записать {}", out.display()))?;

            Ok(Report {
                lines: vec![format!(
                    "wrote {} bytes to {} ({:?}, {} members)",
                    blob.len(),
                    out.display(),
                    set.encoding(),
                    set.len()
                )],
                json: json!({
                    "path": out.display().to_string(),
                    "bytes": blob.len(),
                    "encoding": set.encoding().width(),
                    "length": set.len(),
                }),
            })
        }

        Commands::IntsetDump { file } => {
            let blob =
                fs::read(file).with_context(|| format!("Не удалось прочитать {}", file.display()))?;
            let set = IntSet::from_blob(&blob)
                .with_context(|| format!("Некорректный blob в {}", file.display()))?;
            let members: Vec<i64> = set.iter().collect();

            Ok(Report {
                lines: vec![
                    format!("encoding: {:?} ({} bytes)", set.encoding(), set.encoding().width()),
                    format!("length:   {}", set.len()),
                    format!("blob_len: {}", set.blob_len()),
                    format!("members:  {members:?}"),
                ],
                json: json!({
                    "encoding": set.encoding().width(),
                    "length": set.len(),
                    "blob_len": set.blob_len(),
                    "members": members,
                }),
            })
        }

        Commands::SdsDump { file } => {
            let blob =
                fs::read(file).with_context(|| format!("Не удалось прочитать {}", file.display()))?;
            let s = Sds::from_blob(&blob)
                .with_context(|| format!("Некорректный blob в {}", file.display()))?;
            let repr = repr(s.as_bytes())?;

            Ok(Report {
                lines: vec![
                    format!("len:        {}", s.len()),
                    format!("free:       {}", s.avail()),
                    format!("alloc_size: {}", s.alloc_size()),
                    format!("data:       {repr}"),
                ],
                json: json!({
                    "len": s.len(),
                    "free": s.avail(),
                    "alloc_size": s.alloc_size(),
                    "data": repr,
                }),
            })
        }

        Commands::Info => {
            let version = env!("CARGO_PKG_VERSION");
            let commit = env!("GIT_COMMIT");
            let built = env!("BUILD_TIME");

            Ok(Report {
                lines: vec![
                    format!("kvprim-cli {version}"),
                    format!("commit:     {commit}"),
                    format!("build_time: {built}"),
                ],
                json: json!({
                    "version": version,
                    "commit": commit,
                    "build_time": built,
                }),
            })
        }
    }
}

/// Собирает множество, пропуская повторы.
fn build_intset(values: &[i64]) -> Result<IntSet> {
    let mut set = IntSet::new();
    for &v in values {
        match set.add(v) {
            Ok(()) => {}
            Err(IntSetError::AlreadyPresent { value }) => {
                debug!(value, "duplicate value skipped");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(set)
}

/// Экранированное представление байт в кавычках.
fn repr(bytes: &[u8]) -> Result<String> {
    let mut out = Sds::empty();
    out.cat_repr(bytes)?;
    Ok(out.to_string())
}

fn list_report(items: &[Sds]) -> Result<Report> {
    let reprs = items
        .iter()
        .map(|s| repr(s.as_bytes()))
        .collect::<Result<Vec<_>>>()?;

    Ok(Report {
        lines: reprs
            .iter()
            .enumerate()
            .map(|(i, r)| format!("{}) {r}", i + 1))
            .collect(),
        json: json!(items.iter().map(|s| s.to_string()).collect::<Vec<_>>()),
    })
}

fn sds_report(s: &Sds) -> Result<Report> {
    let repr = repr(s.as_bytes())?;

    Ok(Report {
        lines: vec![repr.clone()],
        json: json!({
            "data": s.to_string(),
            "len": s.len(),
            "free": s.avail(),
        }),
    })
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

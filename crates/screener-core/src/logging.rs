//! tracing の初期化とパニックフック
//!
//! - `RUST_LOG`: フィルタ（未設定なら `info`）
//! - `SCREENER_LOG_DIR`: 設定時は `<dir>/<app>.log` に日次ローテーションで出力
//! - `SCREENER_LOG_FORMAT`: `compact` で1行形式
//! - `SCREENER_LOG_INCLUDE_BACKTRACE`: `1`/`true` でデフォルトのパニック出力も残す

use std::panic;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSettings {
    pub dir: Option<PathBuf>,
    pub compact: bool,
    pub include_backtrace: bool,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self {
            dir: std::env::var_os("SCREENER_LOG_DIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            compact: std::env::var("SCREENER_LOG_FORMAT")
                .map(|value| value.eq_ignore_ascii_case("compact"))
                .unwrap_or(false),
            include_backtrace: std::env::var("SCREENER_LOG_INCLUDE_BACKTRACE")
                .map(|value| is_truthy(&value))
                .unwrap_or(false),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// パニックを `tracing::error!` として記録する。プロセスで一度だけ設定される。
pub fn install_tracing_panic_hook(app_name: &'static str) {
    static INSTALLED: OnceLock<()> = OnceLock::new();

    INSTALLED.get_or_init(|| {
        let default_hook = panic::take_hook();
        let include_backtrace = LogSettings::from_env().include_backtrace;

        panic::set_hook(Box::new(move |info| {
            let thread = std::thread::current();
            let thread_name = thread.name().unwrap_or("unknown");

            let location = info
                .location()
                .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()));
            let message = info
                .payload()
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| info.payload().downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".into());

            tracing::error!(
                application = app_name,
                run_id = crate::run_id::get(),
                %thread_name,
                location = location.as_deref().unwrap_or("unknown"),
                panic_message = %message,
                "panic captured"
            );

            if include_backtrace {
                default_hook(info);
            }
        }));
    });
}

fn rotating_file_writer(app_name: &'static str, dir: PathBuf) -> Option<BoxMakeWriter> {
    if let Err(err) = std::fs::create_dir_all(&dir) {
        eprintln!(
            "failed to create log directory {}: {err}; logging to stdout",
            dir.display()
        );
        return None;
    }

    let appender = tracing_appender::rolling::daily(dir, format!("{app_name}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Some(BoxMakeWriter::new(non_blocking))
}

/// グローバル subscriber を設定する。二重初期化は無視される。
pub fn init_tracing_subscriber(app_name: &'static str) {
    let settings = LogSettings::from_env();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let writer = settings
        .dir
        .clone()
        .and_then(|dir| rotating_file_writer(app_name, dir))
        .unwrap_or_else(|| BoxMakeWriter::new(std::io::stdout));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer);
    let _ = if settings.compact {
        builder.compact().try_init()
    } else {
        builder.try_init()
    };

    tracing::info!(
        application = app_name,
        run_id = crate::run_id::get(),
        log_dir = settings.dir.as_ref().map(|d| d.display().to_string()),
        "tracing initialized"
    );
}

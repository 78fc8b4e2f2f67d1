//! ログ初期化
//!
//! stdout はツールサーバーのプロトコルと REPL 表示で使うため、
//! ログはすべて `var/logs/kai.log.YYYY-MM-DD` に書き出す（JST 基準で日次ローテーション）。

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{fmt, EnvFilter};

/// ログレベルを制御する環境変数
const LOG_ENV: &str = "KAI_LOG";
const LOG_PREFIX: &str = "kai.log";
const DEFAULT_LEVEL: &str = "debug";

/// JST (UTC+09:00) のオフセット（秒）
const JST_OFFSET_SECS: i32 = 9 * 3600;

fn now_jst() -> DateTime<FixedOffset> {
    let now = Utc::now();
    match FixedOffset::east_opt(JST_OFFSET_SECS) {
        Some(jst) => now.with_timezone(&jst),
        None => now.fixed_offset(),
    }
}

struct JstTimer;

impl FormatTime for JstTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", now_jst().format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// 日付が変わったら次のファイルへ切り替えるアペンダー
struct DailyFile {
    dir: PathBuf,
    date: NaiveDate,
    file: File,
}

impl DailyFile {
    fn open(dir: PathBuf) -> io::Result<Self> {
        let date = now_jst().date_naive();
        let file = open_for(&dir, date)?;
        Ok(Self { dir, date, file })
    }
}

fn log_file_name(date: NaiveDate) -> String {
    format!("{LOG_PREFIX}.{}", date.format("%Y-%m-%d"))
}

fn open_for(dir: &Path, date: NaiveDate) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(log_file_name(date)))
}

impl Write for DailyFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let today = now_jst().date_naive();
        if today != self.date {
            self.file = open_for(&self.dir, today)?;
            self.date = today;
        }
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// 開発時は `CARGO_MANIFEST_DIR`、それ以外はカレントディレクトリ配下の `var/logs/`。
fn log_dir() -> PathBuf {
    std::env::var("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .or_else(|_| std::env::current_dir())
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("var")
        .join("logs")
}

/// ログシステムを初期化する。
///
/// レベルは `KAI_LOG` で指定する（デフォルト: `debug`）。
/// ログファイルを用意できない場合は警告だけ出してログなしで続行する。
/// 返り値のガードは `main()` で保持し続けること。
pub fn init_logging() -> Option<WorkerGuard> {
    let dir = log_dir();

    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!(
            "kai: warning: failed to create log directory {}: {e}",
            dir.display()
        );
        return None;
    }

    let appender = match DailyFile::open(dir.clone()) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!(
                "kai: warning: failed to open log file in {}: {e}",
                dir.display()
            );
            return None;
        }
    };

    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

    let installed = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_timer(JstTimer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .try_init();

    if let Err(e) = installed {
        eprintln!("kai: warning: logging already initialized: {e}");
    }

    Some(guard)
}

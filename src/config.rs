//! 設定ファイル管理
//!
//! `~/.config/kai/config.toml` から TOML 形式の設定を読み込む。
//! ファイルが存在しない場合はテンプレートを生成し、デフォルト値を使用する。
//!
//! # 設定ファイル例
//!
//! ```toml
//! [ollama]
//! endpoint = "http://localhost:11434/api/generate"
//! model = "llama3"
//! model_file = "model.txt"
//! timeout_secs = 300
//!
//! [session]
//! namespace = "default"
//! exit_words = ["quit", "exit"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::ai::prompts::DEFAULT_MODEL;

/// モデル名を上書きする環境変数
pub const MODEL_ENV: &str = "OLLAMA_MODEL";

/// K8s AI Agent の設定全体
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct KaiConfig {
    /// Ollama バックエンド関連設定
    pub ollama: OllamaConfig,
    /// セッション関連設定
    pub session: SessionConfig,
}

/// Ollama バックエンドの設定
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// `/api/generate` エンドポイント URL
    pub endpoint: String,
    /// モデル名（環境変数・モデルファイルより優先度が低い）
    pub model: Option<String>,
    /// 1 行でモデル名を記述したファイルのパス
    pub model_file: PathBuf,
    /// リクエスト全体のタイムアウト秒数（0 で無効）
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/generate".to_string(),
            model: None,
            model_file: PathBuf::from("model.txt"),
            timeout_secs: 300,
        }
    }
}

impl OllamaConfig {
    /// タイムアウト設定。0 の場合は None（無制限）。
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// 使用するモデル名を解決する。
    ///
    /// 優先順位: `OLLAMA_MODEL` 環境変数 → モデルファイル → `[ollama] model` → 既定値。
    /// 空白のみの値は未設定とみなす。
    pub fn resolve_model(&self) -> String {
        let env_model = std::env::var(MODEL_ENV).ok();
        let file_model = std::fs::read_to_string(&self.model_file).ok();

        let (source, model) = first_non_empty([
            ("env", env_model.as_deref()),
            ("model_file", file_model.as_deref()),
            ("config", self.model.as_deref()),
        ])
        .unwrap_or(("default", DEFAULT_MODEL));

        debug!(source = source, model = %model, "Model resolved");
        model.to_string()
    }
}

/// 最初の非空（トリム後）の候補を返す。
fn first_non_empty<'a, const N: usize>(
    candidates: [(&'static str, Option<&'a str>); N],
) -> Option<(&'static str, &'a str)> {
    candidates.into_iter().find_map(|(source, value)| {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| (source, v))
    })
}

/// セッション関連の設定
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// `--namespace` 未指定時の初期名前空間
    pub namespace: Option<String>,
    /// REPL を終了するキーワード（大文字小文字を区別しない）
    pub exit_words: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            exit_words: vec!["quit".to_string(), "exit".to_string()],
        }
    }
}

impl KaiConfig {
    /// 設定ファイルを読み込む。
    ///
    /// `~/.config/kai/config.toml` が存在すればパースし、
    /// 存在しなければテンプレートを生成してデフォルト値を返す。
    /// パースエラーの場合は警告を表示してデフォルト値を返す。
    pub fn load() -> Self {
        let path = Self::config_path();
        debug!(path = %path.display(), "Loading config file");

        if !path.exists() {
            Self::create_default_config(&path);
            return Self::default();
        }

        Self::load_from(&path)
    }

    /// 指定パスから設定を読み込む。失敗時は警告してデフォルト値を返す。
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<KaiConfig>(&content) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        endpoint = %config.ollama.endpoint,
                        timeout_secs = config.ollama.timeout_secs,
                        exit_words = ?config.session.exit_words,
                        "Config loaded successfully"
                    );
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse config file");
                    eprintln!("kai: warning: failed to parse config file: {e}");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config file");
                eprintln!("kai: warning: failed to read config file: {e}");
                Self::default()
            }
        }
    }

    /// 設定ファイルのパスを返す。
    ///
    /// `$HOME` が取得できない場合は `./.config/kai/config.toml` にフォールバックする。
    pub fn config_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".config/kai/config.toml")
    }

    /// 設定ファイルが存在しない場合にテンプレートから生成する。
    ///
    /// 生成に失敗した場合は警告を表示するが、起動は継続する。
    fn create_default_config(path: &Path) {
        const TEMPLATE: &str = r#"# kai configuration

[ollama]
# endpoint = "http://localhost:11434/api/generate"
# model = "deepseek-r1"
# model_file = "model.txt"
# timeout_secs = 300

[session]
# namespace = "default"
# exit_words = ["quit", "exit"]
"#;

        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "Failed to create config directory");
                eprintln!("kai: warning: failed to create config directory: {e}");
                return;
            }
        }

        match std::fs::write(path, TEMPLATE) {
            Ok(()) => {
                info!(path = %path.display(), "Created default config file");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to create default config file");
                eprintln!("kai: warning: failed to create config file: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn load_from_str(content: &str) -> KaiConfig {
        toml::from_str(content).unwrap()
    }

    /// テスト中に OLLAMA_MODEL を退避・復元するヘルパー
    struct EnvGuard {
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(value: Option<&str>) -> Self {
            let original = std::env::var(MODEL_ENV).ok();
            match value {
                Some(v) => std::env::set_var(MODEL_ENV, v),
                None => std::env::remove_var(MODEL_ENV),
            }
            Self { original }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match self.original {
                Some(ref v) => std::env::set_var(MODEL_ENV, v),
                None => std::env::remove_var(MODEL_ENV),
            }
        }
    }

    fn ollama_with_file(dir: &Path, file_content: Option<&str>, model: Option<&str>) -> OllamaConfig {
        let model_file = dir.join("model.txt");
        if let Some(content) = file_content {
            std::fs::write(&model_file, content).unwrap();
        }
        OllamaConfig {
            model: model.map(str::to_string),
            model_file,
            ..OllamaConfig::default()
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = KaiConfig::default();
        assert_eq!(config.ollama.endpoint, "http://localhost:11434/api/generate");
        assert!(config.ollama.model.is_none());
        assert_eq!(config.ollama.model_file, PathBuf::from("model.txt"));
        assert_eq!(config.ollama.timeout(), Some(Duration::from_secs(300)));
        assert!(config.session.namespace.is_none());
        assert_eq!(config.session.exit_words, vec!["quit", "exit"]);
    }

    #[test]
    fn parse_full_config() {
        let config = load_from_str(
            r#"
[ollama]
endpoint = "http://gpu-box:11434/api/generate"
model = "llama3"
model_file = "/etc/kai/model.txt"
timeout_secs = 0

[session]
namespace = "prod"
exit_words = ["bye"]
"#,
        );
        assert_eq!(config.ollama.endpoint, "http://gpu-box:11434/api/generate");
        assert_eq!(config.ollama.model.as_deref(), Some("llama3"));
        assert_eq!(config.ollama.model_file, PathBuf::from("/etc/kai/model.txt"));
        assert!(config.ollama.timeout().is_none());
        assert_eq!(config.session.namespace.as_deref(), Some("prod"));
        assert_eq!(config.session.exit_words, vec!["bye"]);
    }

    #[test]
    fn parse_partial_config_uses_defaults() {
        let config = load_from_str("[session]\nnamespace = \"dev\"\n");
        assert_eq!(config.ollama.endpoint, "http://localhost:11434/api/generate");
        assert_eq!(config.session.namespace.as_deref(), Some("dev"));
        assert_eq!(config.session.exit_words, vec!["quit", "exit"]);
    }

    #[test]
    fn load_from_invalid_file_returns_default() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[ollama\nendpoint = ").unwrap();
        let config = KaiConfig::load_from(&path);
        assert_eq!(config.ollama.endpoint, OllamaConfig::default().endpoint);
    }

    #[test]
    fn create_default_config_creates_parseable_template() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("sub/dir/config.toml");
        KaiConfig::create_default_config(&path);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[ollama]"));
        assert!(content.contains("[session]"));
        let config: KaiConfig = toml::from_str(&content).unwrap();
        assert!(config.ollama.model.is_none());
    }

    #[test]
    #[serial]
    fn env_model_wins() {
        let _env = EnvGuard::set(Some("mistral"));
        let tmp = tempfile::TempDir::new().unwrap();
        let ollama = ollama_with_file(tmp.path(), Some("phi3\n"), Some("llama3"));
        assert_eq!(ollama.resolve_model(), "mistral");
    }

    #[test]
    #[serial]
    fn model_file_is_trimmed_and_beats_config() {
        let _env = EnvGuard::set(None);
        let tmp = tempfile::TempDir::new().unwrap();
        let ollama = ollama_with_file(tmp.path(), Some("  phi3 \n"), Some("llama3"));
        assert_eq!(ollama.resolve_model(), "phi3");
    }

    #[test]
    #[serial]
    fn blank_sources_fall_through_to_config() {
        let _env = EnvGuard::set(Some(""));
        let tmp = tempfile::TempDir::new().unwrap();
        let ollama = ollama_with_file(tmp.path(), Some("   \n"), Some("llama3"));
        assert_eq!(ollama.resolve_model(), "llama3");
    }

    #[test]
    #[serial]
    fn missing_everything_uses_default_model() {
        let _env = EnvGuard::set(None);
        let tmp = tempfile::TempDir::new().unwrap();
        let ollama = ollama_with_file(tmp.path(), None, None);
        assert_eq!(ollama.resolve_model(), DEFAULT_MODEL);
    }
}

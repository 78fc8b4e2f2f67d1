pub mod exec;

pub use exec::run_command;

/// コマンド実行の結果を格納する構造体。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// stdout と stderr を到着順にまとめた出力
    pub output: String,
    /// 終了コード (0 = 成功)
    pub exit_code: i32,
    /// 起動失敗・異常終了時のエラー内容
    pub error: Option<String>,
}

impl CommandResult {
    /// 成功結果を返すヘルパー
    pub fn success(output: String) -> Self {
        Self {
            output,
            exit_code: 0,
            error: None,
        }
    }

    /// エラー結果を返すヘルパー
    pub fn error(output: String, exit_code: i32, error: String) -> Self {
        Self {
            output,
            exit_code,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

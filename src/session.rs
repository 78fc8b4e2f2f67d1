//! セッション状態: 現在の Kubernetes 名前空間
//!
//! セッション開始時に生成され、REPL ループだけが書き換える。永続化はしない。

use tracing::{debug, info};

/// 長形式の名前空間フラグ
const LONG_FLAG: &str = "--namespace";
/// 短形式の名前空間フラグ（直後に空白が必要）
const SHORT_FLAG: &str = "-n ";

/// 1 セッション分の状態
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    namespace: Option<String>,
}

impl SessionState {
    /// 初期名前空間を指定して生成する。空文字列は未設定として扱う。
    pub fn new(namespace: Option<String>) -> Self {
        Self {
            namespace: namespace.filter(|ns| !ns.trim().is_empty()),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// 名前空間を直接上書きする（`:namespace <ns>` 指示）。空の値は無視する。
    ///
    /// 戻り値: 更新した場合 `true`
    pub fn set_namespace(&mut self, namespace: &str) -> bool {
        let namespace = namespace.trim();
        if namespace.is_empty() {
            return false;
        }
        info!(namespace = %namespace, "Namespace set by directive");
        self.namespace = Some(namespace.to_string());
        true
    }

    /// 返ってきたコマンドから名前空間フラグを検出し、見つかれば上書きする。
    ///
    /// 最後に見たコマンドが常に勝つ。値の妥当性は検証しない。
    pub fn update_from_command(&mut self, command: &str) -> Option<String> {
        let namespace = extract_namespace(command)?.to_string();
        debug!(
            command = %command,
            previous = ?self.namespace,
            namespace = %namespace,
            "Namespace detected in command"
        );
        self.namespace = Some(namespace.clone());
        Some(namespace)
    }
}

/// コマンド文字列から名前空間の値を取り出す。
///
/// `--namespace <ns>` / `--namespace=<ns>` を優先し、なければ `-n <ns>` を探す。
/// フラグの直後に値がない場合は None。
pub fn extract_namespace(command: &str) -> Option<&str> {
    if let Some((_, rest)) = command.split_once(LONG_FLAG) {
        let rest = rest.strip_prefix('=').unwrap_or(rest);
        if let Some(value) = first_token(rest) {
            return Some(value);
        }
    }

    short_flag_remainder(command).and_then(first_token)
}

/// `-n ` が独立したトークンとして現れる位置の後ろを返す。
fn short_flag_remainder(command: &str) -> Option<&str> {
    if let Some(rest) = command.strip_prefix(SHORT_FLAG) {
        return Some(rest);
    }
    command
        .match_indices(SHORT_FLAG)
        .find(|(idx, _)| {
            command[..*idx]
                .chars()
                .next_back()
                .is_some_and(char::is_whitespace)
        })
        .map(|(idx, flag)| &command[idx + flag.len()..])
}

/// 空白区切りの最初のトークン。囲みクォートは外す。
/// `-` で始まるトークンは次のフラグなので値とみなさない。
fn first_token(rest: &str) -> Option<&str> {
    let token = rest.split_whitespace().next()?;
    let unquoted = token.trim_matches(|c| c == '"' || c == '\'');
    (!unquoted.is_empty() && !unquoted.starts_with('-')).then_some(unquoted)
}

//! 提案コマンドの実行
//!
//! シェルは介さず、クォートを考慮してトークン分割したコマンドを直接起動する。
//! stdout と stderr は 1 本の os_pipe に束ね、到着順のまま出力を取得する。

use std::io::{self, Read};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use super::CommandResult;

/// コマンド文字列を実行し、結合出力と終了コードを返す。
///
/// ブロッキング関数。非同期コンテキストからは `spawn_blocking` で呼ぶこと。
pub fn run_command(input: &str) -> CommandResult {
    let tokens = match shell_words::split(input.trim()) {
        Ok(tokens) => tokens,
        Err(e) => {
            let msg = format!("parse error: {e}");
            warn!(command = %input, error = %e, "Failed to split command");
            return CommandResult::error(String::new(), 1, msg);
        }
    };

    let Some((cmd, args)) = tokens.split_first() else {
        return CommandResult::error(String::new(), 1, "empty command".to_string());
    };

    debug!(command = %cmd, args = ?args, "Spawning external command");

    match spawn_with_combined_output(cmd, args) {
        Ok((output, exit_code)) => {
            debug!(
                command = %cmd,
                exit_code = exit_code,
                output_size = output.len(),
                "External command completed"
            );
            if exit_code == 0 {
                CommandResult::success(output)
            } else {
                CommandResult::error(output, exit_code, format!("exit status {exit_code}"))
            }
        }
        Err(e) => {
            let reason = match e.kind() {
                io::ErrorKind::NotFound => "command not found".to_string(),
                io::ErrorKind::PermissionDenied => "permission denied".to_string(),
                _ => e.to_string(),
            };
            warn!(command = %cmd, error = %e, "Failed to spawn command");
            CommandResult::error(String::new(), 127, format!("{cmd}: {reason}"))
        }
    }
}

/// 子プロセスを起動し、stdout/stderr を同じパイプで読み切る。
fn spawn_with_combined_output(cmd: &str, args: &[String]) -> io::Result<(String, i32)> {
    let (mut reader, writer) = os_pipe::pipe()?;
    let writer_clone = writer.try_clone()?;

    // spawn 後に command をドロップし、親側の書き込み端を閉じて EOF を受け取れるようにする
    let mut child = {
        let mut command = Command::new(cmd);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(writer_clone);
        command.spawn()?
    };

    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let status = child.wait()?;
    let output = String::from_utf8_lossy(&bytes).to_string();
    Ok((output, status.code().unwrap_or(1)))
}

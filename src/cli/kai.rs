use std::io::{self, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use super::color::{cyan, green, red, white, yellow};
use crate::ai::{ResponseKind, StructuredResponse};
use crate::engine::CommandResult;
use crate::error::KaiError;

/// kai が発話するときに使う共通関数。
/// 先頭に ⎈ を付与し、白色テキストで表示する。
pub fn kai_talk(message: &str) {
    println!("⎈ {}", white(message));
}

/// モデル応答待ちのスピナーを生成・開始する。
pub fn kai_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("⎈ {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("asking the model...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// 分類済み応答を種類に応じて表示する。
pub fn render_response(response: &StructuredResponse) {
    match response.kind {
        ResponseKind::Command => print_command(&response.command),
        ResponseKind::Explanation => print_explanation(&response.content),
        ResponseKind::Full => {
            if response.has_command() {
                print_command(&response.command);
            }
            if response.has_content() {
                print_explanation(&response.content);
            }
        }
        ResponseKind::Unknown(ref other) => {
            println!("\n{}", cyan(&format!("Unexpected response type: {other}")));
        }
    }
}

fn print_command(command: &str) {
    println!("\n{}\n{command}", green("Command:"));
}

fn print_explanation(content: &str) {
    println!("\n{}\n{content}", yellow("Explanation:"));
}

/// ターン内のエラーを表示する。セッションは継続する。
pub fn print_error(error: &KaiError) {
    match error {
        KaiError::MalformedResponse { raw, source } => {
            println!("\n{}", red(&format!("Error parsing response: {source}")));
            println!("Raw response: {raw}");
        }
        KaiError::InferenceFailure(e) => println!("{}", red(&format!("AI error: {e}"))),
        other => println!("{}", red(&format!("Error: {other}"))),
    }
}

/// 応答中のコマンドから名前空間を検出したときの通知
pub fn notice_namespace_detected(namespace: &str) {
    println!("{}", cyan(&format!("[Context] Namespace updated to: {namespace}")));
}

/// `:namespace` 指示で名前空間を設定したときの通知
pub fn notice_namespace_set(namespace: &str) {
    println!("{}", green(&format!("Namespace set to '{namespace}'")));
}

/// `:namespace` に値がなかったときに現在の名前空間を表示する。
pub fn notice_current_namespace(namespace: Option<&str>) {
    match namespace {
        Some(ns) => kai_talk(&format!("Current namespace: {ns}")),
        None => kai_talk("No namespace set. Usage: :namespace <name>"),
    }
}

/// コマンド実行確認の問いかけ（改行なし）
pub fn confirm_question() -> String {
    format!("{} ", white("Run this command? [y/N]:"))
}

/// 実行結果を表示する。出力は成否にかかわらず表示する。
pub fn print_command_result(result: &CommandResult) {
    if !result.output.is_empty() {
        print!("{}", result.output);
        if !result.output.ends_with('\n') {
            println!();
        }
    }
    if let Some(ref error) = result.error {
        println!("{}", red(&format!("Command error: {error}")));
    }
    let _ = io::stdout().flush();
}

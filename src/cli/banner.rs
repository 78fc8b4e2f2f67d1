use super::color::{bold_cyan, white, yellow};
use super::kai::kai_talk;

/// REPL 起動時の Welcome バナーを表示する。
///
/// `confirm_execution` が true の場合は実行確認モードである旨を添える。
pub fn print_welcome<S: AsRef<str>>(confirm_execution: bool, exit_words: &[S]) {
    let version = env!("CARGO_PKG_VERSION");

    println!();
    println!(
        "{}  ::  {} {}",
        bold_cyan("K8s AI Agent (kai)"),
        white("natural language to kubectl"),
        yellow(&format!("v{version}"))
    );
    if confirm_execution {
        kai_talk("Suggested commands run only after you confirm with 'y'.");
    }
    kai_talk(&usage_line(exit_words));
    println!();
}

/// REPL 終了時のメッセージを表示する。
pub fn print_goodbye() {
    kai_talk("Exiting.");
}

/// 使い方の案内。終了キーワードは設定の先頭のものを示す。
fn usage_line<S: AsRef<str>>(exit_words: &[S]) -> String {
    let exit_hint = match exit_words.first() {
        Some(word) => format!("type '{}' to exit", word.as_ref()),
        None => "press Ctrl-D to exit".to_string(),
    };
    format!("Enter your prompts ({exit_hint}, ':namespace <ns>' to change namespace).")
}

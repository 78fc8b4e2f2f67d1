//! Shell モジュール: REPL ループとセッション状態管理
//!
//! `Shell` 構造体にバックエンド・行入力・セッション状態を集約し、
//! 1 ターンを「入力 → プロンプト合成 → 問い合わせ → 名前空間更新 → 表示 → (確認・実行)」
//! の順に最後まで処理してから次の入力を読む。

pub mod backend;
pub mod editor;
pub mod input;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::ai::{compose, StructuredResponse};
use crate::cli::banner::{print_goodbye, print_welcome};
use crate::cli::kai::{
    confirm_question, kai_spinner, notice_current_namespace, notice_namespace_detected,
    notice_namespace_set, print_command_result, print_error, render_response,
};
use crate::engine::{run_command, CommandResult};
use crate::error::KaiError;
use crate::session::SessionState;

use backend::Backend;
use editor::{InputEvent, LineReader};
use input::{parse_input, UserInput};

/// 確認済みコマンドを実行する関数（ブロッキング）
pub type CommandRunner = fn(&str) -> CommandResult;

/// REPL の動作オプション
#[derive(Debug, Clone)]
pub struct ShellOptions {
    /// 提案コマンドを確認の上で実行するかどうか（`--cli` モード）
    pub confirm_execution: bool,
    /// 終了キーワード
    pub exit_words: Vec<String>,
}

/// 対話セッション
pub struct Shell<B, R> {
    backend: B,
    reader: R,
    session: SessionState,
    options: ShellOptions,
    runner: CommandRunner,
}

impl<B: Backend, R: LineReader> Shell<B, R> {
    pub fn new(backend: B, reader: R, session: SessionState, options: ShellOptions) -> Self {
        Self {
            backend,
            reader,
            session,
            options,
            runner: run_command,
        }
    }

    /// コマンド実行関数を差し替える。
    pub fn with_runner(mut self, runner: CommandRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// REPL ループを実行する。
    ///
    /// 終了キーワードまたは Ctrl-D で正常終了する。
    /// 入力ストリーム自体の失敗だけはエラーとして呼び出し元に返す。
    pub async fn run(&mut self) -> Result<()> {
        print_welcome(self.options.confirm_execution, &self.options.exit_words);

        loop {
            match self.reader.read_input(self.session.namespace()) {
                Ok(InputEvent::Line(line)) => {
                    if !self.handle_input(&line).await {
                        break;
                    }
                }
                Ok(InputEvent::Interrupt) => {
                    println!();
                }
                Ok(InputEvent::Eof) => {
                    info!("EOF received, exiting");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Input error, exiting");
                    return Err(anyhow::anyhow!(e).context("Failed to read input"));
                }
            }
        }

        print_goodbye();
        Ok(())
    }

    /// 1 行の入力を処理する。
    ///
    /// 戻り値: `true` = ループ続行、`false` = 終了
    pub async fn handle_input(&mut self, line: &str) -> bool {
        match parse_input(line, &self.options.exit_words) {
            UserInput::Empty => true,
            UserInput::Exit => {
                info!("Exit keyword received");
                false
            }
            UserInput::Namespace(Some(namespace)) => {
                if self.session.set_namespace(namespace) {
                    notice_namespace_set(namespace);
                }
                true
            }
            UserInput::Namespace(None) => {
                notice_current_namespace(self.session.namespace());
                true
            }
            UserInput::Prompt(text) => {
                self.run_turn(text).await;
                true
            }
        }
    }

    /// モデルへの 1 ターン。エラーは表示してターンを打ち切る（状態は変更しない）。
    async fn run_turn(&mut self, text: &str) {
        info!("==== TURN START ====");
        debug!(input = %text, namespace = ?self.session.namespace(), "User input received");

        let prompt = compose(text, self.session.namespace());
        debug!(prompt_length = prompt.len(), "Prompt composed");

        let spinner = kai_spinner();
        let result = self.backend.ask(&prompt).await;
        spinner.finish_and_clear();

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, input = %text, "Turn aborted");
                print_error(&e);
                return;
            }
        };

        info!(
            kind = %response.kind,
            has_command = response.has_command(),
            has_content = response.has_content(),
            "Response received"
        );

        self.apply_response(&response);
        render_response(&response);

        if self.options.confirm_execution && response.has_command() {
            self.confirm_and_execute(&response.command).await;
        }

        info!("==== TURN END ====");
    }

    /// 応答のコマンドに名前空間フラグがあればセッション状態を更新する。
    fn apply_response(&mut self, response: &StructuredResponse) {
        if !response.has_command() {
            return;
        }
        if let Some(namespace) = self.session.update_from_command(&response.command) {
            notice_namespace_detected(&namespace);
        }
    }

    /// 実行確認を行い、`y` の場合のみコマンドを実行する。
    ///
    /// 実行失敗は表示するだけでループは継続する。
    async fn confirm_and_execute(&mut self, command: &str) {
        let answer = match self.reader.read_confirmation(&confirm_question()) {
            Ok(Some(answer)) => answer,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Failed to read confirmation");
                return;
            }
        };

        if answer.trim().to_lowercase() != "y" {
            debug!(command = %command, "Execution declined");
            return;
        }

        info!(command = %command, "Executing confirmed command");
        let runner = self.runner;
        let owned = command.to_string();
        let result = match tokio::task::spawn_blocking(move || runner(&owned)).await {
            Ok(result) => result,
            Err(e) => {
                print_error(&KaiError::ExecutionFailure(e.to_string()));
                return;
            }
        };

        info!(
            command = %command,
            exit_code = result.exit_code,
            success = result.is_success(),
            output_size = result.output.len(),
            "Command finished"
        );
        print_command_result(&result);
    }
}

mod ai;
mod cli;
mod config;
mod engine;
mod error;
mod logging;
mod server;
mod session;
mod shell;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use ai::OllamaClient;
use config::KaiConfig;
use session::SessionState;
use shell::backend::{DirectBackend, RemoteBackend};
use shell::editor::ReedlineReader;
use shell::{Shell, ShellOptions};

/// kai: 自然言語から kubectl コマンドを提案する対話アシスタント
#[derive(Parser, Debug)]
#[command(name = "kai", version, about = "Natural language to kubectl assistant")]
struct Cli {
    /// ツールサーバーを介さず Ollama を直接呼び、提案コマンドを確認の上で実行する
    #[arg(long, conflicts_with = "serve")]
    cli: bool,

    /// stdio 上でツールサーバーとして動作する
    #[arg(long)]
    serve: bool,

    /// 初期の名前空間
    #[arg(short = 'n', long)]
    namespace: Option<String>,

    /// クライアントモードで起動するツールサーバーの実行ファイル（デフォルト: 自分自身）
    #[arg(long, value_name = "PATH", conflicts_with_all = ["cli", "serve"])]
    server_cmd: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // .env ファイルから環境変数を読み込む
    dotenvy::dotenv().ok();

    // _guard は main 終了まで保持する
    let _guard = logging::init_logging();
    info!(cli = args.cli, serve = args.serve, "kai started");

    let config = KaiConfig::load();

    if args.serve {
        return server::run(OllamaClient::new(&config.ollama)?).await;
    }

    let session = SessionState::new(args.namespace.or(config.session.namespace.clone()));
    let options = ShellOptions {
        confirm_execution: args.cli,
        exit_words: config.session.exit_words.clone(),
    };

    let result = if args.cli {
        let client = OllamaClient::new(&config.ollama)?;
        Shell::new(DirectBackend::new(client), ReedlineReader::new(), session, options)
            .run()
            .await
    } else {
        let backend = match RemoteBackend::connect(args.server_cmd).await {
            Ok(backend) => backend,
            Err(e) => {
                warn!(error = %e, "Failed to connect to tool server");
                eprintln!("kai: error: {e:#}");
                return Err(e);
            }
        };
        Shell::new(backend, ReedlineReader::new(), session, options)
            .run()
            .await
    };

    info!("kai shutting down");
    result
}

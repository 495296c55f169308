mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mfastack")]
#[command(about = "MFA付きユーザーディレクトリを宣言し、CloudFormationテンプレートに変換する", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// テンプレートを生成
    Synth {
        /// ステージ名 (local, dev, stg, prod)
        stage: Option<String>,
        /// ステージ名 (-s/--stage フラグ、MFASTACK_STAGE 環境変数)
        #[arg(
            short = 's',
            long = "stage",
            env = "MFASTACK_STAGE",
            conflicts_with = "stage",
            hide = true
        )]
        stage_flag: Option<String>,
        /// プロジェクトの代わりにビルトインプリセットを使う (directory, client, full)
        #[arg(long)]
        preset: Option<String>,
        /// 出力形式 (json, yaml)
        #[arg(short, long)]
        format: Option<String>,
        /// 出力先ファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// 設定を検証
    Validate {
        /// ステージ名 (local, dev, stg, prod)
        stage: Option<String>,
        /// ステージ名 (-s/--stage フラグ、MFASTACK_STAGE 環境変数)
        #[arg(
            short = 's',
            long = "stage",
            env = "MFASTACK_STAGE",
            conflicts_with = "stage",
            hide = true
        )]
        stage_flag: Option<String>,
        /// プロジェクトの代わりにビルトインプリセットを使う
        #[arg(long)]
        preset: Option<String>,
    },
    /// 生成済みテンプレートとの差分を表示
    Diff {
        /// 比較元のテンプレート (JSON / YAML)
        template: PathBuf,
        /// ステージ名 (local, dev, stg, prod)
        stage: Option<String>,
        /// ステージ名 (-s/--stage フラグ、MFASTACK_STAGE 環境変数)
        #[arg(
            short = 's',
            long = "stage",
            env = "MFASTACK_STAGE",
            conflicts_with = "stage",
            hide = true
        )]
        stage_flag: Option<String>,
        /// プロジェクトの代わりにビルトインプリセットを使う
        #[arg(long)]
        preset: Option<String>,
    },
    /// リソースの作成順序を表示
    Graph {
        /// ステージ名 (local, dev, stg, prod)
        stage: Option<String>,
        /// ステージ名 (-s/--stage フラグ、MFASTACK_STAGE 環境変数)
        #[arg(
            short = 's',
            long = "stage",
            env = "MFASTACK_STAGE",
            conflicts_with = "stage",
            hide = true
        )]
        stage_flag: Option<String>,
        /// プロジェクトの代わりにビルトインプリセットを使う
        #[arg(long)]
        preset: Option<String>,
    },
    /// プリセットから stack.kdl を作成
    Init {
        /// プリセット (directory, client, full)
        #[arg(long, default_value = "full")]
        variant: String,
        /// 既存の stack.kdl を上書き
        #[arg(long)]
        force: bool,
    },
    /// バージョン情報を表示
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 標準出力はテンプレート用なので、ログはstderrへ
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Version => {
            println!("mfastack {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Init { variant, force } => commands::init::handle(&variant, force),
        Commands::Synth {
            stage,
            stage_flag,
            preset,
            format,
            output,
        } => {
            let source = commands::Source::new(stage.or(stage_flag), preset);
            commands::synth::handle(&source, format.as_deref(), output.as_deref())
        }
        Commands::Validate {
            stage,
            stage_flag,
            preset,
        } => commands::validate::handle(&commands::Source::new(stage.or(stage_flag), preset)),
        Commands::Diff {
            template,
            stage,
            stage_flag,
            preset,
        } => {
            let source = commands::Source::new(stage.or(stage_flag), preset);
            commands::diff::handle(&source, &template)
        }
        Commands::Graph {
            stage,
            stage_flag,
            preset,
        } => commands::graph::handle(&commands::Source::new(stage.or(stage_flag), preset)),
    }
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "answer-review")]
#[command(about = "LLM回答レビューツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// スプレッドシート（.xlsx/.csv）を取り込んで新しいプロジェクトを開始
    Import {
        /// 入力ファイル
        #[arg(required = true)]
        file: PathBuf,

        /// プロジェクト名（省略時はファイル名）
        #[arg(short, long)]
        name: Option<String>,
    },

    /// 対話的に評価
    Review {
        /// 回答間の共通単語を強調表示
        #[arg(long)]
        highlight: bool,
    },

    /// 進捗を表示
    Status,

    /// 評価結果をExcelに出力
    Export {
        /// 出力ディレクトリ（省略時はカレント）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// プロジェクトを破棄
    Reset,

    /// 設定を表示/編集
    Config {
        /// レビュアー名でサインイン
        #[arg(long)]
        sign_in: Option<String>,

        /// サインアウト
        #[arg(long)]
        sign_out: bool,

        /// 強調表示の既定値 (on/off)
        #[arg(long)]
        highlight: Option<Toggle>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn is_on(self) -> bool {
        self == Toggle::On
    }
}

impl std::str::FromStr for Toggle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "on" | "true" | "yes" => Ok(Toggle::On),
            "off" | "false" | "no" => Ok(Toggle::Off),
            _ => Err(format!("Unknown value: {}. Use on or off", s)),
        }
    }
}

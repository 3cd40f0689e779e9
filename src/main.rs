use answer_review::{cli, error, import, review, session, summary};
use answer_review_common::workflow::WorkflowOptions;
use answer_review_common::{Config, IdentityProvider, Notice};
use clap::Parser;
use cli::{Cli, Commands};
use error::{ReviewError, Result};
use review::ReviewOutcome;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!("answer-review v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load()?;

    match cli.command {
        Commands::Import { file, name } => {
            println!("📥 answer-review - 取り込み\n");
            session::require_reviewer(&config)?;
            let mut store = session::open_store(&config)?;

            println!("[1/2] ファイルを読み込み中...");
            match import::import_into(&mut store, &file, name.as_deref()).await {
                Ok(notice) => session::print_notice(&notice),
                Err(ReviewError::Common(e)) => {
                    session::print_notice(&Notice::upload_failed(&e));
                    return Err(ReviewError::Common(e));
                }
                Err(e) => return Err(e),
            }

            println!("\n[2/2] 保存先: {}", config.state_path()?.display());
            println!("\n✅ 取り込み完了。`answer-review review` で評価を開始できます");
        }

        Commands::Review { highlight } => {
            println!("📝 answer-review - 評価\n");
            let reviewer = session::require_reviewer(&config)?;
            println!("レビュアー: {}\n", reviewer);

            let mut store = session::open_store(&config)?;
            let options = WorkflowOptions {
                highlight: highlight || config.highlight_matches,
            };

            match review::run_review(&mut store, options)? {
                ReviewOutcome::Results => {
                    if let Some(project) = store.project() {
                        println!();
                        summary::print_summary(project);
                        println!("\n`answer-review export` でExcelに出力できます");
                    }
                }
                ReviewOutcome::Quit => println!("✔ 保存して終了しました"),
                ReviewOutcome::NoProject => return Err(ReviewError::NoProject),
            }
        }

        Commands::Status => {
            session::require_reviewer(&config)?;
            let store = session::open_store(&config)?;
            let project = store.project().ok_or(ReviewError::NoProject)?;
            summary::print_summary(project);
        }

        Commands::Export { output } => {
            println!("📄 answer-review - エクスポート\n");
            session::require_reviewer(&config)?;
            let store = session::open_store(&config)?;

            let path = summary::export_project(&store, output.as_deref())?;
            println!("✔ 出力しました: {}", path.display());
        }

        Commands::Reset => {
            session::require_reviewer(&config)?;
            let mut store = session::open_store(&config)?;
            store.reset_project()?;
            println!("✔ プロジェクトを破棄しました");
        }

        Commands::Config { sign_in, sign_out, highlight, show } => {
            let mut changed = false;

            if let Some(name) = sign_in {
                config.sign_in(&name)?;
                changed = true;
                println!("✔ サインインしました: {}", name.trim());
            }

            if sign_out {
                config.sign_out();
                changed = true;
                println!("✔ サインアウトしました");
            }

            if let Some(toggle) = highlight {
                config.highlight_matches = toggle.is_on();
                changed = true;
                println!("✔ 強調表示の既定値: {}", if toggle.is_on() { "on" } else { "off" });
            }

            if changed {
                config.save()?;
            }

            if show || !changed {
                println!("設定:");
                println!("  レビュアー: {}", config.display_name().unwrap_or("未サインイン"));
                println!("  強調表示: {}", if config.highlight_matches { "on" } else { "off" });
                println!("  保存先: {}", config.state_path()?.display());
                println!("  設定ファイル: {}", Config::config_path()?.display());
            }
        }
    }

    Ok(())
}

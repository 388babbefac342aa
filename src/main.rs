use chrono::Local;
use clap::Parser;
use pillar_ledger::args::{Args, Command};
use pillar_ledger::{commands, Config, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with {} error: {e}", e.kind());
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().pillar_home().path();

    let _: () = match args.command() {
        Command::Init => commands::init(home).await?.print(),

        Command::Create(create_args) => {
            let config = Config::load(home).await?;
            commands::create(&config, create_args.new_entry())
                .await?
                .print()
        }

        Command::Settle(settle_args) => {
            let config = Config::load(home).await?;
            commands::settle(&config, settle_args.id(), settle_args.request())
                .await?
                .print()
        }

        Command::Reverse(id_args) => {
            let config = Config::load(home).await?;
            commands::reverse(&config, id_args.id()).await?.print()
        }

        Command::Delete(id_args) => {
            let config = Config::load(home).await?;
            commands::delete(&config, id_args.id()).await?.print()
        }

        Command::Edit(edit_args) => {
            let config = Config::load(home).await?;
            commands::edit(&config, edit_args.id(), edit_args.changes())
                .await?
                .print()
        }

        Command::List(filter_args) => {
            let config = Config::load(home).await?;
            commands::list(&config, filter_args.filter()).await?.print()
        }

        Command::Summary(filter_args) => {
            let config = Config::load(home).await?;
            commands::summary(&config, filter_args.filter())
                .await?
                .print()
        }

        Command::Digest(digest_args) => {
            let config = Config::load(home).await?;
            let as_of = digest_args
                .as_of()
                .unwrap_or_else(|| Local::now().date_naive());
            commands::digest(&config, as_of).await?.print()
        }

        Command::Report(report_args) => {
            let config = Config::load(home).await?;
            commands::report(
                &config,
                report_args.filter(),
                report_args.output().map(|p| p.to_path_buf()),
            )
            .await?
            .print()
        }

        Command::Suggestions => {
            let config = Config::load(home).await?;
            commands::suggestions(&config).await?.print()
        }

        Command::Serve(serve_args) => {
            let config = Config::load(home).await?;
            let bind = serve_args.bind().map(str::to_string);
            commands::serve(config, bind).await?.print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this program only.
            EnvFilter::new(format!(
                "pillar_ledger={level},{}={level},tower_http={level}",
                env!("CARGO_BIN_NAME"),
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// src/main.rs

use vroomify::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("vroomify error: {err:?}");
            std::process::exit(1);
        }
    }
}

/// Returns false when `--once` finished with a failed run.
async fn run_main() -> anyhow::Result<bool> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    let once = args.once;

    let report = run(args).await?;
    let failed = report
        .last_outcome
        .as_ref()
        .is_some_and(|outcome| !outcome.is_success());
    Ok(!(once && failed))
}

// src/main.rs

use renderq::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("renderq error: {err:?}");
            std::process::exit(1);
        }
    }
}

/// `Ok(false)` when some job did not finish successfully.
async fn run_main() -> anyhow::Result<bool> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    let summary = run(args).await?;
    Ok(summary.all_done())
}

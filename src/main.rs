// src/main.rs

use wavedag::engine::WorkflowState;
use wavedag::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(WorkflowState::Completed) => {}
        Ok(_) => std::process::exit(1),
        Err(err) => {
            eprintln!("wavedag error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<WorkflowState> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}

// src/main.rs

use cmdbridge::types::FALLBACK_EXIT_CODE;
use cmdbridge::{cli, logging, run};

#[tokio::main]
async fn main() {
    let args = cli::parse();

    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("cmdbridge: failed to initialise logging: {err:?}");
        std::process::exit(FALLBACK_EXIT_CODE);
    }

    match run(args).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("cmdbridge error: {err:?}");
            std::process::exit(FALLBACK_EXIT_CODE);
        }
    }
}

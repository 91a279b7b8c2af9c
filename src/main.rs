//! uds - command-line client for the unified data service.

use tracing::info;
use uds_client::cli::Cli;
use uds_client::config::Config;
use uds_client::error::{Result, UdsError};
use uds_client::render::render_query_error;
use uds_client::transport::ReqwestTransport;
use uds_client::{app, logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    logging::init_stderr_logging(logging::default_directive(cli.verbose));

    match run(&cli).await {
        Ok(output) => print!("{output}"),
        Err(e) => {
            match &e {
                UdsError::Query(query_error) => eprintln!("{}", render_query_error(query_error)),
                _ => eprintln!("{}: {}", e.category(), e),
            }
            std::process::exit(1);
        }
    }
}

async fn run(cli: &Cli) -> Result<String> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    // Precedence: flags (and their env vars) > config file > defaults.
    let server = cli.server_config(&config);
    let transport = ReqwestTransport::new(&server)?;
    info!("Using service at {}", transport.base_url());

    app::dispatch(&cli.command, cli.format, &transport).await
}

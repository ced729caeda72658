use std::process::ExitCode;

use placeholder_core::{
    logging, AppConfig, ApiClient, ErrorChannel, Presentation, Queries, QueryCache, QueryOptions,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(config.log_level);
    info!(variant = ?config.variant, api_url = %config.api_url, "starting");

    let client = match ApiClient::from_config(&config) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "could not build http client");
            return ExitCode::FAILURE;
        }
    };
    let errors = ErrorChannel::new();
    let queries = Queries::new(client, QueryCache::with_error_channel(errors.clone()));

    match queries.users(&QueryOptions::default()).await {
        Ok(users) => {
            for user in users.iter() {
                println!("{:>3}  {:<24} {}", user.id, user.name, user.email);
            }
            ExitCode::SUCCESS
        }
        Err(_) => {
            if let Presentation::Modal {
                status_code,
                message,
            } = errors.presentation()
            {
                let code = status_code.map_or_else(|| "-".to_string(), |c| c.to_string());
                eprintln!("error [{code}]: {message}");
            }
            ExitCode::FAILURE
        }
    }
}

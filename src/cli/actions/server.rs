use crate::{api, api::handlers::auth::AuthConfig, cli::telemetry};
use anyhow::Result;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub frontend_base_url: String,
    pub session_ttl_seconds: i64,
    pub verify_code_ttl_seconds: i64,
}

impl Args {
    fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(self.frontend_base_url.clone())
            .with_session_ttl_seconds(self.session_ttl_seconds)
            .with_verify_code_ttl_seconds(self.verify_code_ttl_seconds)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the store cannot be reached or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = args.auth_config();
    info!(
        port = args.port,
        persistent = args.dsn.is_some(),
        frontend = %auth_config.frontend_base_url(),
        "starting truefeedback"
    );

    let result = api::new(args.port, args.dsn, auth_config).await;

    telemetry::shutdown_tracer();

    result
}

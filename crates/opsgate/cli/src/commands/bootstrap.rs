//! `opsgate bootstrap-admin`

use chrono::Utc;
use clap::Args;
use opsgate_authz::bootstrap_admin;
use opsgate_config::GateConfig;

use crate::error::CliResult;
use crate::output::{print_info, print_json, print_success, OutputFormat};
use crate::store;

#[derive(Args)]
pub struct BootstrapArgs {
    /// User to promote (defaults to bootstrap.user_id)
    #[arg(long)]
    pub user_id: Option<String>,

    /// Email stored on the role record (defaults to bootstrap.email)
    #[arg(long)]
    pub email: Option<String>,
}

/// Grant the admin role to the configured user.
pub async fn execute(args: BootstrapArgs, config: &GateConfig, output: OutputFormat) -> CliResult<()> {
    let request = config.bootstrap_request(args.user_id.as_deref(), args.email.as_deref())?;
    let store = store::open(&config.store).await?;
    let record = bootstrap_admin(store.as_ref(), &request, Utc::now()).await?;

    match output {
        OutputFormat::Json => print_json(&record)?,
        OutputFormat::Text => {
            print_success(&format!("{} now has role {}", record.user_id, record.role));
            if !record.email.is_empty() {
                print_info(&format!("email: {}", record.email));
            }
            print_info(&format!("record created at {}", record.created_at.to_rfc3339()));
        }
    }
    Ok(())
}

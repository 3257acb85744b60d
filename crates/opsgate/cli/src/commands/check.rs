//! `opsgate check-admin`

use clap::Args;
use opsgate_authz::{AdminSource, AuthorizationCheck};
use opsgate_config::{ConfigError, GateConfig};
use opsgate_types::UserId;
use serde::Serialize;

use crate::error::CliResult;
use crate::output::{print_info, print_json, print_success, OutputFormat};
use crate::store;

#[derive(Args)]
pub struct CheckArgs {
    /// User to check
    #[arg(long)]
    pub user_id: String,
}

#[derive(Serialize)]
struct CheckReport {
    user_id: UserId,
    is_admin: bool,
    source: AdminSource,
}

/// Resolve admin capability exactly as the dashboard does.
pub async fn execute(args: CheckArgs, config: &GateConfig, output: OutputFormat) -> CliResult<()> {
    let user_id = UserId::parse(&args.user_id)
        .ok_or_else(|| ConfigError::Invalid("--user-id must not be blank".to_string()))?;
    let store = store::open(&config.store).await?;
    let check = AuthorizationCheck::new(config.allow_list(), store);
    let caps = check.capabilities(&user_id).await;

    let report = CheckReport {
        user_id,
        is_admin: caps.is_admin,
        source: caps.source,
    };

    match output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text if report.is_admin => {
            let via = match report.source {
                AdminSource::AllowList => "allow-list",
                AdminSource::RoleRecord => "role record",
                AdminSource::None => "none",
            };
            print_success(&format!("{} is an admin (via {via})", report.user_id));
        }
        OutputFormat::Text => print_info(&format!("{} is not an admin", report.user_id)),
    }
    Ok(())
}

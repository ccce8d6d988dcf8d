use cartkeeper_app::domain::tenants::records::TenantUuid;
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::ServiceArgs;

#[derive(Debug, Args)]
pub(crate) struct AbandonedCommand {
    #[command(subcommand)]
    command: AbandonedSubcommand,
}

#[derive(Debug, Subcommand)]
enum AbandonedSubcommand {
    /// Record inactive carts as abandoned
    Detect(TenantArgs),

    /// Send every reminder that is due
    Remind(TenantArgs),

    /// Expire abandoned carts past the tenant's window
    Expire(TenantArgs),
}

#[derive(Debug, Args)]
struct TenantArgs {
    #[command(flatten)]
    services: ServiceArgs,

    /// Tenant UUID
    #[arg(long)]
    tenant: Uuid,
}

pub(crate) async fn run(command: AbandonedCommand) -> Result<(), String> {
    match command.command {
        AbandonedSubcommand::Detect(args) => {
            let tenant = TenantUuid::from_uuid(args.tenant);
            let context = args.services.connect().await?;

            let detected = context
                .abandoned_carts
                .detect(tenant)
                .await
                .map_err(|error| format!("failed to detect abandoned carts: {error}"))?;

            println!("detected: {detected}");
        }
        AbandonedSubcommand::Remind(args) => {
            let tenant = TenantUuid::from_uuid(args.tenant);
            let context = args.services.connect().await?;

            let run = context
                .abandoned_carts
                .send_reminders(tenant, None)
                .await
                .map_err(|error| format!("failed to send reminders: {error}"))?;

            println!("sent: {}", run.sent);
            println!("failed: {}", run.failed);
            println!("skipped: {}", run.skipped);
        }
        AbandonedSubcommand::Expire(args) => {
            let tenant = TenantUuid::from_uuid(args.tenant);
            let context = args.services.connect().await?;

            let expired = context
                .abandoned_carts
                .expire(tenant)
                .await
                .map_err(|error| format!("failed to expire abandoned carts: {error}"))?;

            println!("expired: {expired}");
        }
    }

    Ok(())
}

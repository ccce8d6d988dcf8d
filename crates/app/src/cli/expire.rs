use cartkeeper_app::workers::{ExpirationConfig, ExpirationWorker};
use clap::Args;

use crate::cli::ServiceArgs;

#[derive(Debug, Args)]
pub(crate) struct ExpireArgs {
    #[command(flatten)]
    services: ServiceArgs,
}

pub(crate) async fn run(args: ExpireArgs) -> Result<(), String> {
    let context = args.services.connect().await?;

    let worker = ExpirationWorker::new(context.carts, ExpirationConfig::default());

    let run = worker
        .force_run()
        .await
        .map_err(|error| format!("expiration failed: {error}"))?;

    println!("carts_deleted: {}", run.carts_deleted);
    println!("carts_processed: {}", run.carts_processed);
    println!("carts_pruned: {}", run.carts_pruned);
    println!("items_expired: {}", run.items_expired);
    println!("failures: {}", run.failures);

    Ok(())
}

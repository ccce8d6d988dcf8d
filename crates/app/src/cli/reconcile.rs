use cartkeeper_app::workers::{ReconciliationConfig, ReconciliationWorker};
use clap::Args;

use crate::cli::ServiceArgs;

#[derive(Debug, Args)]
pub(crate) struct ReconcileArgs {
    #[command(flatten)]
    services: ServiceArgs,

    /// Carts validated within this many minutes are skipped
    #[arg(long, default_value_t = 60)]
    stale_minutes: u64,

    /// Validations in flight at once
    #[arg(long, default_value_t = 5)]
    concurrency: usize,
}

pub(crate) async fn run(args: ReconcileArgs) -> Result<(), String> {
    let context = args.services.connect().await?;

    let worker = ReconciliationWorker::new(
        context.carts,
        context.validator,
        ReconciliationConfig {
            stale_age: std::time::Duration::from_secs(args.stale_minutes.saturating_mul(60)),
            concurrency: args.concurrency,
            ..ReconciliationConfig::default()
        },
    );

    let run = worker
        .force_run()
        .await
        .map_err(|error| format!("reconciliation failed: {error}"))?;

    println!("carts_selected: {}", run.carts_selected);
    println!("carts_validated: {}", run.carts_validated);
    println!("items_updated: {}", run.items_updated);
    println!("unavailable_found: {}", run.unavailable_found);
    println!("out_of_stock_found: {}", run.out_of_stock_found);
    println!("price_changes_found: {}", run.price_changes_found);
    println!("validation_errors: {}", run.validation_errors);

    Ok(())
}

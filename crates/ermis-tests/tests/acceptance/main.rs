//! Cucumber runner for the ermis acceptance scenarios.
//!
//! Features run in file-name order, one scenario at a time:
//! ```text
//! tests/features/00_save_token.feature        -> keep the operator's ticket
//! tests/features/10_alias_lifecycle.feature   -> create, list, update, move
//! tests/features/20_nodes.feature             -> allowed/forbidden nodes
//! tests/features/30_alarms.feature            -> alarms
//! tests/features/40_authorization.feature     -> non-admin modifications
//! tests/features/50_alias_removal.feature     -> delete
//! tests/features/60_unauthenticated.feature   -> no ticket, foreign hostgroup
//! tests/features/90_restore_token.feature     -> put the operator's ticket back
//! ```
//!
//! Before any scenario the test alias is deleted, in case a previous run
//! left it behind.

#[cfg(not(feature = "acceptance"))]
fn main() {}

#[cfg(feature = "acceptance")]
mod steps;
#[cfg(feature = "acceptance")]
mod world;

#[cfg(feature = "acceptance")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use cucumber::World as _;
    use ermis_tests::config::Config;
    use ermis_tests::fixtures::ErmisClient;
    use tracing::{error, info};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ermis_tests=info,acceptance=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        api_url = %config.api_url,
        test_alias = %config.test_alias,
        "Configuration loaded"
    );

    let client = ErmisClient::new(&config)?;

    client.reset_test_alias(&config.test_alias).await.map_err(|e| {
        error!("Could not reset the test alias: {}", e);
        e
    })?;

    world::install(config, client)?;

    world::ErmisWorld::cucumber()
        .max_concurrent_scenarios(1)
        .fail_on_skipped()
        .run_and_exit(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/features"))
        .await;

    Ok(())
}

//! Glucose Monitoring Fleet Simulator
//!
//! Runs one simulation from a reference data snapshot and drips the
//! resulting device and metric streams into their JSONL feeds.

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use glucosim::config::Settings;
use glucosim::feed;
use glucosim::reference::ReferenceData;
use glucosim::simulation::{now_start_time, Simulation};
use glucosim::tracker::RandomDisconnects;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenv::dotenv().ok();

    // Logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,glucosim=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();

    // Load configuration
    let settings = Settings::from_env().context("Failed to load configuration")?;
    info!("Starting glucose fleet simulator");

    let reference = ReferenceData::load(&settings.simulation.reference_data_path).with_context(|| {
        format!(
            "Failed to load reference data from {}",
            settings.simulation.reference_data_path.display()
        )
    })?;

    let rng = match settings.simulation.seed {
        Some(seed) => {
            info!(seed = seed, "Using fixed simulation seed");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    // ---------------------------------------------------------------------
    // Generate both streams, then feed them out at the configured pace
    // ---------------------------------------------------------------------
    let mut simulation = Simulation::new(
        &reference,
        now_start_time(),
        settings.simulation.duration_minutes,
        RandomDisconnects::with_probability(settings.simulation.disconnect_probability),
        rng,
    )?;
    let output = simulation.run()?;

    let summary = feed::publish(&output, &settings.feed).await?;

    info!(
        run_id = %output.run_id,
        device_files = summary.device_files,
        metric_files = summary.metric_files,
        "Simulation feeds complete"
    );
    Ok(())
}

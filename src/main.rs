use crate::app_config::AppConfig;
use crate::capability::{CapabilityGate, ConfiguredCapabilityGate};
use crate::provider::{FixProvider, SimulatedFixProvider};
use crate::sampler::controller::LifecycleController;
use crate::sampler::policy::SamplingPolicy;
use crate::sampler::registry;
use crate::sink::{FixSink, JsonlSink};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::signal;
use tokio::signal::unix::SignalKind;
use tracing::{info, warn};

mod app_config;
mod capability;
mod domain;
mod provider;
mod sampler;
mod sink;

const SAMPLER_NAME: &str = "location";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    info!("🧭 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load();
    info!("✅  Loaded configuration");

    let sampling_config = config.sampling().sampling_config();
    for warning in sampling_config.warnings() {
        warn!("⚠️ {}", warning);
    }

    let capability: Arc<dyn CapabilityGate> = Arc::new(ConfiguredCapabilityGate::new(config.capability().fine_location_granted()));
    let sink: Arc<dyn FixSink> = Arc::new(JsonlSink::new(config.sink().path()));
    let provider: Arc<dyn FixProvider> = Arc::new(SimulatedFixProvider::new(config.geo_location().clone(), capability.clone()));
    let policy = Arc::new(SamplingPolicy::new(sampling_config, sink));

    let controller = Arc::new(LifecycleController::new(provider, capability, policy, Handle::current()));
    registry::register(SAMPLER_NAME, controller.clone());
    info!("✅  Initialized sampling controller");

    // Without the capability the process has no job to do, mirror stopSelf()
    if let Err(e) = controller.start().await {
        warn!("⛔ Could not start location sampling: {}", e);
        return Err(e.into());
    }
    info!("🧭 {} is up and running", env!("CARGO_PKG_NAME"));

    wait_for_shutdown().await;

    Ok(())
}

async fn wait_for_shutdown() {
    let mut terminate = signal::unix::signal(SignalKind::terminate()).expect("Could not install the terminate signal handler");
    let mut hangup = signal::unix::signal(SignalKind::hangup()).expect("Could not install the hangup signal handler");

    let Some(controller) = registry::get(SAMPLER_NAME) else {
        warn!("⚠️ No sampling controller registered under '{}'", SAMPLER_NAME);
        return;
    };

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("⏹️ Received an interrupt");
            controller.stop().await;
        }
        _ = terminate.recv() => {
            info!("🧹 Received a terminate signal");
            controller.on_owning_process_removed().await;
        }
        // The config-backed gate has no runtime revocation source, SIGHUP stands in for the
        // platform's capability-revoked signal
        _ = hangup.recv() => {
            info!("⛔ Received a hangup signal");
            controller.on_capability_revoked().await;
        }
    }
}

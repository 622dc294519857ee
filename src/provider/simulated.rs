use crate::capability::CapabilityGate;
use crate::domain::{FixBatch, FixSource, GeoLocation, LocationFix};
use crate::provider::{FixHandler, FixProvider, ProviderError, RequestDescriptor, SubscribeError, SubscriptionHandle};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, instrument};

// Cycled per tick so both sides of the accuracy gate are exercised
const ACCURACY_CYCLE_METERS: [f64; 6] = [12.0, 31.5, 48.0, 75.0, 22.5, 160.0];

/// In-process stand-in for a platform location client. Emits deterministic fix batches
/// drifting away from a configured origin so the daemon runs without device hardware.
#[derive(Debug)]
pub struct SimulatedFixProvider {
    origin: GeoLocation,
    capability: Arc<dyn CapabilityGate>,
    next_id: AtomicU64,
    jobs: Mutex<HashMap<u64, JoinHandle<()>>>,
}

impl SimulatedFixProvider {
    pub fn new(origin: GeoLocation, capability: Arc<dyn CapabilityGate>) -> Self {
        SimulatedFixProvider {
            origin,
            capability,
            next_id: AtomicU64::new(1),
            jobs: Mutex::new(HashMap::new()),
        }
    }
}

fn simulated_fix(origin: &GeoLocation, tick: u64) -> LocationFix {
    let drift = tick as f64 * 0.0001;

    LocationFix {
        latitude: origin.latitude + drift,
        longitude: origin.longitude + drift,
        accuracy_meters: ACCURACY_CYCLE_METERS[(tick as usize) % ACCURACY_CYCLE_METERS.len()],
        recorded_at: Utc::now(),
        source: FixSource::Fused,
    }
}

#[async_trait]
impl FixProvider for SimulatedFixProvider {
    async fn last_fix(&self) -> Result<Option<LocationFix>, ProviderError> {
        Ok(Some(simulated_fix(&self.origin, 0)))
    }

    #[instrument(skip_all)]
    async fn subscribe(&self, descriptor: RequestDescriptor, handler: Arc<dyn FixHandler>, context: Handle) -> Result<SubscriptionHandle, SubscribeError> {
        if !self.capability.fine_location_granted() {
            return Err(SubscribeError::CapabilityDenied);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let interval = descriptor.interval;
        let origin = self.origin.clone();

        // Job loop, dispatched on the caller-provided delivery context
        let job = context.spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut tick: u64 = 0;

            loop {
                ticker.tick().await;

                let mut fixes = Vec::with_capacity(2);
                if tick % 4 == 3 {
                    // Coalesced delivery, the stale fix precedes the most recent one
                    fixes.push(simulated_fix(&origin, tick - 1));
                }
                fixes.push(simulated_fix(&origin, tick));

                handler.on_batch(FixBatch::new(fixes)).await;
                tick += 1;
            }
        });

        self.jobs.lock().await.insert(id, job);
        info!("📡 Subscribed to simulated fix updates every {:?}", interval);
        Ok(SubscriptionHandle::new(id))
    }

    #[instrument(skip_all)]
    async fn unsubscribe(&self, handle: SubscriptionHandle) {
        match self.jobs.lock().await.remove(&handle.id()) {
            Some(job) => {
                job.abort();
                info!("📡 Released fix subscription");
            }
            None => debug!("📡 Ignoring release of an unknown subscription handle"),
        }
    }
}

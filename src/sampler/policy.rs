use crate::domain::{FixBatch, LocationFix, SamplingConfig};
use crate::provider::{FixHandler, Priority, RequestDescriptor};
use crate::sink::FixSink;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task;
use tracing::{debug, instrument, warn};

/// Decides which incoming fixes are worth storing. The entire filtering algorithm is a
/// single accuracy gate, there is no deduplication, smoothing, or outlier rejection.
#[derive(Debug)]
pub struct SamplingPolicy {
    config: SamplingConfig,
    sink: Arc<dyn FixSink>,
}

impl SamplingPolicy {
    pub fn new(config: SamplingConfig, sink: Arc<dyn FixSink>) -> Self {
        SamplingPolicy { config, sink }
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Translates the sampling knobs into a concrete fix request. Always requests the
    /// highest accuracy tier, there is no adaptive tier selection.
    pub fn request_descriptor(config: &SamplingConfig) -> RequestDescriptor {
        RequestDescriptor {
            interval: config.interval,
            fastest_interval: config.fastest_interval,
            priority: Priority::HighAccuracy,
        }
    }

    fn accepts(&self, fix: &LocationFix) -> bool {
        fix.accuracy_meters <= self.config.accuracy_threshold_meters
    }
}

#[async_trait]
impl FixHandler for SamplingPolicy {
    /// Only the batch's most recent fix is a storage candidate; every fix in the batch is
    /// still run through the gate for the audit log.
    #[instrument(skip_all)]
    async fn on_batch(&self, batch: FixBatch) {
        for fix in batch.fixes() {
            #[rustfmt::skip]
            debug!(accepted = self.accepts(fix), "🛰️ Fix {} {} accuracy {}m via {:?}", fix.latitude, fix.longitude, fix.accuracy_meters, fix.source);
        }

        let Some(fix) = batch.latest() else {
            debug!("🛰️ Received an empty batch");
            return;
        };

        if !self.accepts(fix) {
            #[rustfmt::skip]
            debug!("🗑️ Discarded fix, accuracy {}m exceeds the {}m threshold", fix.accuracy_meters, self.config.accuracy_threshold_meters);
            return;
        }

        // Store off the delivery path so a slow sink never delays the next batch
        let sink = self.sink.clone();
        let fix = fix.clone();
        task::spawn(async move {
            if let Err(e) = sink.store(fix).await {
                warn!("⚠️ Could not store accepted fix: {}", e);
            }
        });
    }
}

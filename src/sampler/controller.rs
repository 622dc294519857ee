use crate::capability::CapabilityGate;
use crate::domain::{ControllerState, FixBatch};
use crate::provider::{FixHandler, FixProvider, SubscribeError};
use crate::sampler::policy::SamplingPolicy;
use crate::sampler::subscription_state::SubscriptionState;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Owns the single recurring fix subscription and the lifecycle state machine around it.
/// All collaborators are injected at construction, the controller never reaches for ambient
/// context.
#[derive(Debug)]
pub struct LifecycleController {
    provider: Arc<dyn FixProvider>,
    capability: Arc<dyn CapabilityGate>,
    policy: Arc<SamplingPolicy>,
    delivery_context: Handle,
    subscription: Mutex<SubscriptionState>,
}

#[derive(Error, Debug)]
pub enum StartError {
    #[error("fine location capability is not granted")]
    PermissionDenied,
    #[error(transparent)]
    Subscribe(#[from] SubscribeError),
}

impl LifecycleController {
    pub fn new(provider: Arc<dyn FixProvider>, capability: Arc<dyn CapabilityGate>, policy: Arc<SamplingPolicy>, delivery_context: Handle) -> Self {
        LifecycleController {
            provider,
            capability,
            policy,
            delivery_context,
            subscription: Mutex::new(SubscriptionState::new()),
        }
    }

    pub async fn state(&self) -> ControllerState {
        self.subscription.lock().await.state()
    }

    /// Brings the controller to `Running`: forwards the last known fix through the accuracy
    /// gate, then establishes the recurring subscription. Idempotent while starting or
    /// running. Without the fine location capability the controller stays `Stopped`.
    #[instrument(skip_all)]
    pub async fn start(&self) -> Result<(), StartError> {
        {
            let mut subscription = self.subscription.lock().await;
            match subscription.state() {
                ControllerState::Starting | ControllerState::Running => {
                    debug!("▶️ Start requested while already {:?}, ignoring", subscription.state());
                    return Ok(());
                }
                _ => {}
            }

            if !self.capability.fine_location_granted() {
                warn!("⛔ Fine location capability is not granted");
                return Err(StartError::PermissionDenied);
            }

            subscription.set_state(ControllerState::Starting);
        }

        info!("▶️ Starting location sampling...");
        self.forward_last_known_fix().await;

        // The capability may have been revoked while the last fix lookup was in flight
        if !self.capability.fine_location_granted() {
            warn!("⛔ Fine location capability was revoked during startup, not subscribing");
            self.subscription.lock().await.set_state(ControllerState::Stopped);
            return Err(StartError::PermissionDenied);
        }

        let descriptor = SamplingPolicy::request_descriptor(self.policy.config());
        let handler: Arc<dyn FixHandler> = self.policy.clone();
        let handle = match self.provider.subscribe(descriptor, handler, self.delivery_context.clone()).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("⛔ Could not subscribe to fix updates: {}", e);
                self.subscription.lock().await.set_state(ControllerState::Stopped);
                return Err(e.into());
            }
        };

        let mut subscription = self.subscription.lock().await;
        if subscription.state() != ControllerState::Starting {
            // stop() raced in while the subscription was being established
            drop(subscription);
            info!("⏹️ Stopped during startup, releasing the fresh subscription");
            self.provider.unsubscribe(handle).await;
            return Ok(());
        }

        subscription.activate(handle);
        info!("▶️ Starting location sampling... OK");
        Ok(())
    }

    async fn forward_last_known_fix(&self) {
        match self.provider.last_fix().await {
            Ok(Some(fix)) => {
                debug!("🛰️ Forwarding the last known fix through the accuracy gate");
                self.policy.on_batch(FixBatch::single(fix)).await;
            }
            Ok(None) => debug!("🛰️ No last known fix available"),
            // Non-fatal, a missing last known fix must not block the subscription
            Err(e) => warn!("⚠️ Last known fix lookup failed: {}", e),
        }
    }

    /// Releases the subscription if one exists and settles on `Stopped`. Idempotent, safe to
    /// call concurrently with in-flight deliveries and lookups.
    #[instrument(skip_all)]
    pub async fn stop(&self) {
        let handle = {
            let mut subscription = self.subscription.lock().await;
            if subscription.state() == ControllerState::Stopped {
                debug!("⏹️ Stop requested while already stopped, ignoring");
                return;
            }

            subscription.set_state(ControllerState::Stopping);
            subscription.take_handle()
        };

        if let Some(handle) = handle {
            self.provider.unsubscribe(handle).await;
        }

        self.subscription.lock().await.set_state(ControllerState::Stopped);
        info!("⏹️ Location sampling stopped");
    }

    /// Invoked when the fine location capability is withdrawn while running.
    #[instrument(skip_all)]
    pub async fn on_capability_revoked(&self) {
        info!("⛔ Fine location capability revoked, stopping sampling");
        self.stop().await;
    }

    /// Invoked when the hosting process is torn down unexpectedly, guarantees the
    /// subscription is not leaked.
    #[instrument(skip_all)]
    pub async fn on_owning_process_removed(&self) {
        info!("🧹 Owning process removed, stopping sampling");
        self.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FixSource, LocationFix, SamplingConfig};
    use crate::provider::{ProviderError, RequestDescriptor, SubscriptionHandle};
    use crate::sink::{FixSink, SinkError};
    use async_trait::async_trait;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
    use std::time::Duration;
    use test_log::test;
    use tokio::sync::{Notify, mpsc};
    use tokio::time::timeout;

    #[derive(Debug, Default)]
    struct MockProvider {
        last_fix: Option<LocationFix>,
        fail_last_fix: bool,
        deny_subscribe: bool,
        next_id: AtomicU64,
        subscribe_calls: AtomicU64,
        active: StdMutex<HashSet<u64>>,
    }

    #[async_trait]
    impl FixProvider for MockProvider {
        async fn last_fix(&self) -> Result<Option<LocationFix>, ProviderError> {
            if self.fail_last_fix {
                return Err(ProviderError::Unavailable("no cached position".to_string()));
            }

            Ok(self.last_fix.clone())
        }

        async fn subscribe(&self, _descriptor: RequestDescriptor, _handler: Arc<dyn FixHandler>, _context: Handle) -> Result<SubscriptionHandle, SubscribeError> {
            if self.deny_subscribe {
                return Err(SubscribeError::CapabilityDenied);
            }

            self.subscribe_calls.fetch_add(1, Ordering::Relaxed);
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            self.active.lock().unwrap().insert(id);
            Ok(SubscriptionHandle::new(id))
        }

        async fn unsubscribe(&self, handle: SubscriptionHandle) {
            self.active.lock().unwrap().remove(&handle.id());
        }
    }

    /// Grants the capability for the first `grants_remaining` checks, then revokes it.
    #[derive(Debug)]
    struct CountdownGate {
        grants_remaining: AtomicI64,
    }

    impl CountdownGate {
        fn granting(checks: i64) -> Self {
            CountdownGate {
                grants_remaining: AtomicI64::new(checks),
            }
        }
    }

    impl CapabilityGate for CountdownGate {
        fn fine_location_granted(&self) -> bool {
            self.grants_remaining.fetch_sub(1, Ordering::Relaxed) > 0
        }
    }

    #[derive(Debug)]
    struct RecordingSink {
        tx: mpsc::Sender<LocationFix>,
    }

    #[async_trait]
    impl FixSink for RecordingSink {
        async fn store(&self, fix: LocationFix) -> Result<(), SinkError> {
            self.tx.send(fix).await.unwrap_or_default();
            Ok(())
        }
    }

    fn fix(accuracy_meters: f64) -> LocationFix {
        LocationFix {
            latitude: 51.8615899,
            longitude: 4.3580323,
            accuracy_meters,
            recorded_at: Utc::now(),
            source: FixSource::Gps,
        }
    }

    fn sampling_config() -> SamplingConfig {
        SamplingConfig {
            interval: Duration::from_millis(1000),
            fastest_interval: Duration::from_millis(5000),
            accuracy_threshold_meters: 50.0,
            min_displacement_meters: 15.0,
        }
    }

    /// Provider whose `subscribe` parks until released, to interleave lifecycle calls with a
    /// subscription that is still being established.
    #[derive(Debug, Default)]
    struct GatedProvider {
        entered_subscribe: Notify,
        release_subscribe: Notify,
        next_id: AtomicU64,
        active: StdMutex<HashSet<u64>>,
    }

    #[async_trait]
    impl FixProvider for GatedProvider {
        async fn last_fix(&self) -> Result<Option<LocationFix>, ProviderError> {
            Ok(None)
        }

        async fn subscribe(&self, _descriptor: RequestDescriptor, _handler: Arc<dyn FixHandler>, _context: Handle) -> Result<SubscriptionHandle, SubscribeError> {
            self.entered_subscribe.notify_one();
            self.release_subscribe.notified().await;

            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            self.active.lock().unwrap().insert(id);
            Ok(SubscriptionHandle::new(id))
        }

        async fn unsubscribe(&self, handle: SubscriptionHandle) {
            self.active.lock().unwrap().remove(&handle.id());
        }
    }

    fn controller_with(provider: Arc<dyn FixProvider>, gate: CountdownGate) -> (LifecycleController, mpsc::Receiver<LocationFix>) {
        let (tx, rx) = mpsc::channel::<LocationFix>(8);
        let policy = Arc::new(SamplingPolicy::new(sampling_config(), Arc::new(RecordingSink { tx })));
        let controller = LifecycleController::new(provider, Arc::new(gate), policy, Handle::current());

        (controller, rx)
    }

    #[test(tokio::test)]
    async fn start_establishes_exactly_one_subscription() {
        let provider = Arc::new(MockProvider::default());
        let (controller, _rx) = controller_with(provider.clone(), CountdownGate::granting(i64::MAX));

        controller.start().await.unwrap();

        assert_eq!(controller.state().await, ControllerState::Running);
        assert_eq!(provider.active.lock().unwrap().len(), 1);
    }

    #[test(tokio::test)]
    async fn start_is_idempotent_while_running() {
        let provider = Arc::new(MockProvider::default());
        let (controller, _rx) = controller_with(provider.clone(), CountdownGate::granting(i64::MAX));

        controller.start().await.unwrap();
        controller.start().await.unwrap();

        assert_eq!(provider.subscribe_calls.load(Ordering::Relaxed), 1);
        assert_eq!(provider.active.lock().unwrap().len(), 1);
    }

    #[test(tokio::test)]
    async fn stop_releases_the_subscription() {
        let provider = Arc::new(MockProvider::default());
        let (controller, _rx) = controller_with(provider.clone(), CountdownGate::granting(i64::MAX));

        controller.start().await.unwrap();
        controller.stop().await;

        assert_eq!(controller.state().await, ControllerState::Stopped);
        assert!(provider.active.lock().unwrap().is_empty());
    }

    #[test(tokio::test)]
    async fn stop_twice_is_a_no_op() {
        let provider = Arc::new(MockProvider::default());
        let (controller, _rx) = controller_with(provider.clone(), CountdownGate::granting(i64::MAX));

        controller.start().await.unwrap();
        controller.stop().await;
        controller.stop().await;

        assert_eq!(controller.state().await, ControllerState::Stopped);
    }

    #[test(tokio::test)]
    async fn capability_revocation_releases_the_subscription() {
        let provider = Arc::new(MockProvider::default());
        let (controller, _rx) = controller_with(provider.clone(), CountdownGate::granting(i64::MAX));

        controller.start().await.unwrap();
        controller.on_capability_revoked().await;

        assert_eq!(controller.state().await, ControllerState::Stopped);
        assert!(provider.active.lock().unwrap().is_empty());
    }

    #[test(tokio::test)]
    async fn owning_process_removal_releases_the_subscription() {
        let provider = Arc::new(MockProvider::default());
        let (controller, _rx) = controller_with(provider.clone(), CountdownGate::granting(i64::MAX));

        controller.start().await.unwrap();
        controller.on_owning_process_removed().await;

        assert_eq!(controller.state().await, ControllerState::Stopped);
        assert!(provider.active.lock().unwrap().is_empty());
    }

    #[test(tokio::test)]
    async fn start_without_the_capability_stays_stopped() {
        let provider = Arc::new(MockProvider::default());
        let (controller, _rx) = controller_with(provider.clone(), CountdownGate::granting(0));

        let result = controller.start().await;

        assert!(matches!(result, Err(StartError::PermissionDenied)));
        assert_eq!(controller.state().await, ControllerState::Stopped);
        assert_eq!(provider.subscribe_calls.load(Ordering::Relaxed), 0);
    }

    #[test(tokio::test)]
    async fn a_failed_last_fix_lookup_does_not_block_the_subscription() {
        let provider = Arc::new(MockProvider {
            fail_last_fix: true,
            ..MockProvider::default()
        });
        let (controller, _rx) = controller_with(provider.clone(), CountdownGate::granting(i64::MAX));

        controller.start().await.unwrap();

        assert_eq!(controller.state().await, ControllerState::Running);
        assert_eq!(provider.active.lock().unwrap().len(), 1);
    }

    #[test(tokio::test)]
    async fn revocation_between_last_fix_and_subscribe_stays_stopped() {
        let provider = Arc::new(MockProvider::default());
        let (controller, _rx) = controller_with(provider.clone(), CountdownGate::granting(1));

        let result = controller.start().await;

        assert!(matches!(result, Err(StartError::PermissionDenied)));
        assert_eq!(controller.state().await, ControllerState::Stopped);
        assert_eq!(provider.subscribe_calls.load(Ordering::Relaxed), 0);
    }

    #[test(tokio::test)]
    async fn a_denied_subscribe_stays_stopped() {
        let provider = Arc::new(MockProvider {
            deny_subscribe: true,
            ..MockProvider::default()
        });
        let (controller, _rx) = controller_with(provider.clone(), CountdownGate::granting(i64::MAX));

        let result = controller.start().await;

        assert!(matches!(result, Err(StartError::Subscribe(SubscribeError::CapabilityDenied))));
        assert_eq!(controller.state().await, ControllerState::Stopped);
    }

    #[test(tokio::test)]
    async fn a_stop_during_startup_releases_the_fresh_subscription() {
        let provider = Arc::new(GatedProvider::default());
        let (controller, _rx) = controller_with(provider.clone(), CountdownGate::granting(i64::MAX));
        let controller = Arc::new(controller);

        let starting = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.start().await })
        };

        // Wait until the subscription is being established, then stop while it is pending
        timeout(Duration::from_secs(1), provider.entered_subscribe.notified()).await.unwrap();
        controller.stop().await;
        provider.release_subscribe.notify_one();

        starting.await.unwrap().unwrap();
        assert_eq!(controller.state().await, ControllerState::Stopped);
        assert!(provider.active.lock().unwrap().is_empty());
    }

    #[test(tokio::test)]
    async fn the_last_known_fix_is_forwarded_through_the_gate() {
        let provider = Arc::new(MockProvider {
            last_fix: Some(fix(10.0)),
            ..MockProvider::default()
        });
        let (controller, mut rx) = controller_with(provider.clone(), CountdownGate::granting(i64::MAX));

        controller.start().await.unwrap();

        let stored = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(stored.accuracy_meters, 10.0);
    }

    #[test(tokio::test)]
    async fn an_inaccurate_last_known_fix_is_not_stored() {
        let provider = Arc::new(MockProvider {
            last_fix: Some(fix(120.0)),
            ..MockProvider::default()
        });
        let (controller, mut rx) = controller_with(provider.clone(), CountdownGate::granting(i64::MAX));

        controller.start().await.unwrap();

        assert!(timeout(Duration::from_millis(50), rx.recv()).await.is_err());
    }
}

use crate::domain::ControllerState;
use crate::provider::SubscriptionHandle;

/// Lifecycle state plus the handle it guards, mutated only under the controller's lock.
/// The handle is held iff the state is `Running`, apart from the moment `stop()` moves to
/// `Stopping` right before taking it.
#[derive(Debug)]
pub(crate) struct SubscriptionState {
    state: ControllerState,
    handle: Option<SubscriptionHandle>,
}

impl SubscriptionState {
    pub(crate) fn new() -> Self {
        SubscriptionState {
            state: ControllerState::Stopped,
            handle: None,
        }
    }

    pub(crate) fn state(&self) -> ControllerState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ControllerState) {
        self.state = state;
    }

    pub(crate) fn activate(&mut self, handle: SubscriptionHandle) {
        self.handle = Some(handle);
        self.state = ControllerState::Running;
    }

    pub(crate) fn take_handle(&mut self) -> Option<SubscriptionHandle> {
        self.handle.take()
    }
}

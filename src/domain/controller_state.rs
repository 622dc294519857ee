/// Lifecycle of the sampling controller. A subscription handle is held iff the state is
/// `Running`; every terminal transition passes through `Stopping` and releases the handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

use std::fmt::Debug;

/// OS-level permission grant required before location data may be requested. Consulted on
/// every start and re-consulted right before subscribing, since a grant can be withdrawn at
/// any point in between.
pub trait CapabilityGate: Debug + Send + Sync {
    fn fine_location_granted(&self) -> bool;
}

/// Capability gate backed by the process configuration, standing in for a platform
/// permission check.
#[derive(Debug)]
pub struct ConfiguredCapabilityGate {
    fine_location_granted: bool,
}

impl ConfiguredCapabilityGate {
    pub fn new(fine_location_granted: bool) -> Self {
        ConfiguredCapabilityGate { fine_location_granted }
    }
}

impl CapabilityGate for ConfiguredCapabilityGate {
    fn fine_location_granted(&self) -> bool {
        self.fine_location_granted
    }
}

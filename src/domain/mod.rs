mod controller_state;
mod fix;
mod geo_location;
mod sampling;

pub use controller_state::ControllerState;
pub use fix::{FixBatch, FixSource, LocationFix};
pub use geo_location::GeoLocation;
pub use sampling::SamplingConfig;

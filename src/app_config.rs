use crate::domain::{GeoLocation, SamplingConfig};
use config::Config;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    sampling: Sampling,
    capability: Capability,
    sink: Sink,
    location: GeoLocation,
}

impl AppConfig {
    pub fn load() -> Self {
        Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(config::File::with_name("config_local").required(false))
            .add_source(config::Environment::default())
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    pub fn sampling(&self) -> &Sampling {
        &self.sampling
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    pub fn geo_location(&self) -> &GeoLocation {
        &self.location
    }
}

#[derive(Debug, Deserialize)]
pub struct Sampling {
    interval_ms: u64,
    fastest_interval_ms: u64,
    accuracy_threshold_meters: f64,
    min_displacement_meters: f64,
}

impl Sampling {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn fastest_interval(&self) -> Duration {
        Duration::from_millis(self.fastest_interval_ms)
    }

    pub fn accuracy_threshold_meters(&self) -> f64 {
        self.accuracy_threshold_meters
    }

    pub fn min_displacement_meters(&self) -> f64 {
        self.min_displacement_meters
    }

    pub fn sampling_config(&self) -> SamplingConfig {
        SamplingConfig {
            interval: self.interval(),
            fastest_interval: self.fastest_interval(),
            accuracy_threshold_meters: self.accuracy_threshold_meters(),
            min_displacement_meters: self.min_displacement_meters(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Capability {
    fine_location_granted: bool,
}

impl Capability {
    pub fn fine_location_granted(&self) -> bool {
        self.fine_location_granted
    }
}

#[derive(Debug, Deserialize)]
pub struct Sink {
    path: String,
}

impl Sink {
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn new() -> Self {
        AppConfigBuilder {
            config: AppConfig {
                sampling: Sampling {
                    interval_ms: 1000,
                    fastest_interval_ms: 5000,
                    accuracy_threshold_meters: 50.0,
                    min_displacement_meters: 15.0,
                },
                capability: Capability { fine_location_granted: true },
                sink: Sink {
                    path: "waymark_fixes.jsonl".to_string(),
                },
                location: GeoLocation {
                    latitude: 51.8615899,
                    longitude: 4.3580323,
                    altitude: 0.0,
                },
            },
        }
    }

    pub fn fine_location_granted(mut self, granted: bool) -> Self {
        self.config.capability.fine_location_granted = granted;
        self
    }

    pub fn accuracy_threshold_meters(mut self, threshold: f64) -> Self {
        self.config.sampling.accuracy_threshold_meters = threshold;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

use crate::sampler::controller::LifecycleController;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

static SAMPLER_REGISTRY: LazyLock<RwLock<HashMap<String, Arc<LifecycleController>>>> = LazyLock::new(|| RwLock::new(HashMap::new()));

/// Same-process handle exposure: host components look a running controller up here and call
/// it directly, no IPC involved.
pub fn register(name: &str, controller: Arc<LifecycleController>) {
    SAMPLER_REGISTRY.write().unwrap().insert(name.to_string(), controller);
}

pub fn get(name: &str) -> Option<Arc<LifecycleController>> {
    SAMPLER_REGISTRY.read().unwrap().get(name).cloned()
}

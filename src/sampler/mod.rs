pub mod controller;
pub mod policy;
pub mod registry;
mod subscription_state;

pub mod controller;
mod loop_worker;
pub mod state;

pub use controller::{SamplerController, DEFAULT_STOP_GRACE};
pub use state::{SamplerSnapshot, SamplerState, SamplerStatus};

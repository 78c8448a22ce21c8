// selector module - scenario-aware model selection
pub mod selector;
pub use selector::*;

// admission module - quota and rate admission control
pub mod admission;
pub use admission::*;

// refresher module - telemetry-driven score refresh
pub mod refresher;
pub use refresher::*;

// memory module - in-memory reference backends
pub mod memory;
pub use memory::*;

// engine module - facade over the three components
pub mod engine;
pub use engine::*;

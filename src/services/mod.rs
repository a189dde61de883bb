pub mod activity_context;
pub mod fusion;
pub mod hysteresis;
pub mod indicator;
pub mod poller;
pub mod probes;
pub mod scope;

pub use activity_context::{ActivityContext, DefaultActivityContext};
pub use indicator::StatusRenderer;
pub use poller::Poller;
pub use probes::create_probes;

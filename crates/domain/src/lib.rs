pub mod keys;
pub mod push;
pub mod queue;
pub mod review;
pub mod sites;

pub use push::PushService;
pub use queue::{PushContext, QueueEngine, QueueSettings};
pub use review::{decide, ReviewService};
pub use sites::SitesManager;

pub mod delivery;
pub mod repository;
pub mod set_store;
pub mod site;

pub use delivery::{DeliverySink, OutgoingMessage};
pub use repository::{
    AutoPushConfigRepository, PushRecordRepository, TagConfigRepository, WorkItemRepository,
    WorkspaceRepository,
};
pub use set_store::SetStore;
pub use site::SiteService;

pub mod database;
pub mod delivery;
pub mod set_store;
pub mod site;

pub use database::*;
pub use delivery::TelegramDeliverySink;
pub use set_store::{InMemorySetStore, RedisSetStore};
pub use site::MirrorSite;

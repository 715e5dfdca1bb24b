pub mod auto_push_config_repository;
pub mod push_record_repository;
pub mod tag_config_repository;
pub mod work_item_repository;
pub mod workspace_repository;

pub use auto_push_config_repository::SqliteAutoPushConfigRepository;
pub use push_record_repository::SqlitePushRecordRepository;
pub use tag_config_repository::SqliteTagConfigRepository;
pub use work_item_repository::SqliteWorkItemRepository;
pub use workspace_repository::SqliteWorkspaceRepository;

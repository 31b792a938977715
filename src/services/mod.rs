pub mod auth;
pub mod controller;
pub mod database;
pub mod decode;
pub mod feed;
pub mod generator;
pub mod local;
pub mod merge;
pub mod presence;
pub mod remote;
pub mod scheduler;
pub mod sync;

// 重新导出常用类型
pub use auth::SessionStore;
pub use controller::AppController;
pub use database::SurrealStore;
pub use feed::FeedStore;
pub use generator::{HttpGenerator, MediaGenerator};
pub use local::{FileStore, LocalCache, LocalStore, MemoryStore};
pub use presence::PresenceService;
pub use remote::RemoteStore;
pub use scheduler::{ChannelTrigger, IntervalTrigger, TaskHandle, Trigger};
pub use sync::SyncEngine;

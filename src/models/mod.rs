pub mod feed;
pub mod notification;
pub mod profile;
pub mod response;
pub mod session;
pub mod sync;
pub mod video;

pub use feed::FeedSnapshot;
pub use notification::{Notification, NotificationKind};
pub use profile::{Profile, ProfileView};
pub use video::{Comment, Reply, Video};

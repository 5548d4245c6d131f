mod models;
mod sqlite_user_store;
mod user_store;

pub use models::{AuthToken, Permission, UserAccount, UserGroup, UserId};
pub use sqlite_user_store::SqliteUserStore;
pub use user_store::{UserDirectory, UserStore};

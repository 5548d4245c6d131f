use super::models::{AuthToken, UserAccount, UserGroup, UserId};
use anyhow::Result;

/// Narrow view of the institutional user directory (LDAP/SAML in production).
///
/// The workflow core only ever needs to turn an identity reference into an
/// opaque id, look up group membership, and enumerate a reviewing group.
pub trait UserDirectory: Send + Sync {
    /// Resolves a login handle to the directory's opaque user id.
    /// Returns Ok(None) if the handle is unknown.
    fn resolve_handle(&self, handle: &str) -> Result<Option<UserId>>;

    /// Returns all groups the user belongs to.
    fn user_groups(&self, uid: &UserId) -> Result<Vec<UserGroup>>;

    /// Returns the members of a group.
    fn members_of(&self, group: UserGroup) -> Result<Vec<UserId>>;
}

pub trait UserStore: UserDirectory {
    /// Creates a user account and returns its opaque id.
    fn create_user(&self, handle: &str, full_name: &str) -> Result<UserId>;

    /// Returns the account for the given id.
    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, uid: &UserId) -> Result<Option<UserAccount>>;

    fn add_user_to_group(&self, uid: &UserId, group: UserGroup) -> Result<()>;

    /// The acting secretary: the first member of the secretary group.
    fn secretary(&self) -> Result<Option<UserId>>;

    fn add_auth_token(&self, token: AuthToken) -> Result<()>;

    /// Returns Ok(None) if the token does not exist.
    fn get_auth_token(&self, value: &str) -> Result<Option<AuthToken>>;

    /// Stamps the token's last-used time.
    fn touch_auth_token(&self, value: &str) -> Result<()>;

    fn delete_auth_token(&self, value: &str) -> Result<Option<AuthToken>>;
}

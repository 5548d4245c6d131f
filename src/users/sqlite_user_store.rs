use super::models::{AuthToken, UserAccount, UserGroup, UserId};
use super::user_store::{UserDirectory, UserStore};
use crate::sqlite_persistence::{open_database, ColumnSpec, SchemaVersion, TableSpec};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

const USERS_TABLE_V1: TableSpec = TableSpec {
    name: "users",
    create_sql: "CREATE TABLE users (
        uid TEXT PRIMARY KEY,
        handle TEXT NOT NULL UNIQUE,
        full_name TEXT NOT NULL
    )",
    columns: &[
        ColumnSpec {
            name: "uid",
            sql_type: "TEXT",
            non_null: false,
        },
        ColumnSpec {
            name: "handle",
            sql_type: "TEXT",
            non_null: true,
        },
        ColumnSpec {
            name: "full_name",
            sql_type: "TEXT",
            non_null: true,
        },
    ],
    indices: &[],
};

const GROUP_MEMBERS_TABLE_V1: TableSpec = TableSpec {
    name: "group_members",
    create_sql: "CREATE TABLE group_members (
        uid TEXT NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
        group_name TEXT NOT NULL,
        UNIQUE (uid, group_name)
    )",
    columns: &[
        ColumnSpec {
            name: "uid",
            sql_type: "TEXT",
            non_null: true,
        },
        ColumnSpec {
            name: "group_name",
            sql_type: "TEXT",
            non_null: true,
        },
    ],
    indices: &[("idx_group_members_group", "group_name")],
};

const AUTH_TOKENS_TABLE_V1: TableSpec = TableSpec {
    name: "auth_tokens",
    create_sql: "CREATE TABLE auth_tokens (
        value TEXT PRIMARY KEY,
        uid TEXT NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
        created INTEGER NOT NULL,
        last_used INTEGER
    )",
    columns: &[
        ColumnSpec {
            name: "value",
            sql_type: "TEXT",
            non_null: false,
        },
        ColumnSpec {
            name: "uid",
            sql_type: "TEXT",
            non_null: true,
        },
        ColumnSpec {
            name: "created",
            sql_type: "INTEGER",
            non_null: true,
        },
        ColumnSpec {
            name: "last_used",
            sql_type: "INTEGER",
            non_null: false,
        },
    ],
    indices: &[("idx_auth_tokens_uid", "uid")],
};

const USER_SCHEMAS: &[SchemaVersion] = &[SchemaVersion {
    version: 1,
    tables: &[USERS_TABLE_V1, GROUP_MEMBERS_TABLE_V1, AUTH_TOKENS_TABLE_V1],
    migration: None,
}];

/// SQLite-backed stand-in for the institutional directory plus session tokens.
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_database(db_path.as_ref(), USER_SCHEMAS, "user")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl UserDirectory for SqliteUserStore {
    fn resolve_handle(&self, handle: &str) -> Result<Option<UserId>> {
        let conn = self.conn.lock().unwrap();
        let uid = conn
            .query_row(
                "SELECT uid FROM users WHERE handle = ?1",
                params![handle],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(uid.map(UserId))
    }

    fn user_groups(&self, uid: &UserId) -> Result<Vec<UserGroup>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT group_name FROM group_members WHERE uid = ?1")?;
        let groups = stmt
            .query_map(params![uid.as_str()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
            .into_iter()
            .filter_map(|name| UserGroup::parse(&name))
            .collect();
        Ok(groups)
    }

    fn members_of(&self, group: UserGroup) -> Result<Vec<UserId>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT gm.uid FROM group_members gm
             JOIN users u ON u.uid = gm.uid
             WHERE gm.group_name = ?1
             ORDER BY u.handle",
        )?;
        let members = stmt
            .query_map(params![group.as_str()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
            .into_iter()
            .map(UserId)
            .collect();
        Ok(members)
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, handle: &str, full_name: &str) -> Result<UserId> {
        let uid = UserId(uuid::Uuid::new_v4().to_string());
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (uid, handle, full_name) VALUES (?1, ?2, ?3)",
            params![uid.as_str(), handle, full_name],
        )
        .with_context(|| format!("Failed to create user {}", handle))?;
        Ok(uid)
    }

    fn get_user(&self, uid: &UserId) -> Result<Option<UserAccount>> {
        let conn = self.conn.lock().unwrap();
        let account = conn
            .query_row(
                "SELECT uid, handle, full_name FROM users WHERE uid = ?1",
                params![uid.as_str()],
                |row| {
                    Ok(UserAccount {
                        uid: UserId(row.get(0)?),
                        handle: row.get(1)?,
                        full_name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(account)
    }

    fn add_user_to_group(&self, uid: &UserId, group: UserGroup) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO group_members (uid, group_name) VALUES (?1, ?2)",
            params![uid.as_str(), group.as_str()],
        )?;
        Ok(())
    }

    fn secretary(&self) -> Result<Option<UserId>> {
        Ok(self.members_of(UserGroup::Secretary)?.into_iter().next())
    }

    fn add_auth_token(&self, token: AuthToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_tokens (value, uid, created, last_used) VALUES (?1, ?2, ?3, ?4)",
            params![
                token.value,
                token.uid.as_str(),
                token.created,
                token.last_used
            ],
        )?;
        Ok(())
    }

    fn get_auth_token(&self, value: &str) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        let token = conn
            .query_row(
                "SELECT value, uid, created, last_used FROM auth_tokens WHERE value = ?1",
                params![value],
                |row| {
                    Ok(AuthToken {
                        value: row.get(0)?,
                        uid: UserId(row.get(1)?),
                        created: row.get(2)?,
                        last_used: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(token)
    }

    fn touch_auth_token(&self, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE auth_tokens SET last_used = ?1 WHERE value = ?2",
            params![chrono::Utc::now().timestamp(), value],
        )?;
        Ok(())
    }

    fn delete_auth_token(&self, value: &str) -> Result<Option<AuthToken>> {
        let token = self.get_auth_token(value)?;
        if token.is_some() {
            let conn = self.conn.lock().unwrap();
            conn.execute("DELETE FROM auth_tokens WHERE value = ?1", params![value])?;
        }
        Ok(token)
    }
}

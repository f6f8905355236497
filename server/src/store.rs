//! Task repository on top of redb.
//!
//! One file, three tables: users by id, tasks by id, and an email index
//! for login and uniqueness checks. Queried per request — concurrent
//! updates to the same task race with last-write-wins, which is acceptable
//! for single-user editing.

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tarefa_core::{Task, UserRef};
use uuid::Uuid;

const USERS_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("users");
const TASKS_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("tasks");
const EMAIL_INDEX: TableDefinition<&str, &[u8]> = TableDefinition::new("email_index");

/// Account record. The password hash never leaves the server; responses
/// carry a [`UserRef`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn to_ref(&self) -> UserRef {
        UserRef {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Thin handle to the redb file. Cloneable (Arc inside).
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    /// Open (or create) the database at the given path.
    /// Creates tables if they don't exist.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(USERS_TABLE)?;
            let _ = txn.open_table(TASKS_TABLE)?;
            let _ = txn.open_table(EMAIL_INDEX)?;
        }
        txn.commit()?;

        Ok(Store { db: Arc::new(db) })
    }

    // ── Users ──────────────────────────────────────────────────

    pub fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut users = txn.open_table(USERS_TABLE)?;
            let mut emails = txn.open_table(EMAIL_INDEX)?;

            let bytes = postcard::to_allocvec(user)
                .map_err(|e| StoreError::Encode(e.to_string()))?;
            users.insert(user.id.as_bytes().as_slice(), bytes.as_slice())?;
            emails.insert(user.email.as_str(), user.id.as_bytes().as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let txn = self.db.begin_read()?;
        let users = txn.open_table(USERS_TABLE)?;

        match users.get(id.as_bytes().as_slice())? {
            Some(data) => {
                let user = postcard::from_bytes(data.value())
                    .map_err(|e| StoreError::Decode(e.to_string()))?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let txn = self.db.begin_read()?;
        let emails = txn.open_table(EMAIL_INDEX)?;

        let id = match emails.get(email)? {
            Some(data) => {
                let bytes: [u8; 16] = data
                    .value()
                    .try_into()
                    .map_err(|_| StoreError::Decode("malformed id in email index".to_string()))?;
                Uuid::from_bytes(bytes)
            }
            None => return Ok(None),
        };

        drop(emails);
        drop(txn);
        self.get_user(id)
    }

    /// Rewrite a user record, keeping the email index in step when the
    /// address changed.
    pub fn update_user(&self, user: &User, old_email: &str) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut users = txn.open_table(USERS_TABLE)?;
            let mut emails = txn.open_table(EMAIL_INDEX)?;

            let bytes = postcard::to_allocvec(user)
                .map_err(|e| StoreError::Encode(e.to_string()))?;
            users.insert(user.id.as_bytes().as_slice(), bytes.as_slice())?;
            emails.insert(user.email.as_str(), user.id.as_bytes().as_slice())?;
            if old_email != user.email {
                emails.remove(old_email)?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    // ── Tasks ──────────────────────────────────────────────────

    pub fn create_task(&self, task: &Task) -> Result<(), StoreError> {
        self.write_task(task)
    }

    pub fn update_task(&self, task: &Task) -> Result<(), StoreError> {
        self.write_task(task)
    }

    fn write_task(&self, task: &Task) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut tasks = txn.open_table(TASKS_TABLE)?;
            let bytes = postcard::to_allocvec(task)
                .map_err(|e| StoreError::Encode(e.to_string()))?;
            tasks.insert(task.id.as_bytes().as_slice(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let txn = self.db.begin_read()?;
        let tasks = txn.open_table(TASKS_TABLE)?;

        match tasks.get(id.as_bytes().as_slice())? {
            Some(data) => {
                let task = postcard::from_bytes(data.value())
                    .map_err(|e| StoreError::Decode(e.to_string()))?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    /// All tasks, newest first.
    pub fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(TASKS_TABLE)?;

        let mut tasks = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let task: Task = postcard::from_bytes(value.value())
                .map_err(|e| StoreError::Decode(e.to_string()))?;
            tasks.push(task);
        }

        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    /// Tasks where the user is creator or responsible, newest first.
    pub fn tasks_visible_to(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let mut tasks = self.list_tasks()?;
        tasks.retain(|t| t.is_visible_to(user_id));
        Ok(tasks)
    }

    pub fn delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        let txn = self.db.begin_write()?;
        let deleted;
        {
            let mut tasks = txn.open_table(TASKS_TABLE)?;
            deleted = tasks.remove(id.as_bytes().as_slice())?.is_some();
        }
        txn.commit()?;
        Ok(deleted)
    }
}

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug)]
pub enum StoreError {
    Redb(String),
    Decode(String),
    Encode(String),
}

// redb 2.x has many error types. Blanket them all into StoreError::Redb.
macro_rules! from_redb {
    ($($t:ty),*) => {
        $(impl From<$t> for StoreError {
            fn from(e: $t) -> Self { StoreError::Redb(e.to_string()) }
        })*
    };
}

from_redb!(
    redb::Error,
    redb::DatabaseError,
    redb::TableError,
    redb::TransactionError,
    redb::StorageError,
    redb::CommitError
);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Redb(e) => write!(f, "redb: {e}"),
            StoreError::Decode(e) => write!(f, "decode: {e}"),
            StoreError::Encode(e) => write!(f, "encode: {e}"),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

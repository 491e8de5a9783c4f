use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use roster_common::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::datetime::column_datetime;
use crate::lookup::Lookup;
use crate::migrations::{MigrationReport, MigrationRunner};

const EMPLOYEE_COLUMNS: &str = "id, first_name, last_name, created_at, updated_at";

/// A persisted employee row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            created_at: column_datetime(row, 3)?,
            updated_at: column_datetime(row, 4)?,
        })
    }
}

/// Payload for creating an employee. Missing fields deserialize as empty so
/// that `validate` can name them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
}

impl NewEmployee {
    /// Presence check for required fields, returning the client-facing message.
    pub fn validate(&self) -> std::result::Result<(), &'static str> {
        if self.first_name.is_empty() {
            return Err("first_name is required");
        }
        if self.last_name.is_empty() {
            return Err("last_name is required");
        }
        Ok(())
    }
}

/// Partial update. Absent or empty fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl EmployeePatch {
    fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref().filter(|s| !s.is_empty())
    }

    fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref().filter(|s| !s.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.first_name().is_none() && self.last_name().is_none()
    }
}

/// Employee data access used by the HTTP handlers.
pub trait EmployeeRepository: Send + Sync {
    fn create(&self, new: &NewEmployee) -> Result<Employee>;
    fn find(&self, id: i64) -> Lookup<Employee>;
    fn update(&self, id: i64, patch: &EmployeePatch) -> Lookup<Employee>;
    fn ping(&self) -> Result<()>;
}

/// Employee persistence over a single SQLite connection.
pub struct EmployeeStore {
    conn: Mutex<Connection>,
}

impl EmployeeStore {
    /// Open the database file and bring its schema up to date from
    /// `migrations_dir`.
    pub fn open(db_path: &Path, migrations_dir: &Path) -> Result<Self> {
        info!("opening employee store at {}", db_path.display());
        let conn = Connection::open(db_path)
            .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;
        Self::from_connection(conn, migrations_dir)
    }

    pub fn in_memory(migrations_dir: &Path) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("failed to open in-memory database: {e}")))?;
        Self::from_connection(conn, migrations_dir)
    }

    fn from_connection(conn: Connection, migrations_dir: &Path) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations(migrations_dir)?;
        Ok(store)
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Database("employee store lock poisoned".into()))
    }

    pub fn run_migrations(&self, migrations_dir: &Path) -> Result<MigrationReport> {
        let mut conn = self.connection()?;
        let report = MigrationRunner::new(&mut conn).run_migrations(migrations_dir)?;
        Ok(report)
    }

    fn find_with(conn: &Connection, id: i64) -> Lookup<Employee> {
        Lookup::from(
            conn.query_row(
                &format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?1"),
                params![id],
                Employee::from_row,
            )
            .optional()
            .map_err(|e| Error::Database(format!("failed to find employee: {e}"))),
        )
    }
}

impl EmployeeRepository for EmployeeStore {
    fn create(&self, new: &NewEmployee) -> Result<Employee> {
        let conn = self.connection()?;
        let employee = conn
            .query_row(
                &format!(
                    "INSERT INTO employees (first_name, last_name) VALUES (?1, ?2)
                     RETURNING {EMPLOYEE_COLUMNS}"
                ),
                params![new.first_name, new.last_name],
                Employee::from_row,
            )
            .map_err(|e| Error::Database(format!("failed to create employee: {e}")))?;
        Ok(employee)
    }

    fn find(&self, id: i64) -> Lookup<Employee> {
        let conn = match self.connection() {
            Ok(conn) => conn,
            Err(e) => return Lookup::Error(e),
        };
        Self::find_with(&conn, id)
    }

    /// Apply `patch` and return the stored row afterwards.
    fn update(&self, id: i64, patch: &EmployeePatch) -> Lookup<Employee> {
        let conn = match self.connection() {
            Ok(conn) => conn,
            Err(e) => return Lookup::Error(e),
        };
        if patch.is_empty() {
            return Self::find_with(&conn, id);
        }

        Lookup::from(
            conn.query_row(
                &format!(
                    "UPDATE employees
                     SET first_name = COALESCE(?2, first_name),
                         last_name = COALESCE(?3, last_name),
                         updated_at = datetime('now')
                     WHERE id = ?1
                     RETURNING {EMPLOYEE_COLUMNS}"
                ),
                params![id, patch.first_name(), patch.last_name()],
                Employee::from_row,
            )
            .optional()
            .map_err(|e| Error::Database(format!("failed to update employee: {e}"))),
        )
    }

    /// Round trip used by the health check.
    fn ping(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| Error::Database(format!("ping failed: {e}")))?;
        Ok(())
    }
}

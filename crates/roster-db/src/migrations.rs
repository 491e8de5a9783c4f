//! File-based SQL migration runner.
//!
//! Every `*.sql` file directly inside a source directory is a migration. Its
//! file name is its version, and lexical order of file names is the order in
//! which migrations are applied. Applied versions are tracked in the
//! `schema_migrations` table; each migration body and its bookkeeping row are
//! committed in one transaction.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::datetime::parse_datetime;
use crate::lookup::Lookup;

pub const MIGRATION_EXTENSION: &str = "sql";

const CREATE_MIGRATIONS_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_migrations (
    version VARCHAR(255) PRIMARY KEY,
    applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)";

/// A migration file discovered in the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub version: String,
    pub path: PathBuf,
}

/// Whether a discovered migration has been recorded.
///
/// `applied_at` is `None` when the stored value is NULL or not a timestamp
/// this crate understands; the row still counts as applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationState {
    Applied { applied_at: Option<DateTime<Utc>> },
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: String,
    pub state: MigrationState,
}

/// What a successful run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to create migrations table: {source}")]
    CreateTable { source: rusqlite::Error },

    #[error("failed to list migration files in {}: {source}", .path.display())]
    Discover {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to check whether migration {version} is applied: {source}")]
    Lookup {
        version: String,
        source: rusqlite::Error,
    },

    #[error("migration {version} is pending but sorts before already applied {recorded}")]
    OutOfOrder { version: String, recorded: String },

    #[error("failed to read migration {version}: {source}")]
    Read {
        version: String,
        source: std::io::Error,
    },

    #[error("failed to run migration {version}: {source}")]
    Execute {
        version: String,
        source: rusqlite::Error,
    },

    #[error("failed to record migration {version}: {source}")]
    Record {
        version: String,
        source: rusqlite::Error,
    },

    #[error("transaction for migration {version} failed: {source}")]
    Transaction {
        version: String,
        source: rusqlite::Error,
    },
}

impl MigrationError {
    /// The migration file involved, if the failure is tied to one.
    pub fn version(&self) -> Option<&str> {
        match self {
            MigrationError::CreateTable { .. } | MigrationError::Discover { .. } => None,
            MigrationError::Lookup { version, .. }
            | MigrationError::OutOfOrder { version, .. }
            | MigrationError::Read { version, .. }
            | MigrationError::Execute { version, .. }
            | MigrationError::Record { version, .. }
            | MigrationError::Transaction { version, .. } => Some(version),
        }
    }
}

impl From<MigrationError> for roster_common::Error {
    fn from(e: MigrationError) -> Self {
        roster_common::Error::Database(e.to_string())
    }
}

/// Applies pending migrations over a connection it borrows exclusively for
/// the duration of a run.
pub struct MigrationRunner<'c> {
    conn: &'c mut Connection,
}

impl<'c> MigrationRunner<'c> {
    pub fn new(conn: &'c mut Connection) -> Self {
        Self { conn }
    }

    /// Apply every pending migration in `source`, in lexical file name order.
    ///
    /// Stops at the first failure. Migrations applied before it stay
    /// committed; the failing one and everything after it stay unrecorded.
    pub fn run_migrations(&mut self, source: &Path) -> Result<MigrationReport, MigrationError> {
        self.create_migrations_table()?;
        let candidates = discover(source)?;
        let plan = self.plan(candidates)?;

        let mut report = MigrationReport::default();
        for (migration, recorded) in plan {
            if recorded {
                debug!("migration {} already applied, skipping", migration.version);
                report.skipped.push(migration.version);
                continue;
            }
            if let Err(e) = self.apply(&migration) {
                warn!("migration {} failed, halting run: {}", migration.version, e);
                return Err(e);
            }
            report.applied.push(migration.version);
        }

        if report.is_noop() {
            info!("database schema is up to date ({} migrations)", report.skipped.len());
        } else {
            info!("applied {} migration(s)", report.applied.len());
        }
        Ok(report)
    }

    /// Report applied/pending state of every migration in `source` without
    /// running any of them.
    pub fn status(&self, source: &Path) -> Result<Vec<MigrationStatus>, MigrationError> {
        self.create_migrations_table()?;
        let candidates = discover(source)?;

        let mut statuses = Vec::with_capacity(candidates.len());
        for migration in candidates {
            let state = match self.lookup_applied_at(&migration.version) {
                Lookup::Found(applied_at) => MigrationState::Applied { applied_at },
                Lookup::NotFound => MigrationState::Pending,
                Lookup::Error(source) => {
                    return Err(MigrationError::Lookup {
                        version: migration.version,
                        source,
                    });
                }
            };
            statuses.push(MigrationStatus {
                version: migration.version,
                state,
            });
        }
        Ok(statuses)
    }

    fn create_migrations_table(&self) -> Result<(), MigrationError> {
        self.conn
            .execute_batch(CREATE_MIGRATIONS_TABLE_SQL)
            .map_err(|source| MigrationError::CreateTable { source })
    }

    /// Pair each candidate with whether it is recorded, refusing any pending
    /// migration that sorts before one that is already applied.
    fn plan(
        &self,
        candidates: Vec<Migration>,
    ) -> Result<Vec<(Migration, bool)>, MigrationError> {
        let mut plan = Vec::with_capacity(candidates.len());
        let mut first_pending: Option<String> = None;

        for migration in candidates {
            let recorded = self.is_recorded(&migration.version)?;
            match (recorded, &first_pending) {
                (false, None) => {
                    first_pending = Some(migration.version.clone());
                }
                (true, Some(pending)) => {
                    return Err(MigrationError::OutOfOrder {
                        version: pending.clone(),
                        recorded: migration.version,
                    });
                }
                _ => {}
            }
            plan.push((migration, recorded));
        }
        Ok(plan)
    }

    fn is_recorded(&self, version: &str) -> Result<bool, MigrationError> {
        let lookup: Lookup<i64, rusqlite::Error> = self
            .conn
            .query_row(
                "SELECT 1 FROM schema_migrations WHERE version = ?1",
                params![version],
                |row| row.get(0),
            )
            .optional()
            .into();
        match lookup {
            Lookup::Found(_) => Ok(true),
            Lookup::NotFound => Ok(false),
            Lookup::Error(source) => Err(MigrationError::Lookup {
                version: version.to_string(),
                source,
            }),
        }
    }

    fn lookup_applied_at(&self, version: &str) -> Lookup<Option<DateTime<Utc>>, rusqlite::Error> {
        let raw: Lookup<Option<String>, rusqlite::Error> = self
            .conn
            .query_row(
                "SELECT CAST(applied_at AS TEXT) FROM schema_migrations WHERE version = ?1",
                params![version],
                |row| row.get(0),
            )
            .optional()
            .into();
        raw.map(|applied_at| applied_at.as_deref().and_then(parse_datetime))
    }

    fn apply(&mut self, migration: &Migration) -> Result<(), MigrationError> {
        let version = migration.version.as_str();
        let sql = std::fs::read_to_string(&migration.path).map_err(|source| {
            MigrationError::Read {
                version: version.to_string(),
                source,
            }
        })?;

        info!("applying migration {}", version);

        // Dropping the transaction without committing rolls it back.
        let tx = self
            .conn
            .transaction()
            .map_err(|source| MigrationError::Transaction {
                version: version.to_string(),
                source,
            })?;

        tx.execute_batch(&sql)
            .map_err(|source| MigrationError::Execute {
                version: version.to_string(),
                source,
            })?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            params![version],
        )
        .map_err(|source| MigrationError::Record {
            version: version.to_string(),
            source,
        })?;

        tx.commit().map_err(|source| MigrationError::Transaction {
            version: version.to_string(),
            source,
        })?;

        info!("migration {} applied", version);
        Ok(())
    }
}

/// List `*.sql` files directly inside `source`, sorted by file name.
pub fn discover(source: &Path) -> Result<Vec<Migration>, MigrationError> {
    let discover_err = |source_err| MigrationError::Discover {
        path: source.to_path_buf(),
        source: source_err,
    };

    let mut migrations = Vec::new();
    for entry in std::fs::read_dir(source).map_err(discover_err)? {
        let path = entry.map_err(discover_err)?.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some(MIGRATION_EXTENSION) {
            continue;
        }
        let Some(version) = path.file_name().and_then(|n| n.to_str()) else {
            warn!("skipping migration with non UTF-8 name: {}", path.display());
            continue;
        };
        migrations.push(Migration {
            version: version.to_string(),
            path,
        });
    }

    migrations.sort_by(|a, b| a.version.cmp(&b.version));
    debug!(
        "discovered {} migration(s) in {}",
        migrations.len(),
        source.display()
    );
    Ok(migrations)
}

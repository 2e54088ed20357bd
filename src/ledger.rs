use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_record::SubscriberRecord;

pub const LEDGER_HEADER: &str = "email,created_at\n";

/// Append-only subscriber file. One `"email",created_at` line per subscriber.
pub struct Ledger {
    path: PathBuf,
    // Serializes check-then-append within this process.
    write_lock: Mutex<()>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Insertion {
    Inserted,
    AlreadyPresent,
}

#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("Failed to create the subscriber ledger at {path}.")]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read the subscriber ledger at {path}.")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to append to the subscriber ledger at {path}.")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Ledger {
        Ledger {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file with only the header line. Calling it on an existing
    /// ledger leaves the file untouched.
    #[tracing::instrument(name = "Ensure the subscriber ledger exists", skip(self), fields(path = %self.path.display()))]
    pub async fn ensure_exists(&self) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|source| self.create_error(source))?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await;

        match file {
            Ok(mut file) => {
                file.write_all(LEDGER_HEADER.as_bytes())
                    .await
                    .map_err(|source| self.create_error(source))?;
                file.flush()
                    .await
                    .map_err(|source| self.create_error(source))?;
                tracing::info!("Created a new subscriber ledger");

                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(source) => Err(self.create_error(source)),
        }
    }

    /// Every stored email, unescaped, in file order. A missing ledger is empty.
    pub async fn emails(&self) -> Result<Vec<String>, LedgerError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(LedgerError::Read {
                    path: self.display_path(),
                    source,
                })
            }
        };

        let emails = content
            .lines()
            .skip(1)
            .filter(|line| !line.trim().is_empty())
            .map(parse_email_field)
            .collect();

        Ok(emails)
    }

    /// Linear scan; emails compare case-insensitively.
    #[tracing::instrument(name = "Scan the subscriber ledger", skip(self, email))]
    pub async fn contains(&self, email: &SubscriberEmail) -> Result<bool, LedgerError> {
        let wanted = email.normalized();
        let emails = self.emails().await?;

        Ok(emails
            .iter()
            .any(|stored| stored.to_lowercase() == wanted))
    }

    #[tracing::instrument(name = "Append a subscriber to the ledger", skip(self, record))]
    pub async fn append(&self, record: &SubscriberRecord) -> Result<(), LedgerError> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await
            .map_err(|source| self.write_error(source))?;

        file.write_all(record.to_line().as_bytes())
            .await
            .map_err(|source| self.write_error(source))?;
        file.flush()
            .await
            .map_err(|source| self.write_error(source))
    }

    /// `contains` followed by `append`, with no other insert from this
    /// process running in between.
    pub async fn insert_unique(&self, record: &SubscriberRecord) -> Result<Insertion, LedgerError> {
        let _guard = self.write_lock.lock().await;

        if self.contains(&record.email).await? {
            return Ok(Insertion::AlreadyPresent);
        }

        self.append(record).await?;

        Ok(Insertion::Inserted)
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    fn create_error(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Create {
            path: self.display_path(),
            source,
        }
    }

    fn write_error(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Write {
            path: self.display_path(),
            source,
        }
    }
}

// The email is whatever precedes the first comma, with the surrounding
// quotes removed and doubled quotes collapsed.
fn parse_email_field(line: &str) -> String {
    let field = line.split(',').next().unwrap_or_default();
    let field = field.strip_prefix('"').unwrap_or(field);
    let field = field.strip_suffix('"').unwrap_or(field);

    field.replace("\"\"", "\"").trim().to_string()
}

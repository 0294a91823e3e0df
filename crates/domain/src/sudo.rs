use bastion_core::{AppError, AppResult, NonEmptyString};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SudoId;

/// Named, reusable group of commands a role may run with elevated privilege.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sudo {
    id: SudoId,
    name: NonEmptyString,
    commands: Vec<String>,
    date_added: DateTime<Utc>,
    comment: String,
}

impl Sudo {
    /// Creates a sudo command group.
    ///
    /// Commands keep their order; each one is trimmed and must not be empty.
    pub fn new(
        id: SudoId,
        name: impl Into<String>,
        commands: Vec<String>,
        date_added: DateTime<Utc>,
        comment: impl Into<String>,
    ) -> AppResult<Self> {
        let commands = commands
            .into_iter()
            .enumerate()
            .map(|(position, command)| {
                let trimmed = command.trim();
                if trimmed.is_empty() {
                    return Err(AppError::Validation(format!(
                        "sudo command at position {position} must not be empty"
                    )));
                }
                Ok(trimmed.to_owned())
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            commands,
            date_added,
            comment: comment.into(),
        })
    }

    /// Returns the stable identifier.
    #[must_use]
    pub fn id(&self) -> SudoId {
        self.id
    }

    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the ordered command list.
    #[must_use]
    pub fn commands(&self) -> &[String] {
        self.commands.as_slice()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn date_added(&self) -> DateTime<Utc> {
        self.date_added
    }

    /// Returns the free-text comment.
    #[must_use]
    pub fn comment(&self) -> &str {
        self.comment.as_str()
    }
}

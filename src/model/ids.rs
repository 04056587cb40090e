// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

/// Upper bound on the byte length of a project id.
///
/// Store keys carry the id length as a `u32`; the bound keeps ids far below that and keeps keys
/// short.
pub const MAX_PROJECT_ID_LEN: usize = 256;

/// Identifier of a project and of its model record.
///
/// Freshly created projects get a random UUID v4, but any non-empty printable string up to
/// [`MAX_PROJECT_ID_LEN`] bytes is accepted so records written by older clients stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId {
    value: String,
}

impl ProjectId {
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        validate_project_id(&value)?;
        Ok(Self { value })
    }

    pub fn random() -> Self {
        Self {
            value: Uuid::new_v4().to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl AsRef<str> for ProjectId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for ProjectId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for ProjectId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_owned())
    }
}

impl TryFrom<String> for ProjectId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Serialize for ProjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de> Deserialize<'de> for ProjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("id must not be empty")]
    Empty,
    #[error("id must not exceed {max} bytes (got {len})")]
    TooLong { len: usize, max: usize },
    #[error("id must not contain control characters")]
    ContainsControl,
}

fn validate_project_id(value: &str) -> Result<(), IdError> {
    if value.is_empty() {
        return Err(IdError::Empty);
    }
    if value.len() > MAX_PROJECT_ID_LEN {
        return Err(IdError::TooLong {
            len: value.len(),
            max: MAX_PROJECT_ID_LEN,
        });
    }
    if value.chars().any(char::is_control) {
        return Err(IdError::ContainsControl);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{IdError, ProjectId, MAX_PROJECT_ID_LEN};

    #[test]
    fn id_rejects_empty() {
        assert_eq!(ProjectId::new(""), Err(IdError::Empty));
    }

    #[test]
    fn id_rejects_control_characters() {
        assert_eq!(ProjectId::new("a\nb"), Err(IdError::ContainsControl));
    }

    #[test]
    fn id_rejects_oversized_values() {
        let raw = "x".repeat(MAX_PROJECT_ID_LEN + 1);
        assert!(matches!(ProjectId::new(raw), Err(IdError::TooLong { .. })));
    }

    #[test]
    fn random_ids_are_distinct_uuids() {
        let a = ProjectId::random();
        let b = ProjectId::random();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn serde_round_trips_as_plain_string() {
        let id = ProjectId::new("p-1").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"p-1\"");
        let err = serde_json::from_str::<ProjectId>("\"\"").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}

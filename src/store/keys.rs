// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Key layout of the entity tables.
//!
//! A key is `[table tag: 1 byte][id length: u32 big-endian][id bytes]`. The tag keeps tables
//! apart and the length prefix makes the id boundary explicit, so no id can ever produce a key
//! inside another table's range.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    Project,
    WorkspaceIndex,
    Model,
}

impl Table {
    const ALL: [Self; 3] = [Self::Project, Self::WorkspaceIndex, Self::Model];

    pub fn tag(self) -> u8 {
        match self {
            Self::Project => 0x01,
            Self::WorkspaceIndex => 0x02,
            Self::Model => 0x03,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::WorkspaceIndex => "workspace index",
            Self::Model => "model",
        }
    }

    /// Prefix covering every key of this table.
    pub fn prefix(self) -> [u8; 1] {
        [self.tag()]
    }

    fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|table| table.tag() == tag)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Encodes the key of `id` in `table`.
///
/// Ids longer than `u32::MAX` bytes are not representable; `ProjectId` bounds ids far below that.
pub fn encode_key(table: Table, id: &str) -> Vec<u8> {
    let len = u32::try_from(id.len()).unwrap_or(u32::MAX);
    let mut key = Vec::with_capacity(1 + 4 + id.len());
    key.push(table.tag());
    key.extend_from_slice(&len.to_be_bytes());
    key.extend_from_slice(&id.as_bytes()[..len as usize]);
    key
}

/// Key of the single workspace index record.
pub fn workspace_index_key() -> Vec<u8> {
    encode_key(Table::WorkspaceIndex, "")
}

/// Splits a key back into its table and id. Returns `None` for keys this layout did not write.
pub fn decode_key(key: &[u8]) -> Option<(Table, String)> {
    let (&tag, rest) = key.split_first()?;
    let table = Table::from_tag(tag)?;
    let len_bytes: [u8; 4] = rest.get(..4)?.try_into().ok()?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    let id = rest.get(4..)?;
    if id.len() != len {
        return None;
    }
    let id = std::str::from_utf8(id).ok()?;
    Some((table, id.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::{decode_key, encode_key, workspace_index_key, Table};

    #[test]
    fn keys_round_trip() {
        let key = encode_key(Table::Model, "abc-123");
        assert_eq!(decode_key(&key), Some((Table::Model, "abc-123".to_owned())));
        assert_eq!(decode_key(&workspace_index_key()), Some((Table::WorkspaceIndex, String::new())));
    }

    #[test]
    fn ids_that_look_like_prefixes_stay_in_their_table() {
        // The tag byte alone decides the table, whatever bytes the id carries.
        let hostile = String::from_utf8(vec![Table::Model.tag(), 0, 0, 0, 1, b'x']).unwrap();
        let key = encode_key(Table::Project, &hostile);
        assert!(key.starts_with(&Table::Project.prefix()));
        assert!(!key.starts_with(&Table::Model.prefix()));
        assert_eq!(decode_key(&key), Some((Table::Project, hostile)));
    }

    #[test]
    fn length_prefix_separates_ids_sharing_a_prefix() {
        let short = encode_key(Table::Project, "ab");
        let long = encode_key(Table::Project, "abc");
        assert!(!long.starts_with(&short));
    }

    #[test]
    fn foreign_keys_do_not_decode() {
        assert_eq!(decode_key(b""), None);
        assert_eq!(decode_key(b"proj_123"), None);
        assert_eq!(decode_key(&[Table::Project.tag(), 0, 0, 0, 9, b'a']), None);
    }
}

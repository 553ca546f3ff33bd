//! Per-session block names and GUIDs

use std::collections::HashMap;

use crate::error::{CssBlocksError, Result};

const GUID_LENGTH: usize = 5;

/// Hands out block names and GUIDs that are unique within one factory
#[derive(Debug, Default)]
pub struct NameRegistry {
    /// Block name to the identifier that owns it
    names: HashMap<String, String>,
    guids: HashMap<String, String>,
    rename_duplicates: bool,
}

impl NameRegistry {
    pub fn new(rename_duplicates: bool) -> Self {
        Self { rename_duplicates, ..Self::default() }
    }

    /// Reserve `name` for `identifier`, suffixing `-2`, `-3`, ... when
    /// another block already uses it
    pub fn unique_block_name(&mut self, name: &str, identifier: &str) -> Result<String> {
        match self.names.get(name) {
            None => {
                self.names.insert(name.to_string(), identifier.to_string());
                return Ok(name.to_string());
            }
            Some(owner) if owner == identifier => return Ok(name.to_string()),
            Some(owner) if !self.rename_duplicates => {
                return Err(CssBlocksError::DuplicateName {
                    message: format!(
                        "Block name `{}` is used by both `{}` and `{}`",
                        name, owner, identifier
                    ),
                });
            }
            Some(_) => {}
        }

        let mut suffix = 2;
        loop {
            let candidate = format!("{}-{}", name, suffix);
            match self.names.get(&candidate) {
                None => {
                    self.names.insert(candidate.clone(), identifier.to_string());
                    return Ok(candidate);
                }
                Some(owner) if owner == identifier => return Ok(candidate),
                Some(_) => suffix += 1,
            }
        }
    }

    /// GUID for a block. A collision is rehashed to a fresh GUID and
    /// reported alongside it.
    pub fn register_guid(&mut self, identifier: &str) -> (String, Option<CssBlocksError>) {
        let mut guid = guid_for(identifier);
        let mut collision = None;
        while let Some(owner) = self.guids.get(&guid) {
            if owner == identifier {
                return (guid, collision);
            }
            if collision.is_none() {
                collision = Some(CssBlocksError::DuplicateGuid {
                    message: format!(
                        "GUID `{}` of `{}` collides with `{}`",
                        guid, identifier, owner
                    ),
                });
            }
            guid = guid_for(&format!("{}{}", identifier, guid));
        }
        self.guids.insert(guid.clone(), identifier.to_string());
        (guid, collision)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// FNV-1a hash of `text` in base 36, truncated
fn guid_for(text: &str) -> String {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for byte in text.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(PRIME);
    }

    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::with_capacity(GUID_LENGTH);
    while out.len() < GUID_LENGTH {
        out.push(DIGITS[(hash % 36) as usize]);
        hash /= 36;
    }
    out.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_block_name_suffixes() {
        let mut registry = NameRegistry::new(true);
        assert_eq!(registry.unique_block_name("x", "id1").unwrap(), "x");
        assert_eq!(registry.unique_block_name("x", "id2").unwrap(), "x-2");
        assert_eq!(registry.unique_block_name("x", "id3").unwrap(), "x-3");
        assert_eq!(registry.unique_block_name("x", "id2").unwrap(), "x-2");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_duplicate_name_without_renaming() {
        let mut registry = NameRegistry::new(false);
        registry.unique_block_name("x", "id1").unwrap();
        let err = registry.unique_block_name("x", "id2").unwrap_err();
        assert!(matches!(err, CssBlocksError::DuplicateName { .. }));
    }

    #[test]
    fn test_guid_is_stable() {
        let mut registry = NameRegistry::new(true);
        let (a, collision) = registry.register_guid("a.css");
        assert!(collision.is_none());
        assert_eq!(a.len(), GUID_LENGTH);
        assert_eq!(registry.register_guid("a.css").0, a);
        assert_ne!(registry.register_guid("b.css").0, a);
    }

    #[test]
    fn test_guid_collision_is_rehashed() {
        let mut registry = NameRegistry::new(true);
        let (guid, _) = registry.register_guid("a.css");
        registry.guids.insert(guid_for("b.css"), "other".to_string());
        let (rehashed, collision) = registry.register_guid("b.css");
        assert!(matches!(collision, Some(CssBlocksError::DuplicateGuid { .. })));
        assert_ne!(rehashed, guid_for("b.css"));
    }
}

use overwatch_shared::error::StorageError;
use overwatch_shared::models::EntityKind;
use overwatch_shared::store::CollectionStorage;

use crate::api;

/// Collection kind stored under `key`, if it is one of ours.
pub fn kind_for_key(prefix: &str, key: &str) -> Option<EntityKind> {
    EntityKind::ALL
        .into_iter()
        .find(|kind| kind.storage_key(prefix) == key)
}

/// `localStorage`-backed collections. Saves are mirrored to the server
/// when `mirror` is set.
pub struct BrowserStorage {
    prefix: String,
    mirror: bool,
}

impl BrowserStorage {
    pub fn new(prefix: impl Into<String>, mirror: bool) -> Self {
        Self {
            prefix: prefix.into(),
            mirror,
        }
    }

    fn local_storage() -> Result<web_sys::Storage, StorageError> {
        web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window".into()))?
            .local_storage()
            .map_err(|_| StorageError::Unavailable("localStorage access denied".into()))?
            .ok_or_else(|| StorageError::Unavailable("localStorage missing".into()))
    }
}

impl CollectionStorage for BrowserStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Self::local_storage()?
            .get_item(key)
            .map_err(|_| StorageError::Backend(format!("failed to read {key}")))
    }

    fn save(&self, key: &str, payload: &str) -> Result<(), StorageError> {
        Self::local_storage()?
            .set_item(key, payload)
            .map_err(|_| StorageError::Backend(format!("failed to write {key}")))?;

        if self.mirror {
            if let Some(kind) = kind_for_key(&self.prefix, key) {
                api::save_collection_fire(kind, payload.to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_for_key_matches_each_collection() {
        for kind in EntityKind::ALL {
            let key = kind.storage_key("tactical");
            assert_eq!(kind_for_key("tactical", &key), Some(kind));
        }
    }

    #[test]
    fn test_kind_for_key_ignores_other_prefixes() {
        let key = EntityKind::Target.storage_key("exercise");
        assert_eq!(kind_for_key("tactical", &key), None);
        assert_eq!(kind_for_key("tactical", "theme"), None);
    }
}

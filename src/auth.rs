//! API key gate
//!
//! Every API request presents `X-API-Key`; the key is looked up in an in-memory
//! cache loaded from the users table. User creation inserts the new key right away,
//! so it is usable without a restart.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::store::{StoreResult, User, UserRepository};

/// Request header carrying the key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Map of API key to user id
#[derive(Debug, Default)]
pub struct KeyCache {
    keys: RwLock<HashMap<String, String>>,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the cache from every stored user
    pub fn load(users: &UserRepository) -> StoreResult<Self> {
        let cache = Self::new();
        cache.insert_all(&users.list()?);
        Ok(cache)
    }

    pub fn insert(&self, user: &User) {
        self.insert_all(std::slice::from_ref(user));
    }

    pub fn insert_all(&self, users: &[User]) {
        let mut keys = self.keys.write().expect("KeyCache lock poisoned");
        for user in users {
            keys.insert(user.key.clone(), user.id.clone());
        }
    }

    /// User id owning `key`
    pub fn identify(&self, key: &str) -> Option<String> {
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        self.keys
            .read()
            .expect("KeyCache lock poisoned")
            .get(key)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.keys.read().expect("KeyCache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AssetStore, NewUser};

    #[test]
    fn test_load_and_identify() {
        let store = AssetStore::in_memory().unwrap();
        let admin = store.users().ensure_admin().unwrap();

        let cache = KeyCache::load(&store.users()).unwrap();
        assert_eq!(cache.identify(&admin.key).as_deref(), Some("admin"));
        assert_eq!(cache.identify(""), None);
        assert_eq!(cache.identify("not-a-key"), None);
    }

    #[test]
    fn test_new_user_is_recognized_immediately() {
        let store = AssetStore::in_memory().unwrap();
        let cache = KeyCache::load(&store.users()).unwrap();
        assert!(cache.is_empty());

        let users = store.users().create_batch(vec![NewUser::new("hakluke")]).unwrap();
        cache.insert_all(&users);
        assert_eq!(cache.identify(&users[0].key).as_deref(), Some("hakluke"));
    }
}

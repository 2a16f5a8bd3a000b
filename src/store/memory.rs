use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::{PreferenceStore, StoreChange};
use crate::directive::{Directive, PrefValue, Scope};
use crate::error::PrefError;

type Slot = (Scope, String, String);

/// In-process [`PreferenceStore`] keyed by `(scope, domain, key)`.
///
/// Can be told to refuse a scope or reject particular keys, which makes it
/// usable for previews and for exercising failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<Slot, PrefValue>>,
    denied_scopes: HashSet<Scope>,
    rejected_keys: HashSet<String>,
    unavailable_domains: HashSet<String>,
}

impl MemoryStore {
    /// An empty store accepting everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every operation in `scope` with permission denied.
    #[must_use]
    pub fn deny_scope(mut self, scope: Scope) -> Self {
        self.denied_scopes.insert(scope);
        self
    }

    /// Reject writes and deletes of `key` in any domain.
    #[must_use]
    pub fn reject_key(mut self, key: &str) -> Self {
        self.rejected_keys.insert(key.to_string());
        self
    }

    /// Report `domain` as unreachable.
    #[must_use]
    pub fn unavailable_domain(mut self, domain: &str) -> Self {
        self.unavailable_domains.insert(domain.to_string());
        self
    }

    /// Pre-populate a value.
    #[must_use]
    pub fn with_value(self, scope: Scope, domain: &str, key: &str, value: PrefValue) -> Self {
        if let Ok(mut values) = self.values.lock() {
            values.insert((scope, domain.to_string(), key.to_string()), value);
        }
        self
    }

    /// Current value of a user-scope key.
    #[must_use]
    pub fn get(&self, domain: &str, key: &str) -> Option<PrefValue> {
        self.get_scoped(Scope::CurrentUser, domain, key)
    }

    /// Current value of a key in the given scope.
    #[must_use]
    pub fn get_scoped(&self, scope: Scope, domain: &str, key: &str) -> Option<PrefValue> {
        self.values
            .lock()
            .ok()?
            .get(&(scope, domain.to_string(), key.to_string()))
            .cloned()
    }

    /// Number of keys stored across all scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.lock().map_or(0, |v| v.len())
    }

    /// Whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self, directive: &Directive) -> Result<(), PrefError> {
        let target = directive.target();
        if self.denied_scopes.contains(&directive.scope) {
            return Err(PrefError::PermissionDenied {
                target,
                reason: format!("{} scope is not writable", directive.scope),
            });
        }
        if self.unavailable_domains.contains(&directive.domain) {
            return Err(PrefError::StoreUnavailable {
                target,
                reason: "domain unavailable".to_string(),
            });
        }
        if self.rejected_keys.contains(&directive.key) {
            return Err(PrefError::KeyRejected {
                target,
                reason: "key rejected".to_string(),
            });
        }
        Ok(())
    }

    fn slot(directive: &Directive) -> Slot {
        (
            directive.scope,
            directive.domain.clone(),
            directive.key.clone(),
        )
    }

    fn poisoned(directive: &Directive) -> PrefError {
        PrefError::StoreUnavailable {
            target: directive.target(),
            reason: "store lock poisoned".to_string(),
        }
    }
}

impl PreferenceStore for MemoryStore {
    fn write(&self, directive: &Directive, value: &PrefValue) -> Result<StoreChange, PrefError> {
        self.check(directive)?;
        let mut values = self.values.lock().map_err(|_| Self::poisoned(directive))?;
        values.insert(Self::slot(directive), value.clone());
        Ok(StoreChange::Written)
    }

    fn delete(&self, directive: &Directive) -> Result<StoreChange, PrefError> {
        self.check(directive)?;
        let mut values = self.values.lock().map_err(|_| Self::poisoned(directive))?;
        Ok(match values.remove(&Self::slot(directive)) {
            Some(_) => StoreChange::Deleted,
            None => StoreChange::AlreadyAbsent,
        })
    }
}

/// Ordered mapping from credential identifier to encrypted value.
///
/// Identifiers are unique. Insertion order is kept across read/modify/write
/// cycles so the persisted file diffs cleanly; overwriting an identifier keeps
/// its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSet {
    entries: Vec<(String, String)>,
}

impl CredentialSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.position(identifier).is_some()
    }

    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.position(identifier)
            .map(|idx| self.entries[idx].1.as_str())
    }

    /// Set `identifier` to `value`, returning the value it replaced.
    pub fn set(
        &mut self,
        identifier: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        let identifier = identifier.into();
        let value = value.into();
        match self.position(&identifier) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx].1, value)),
            None => {
                self.entries.push((identifier, value));
                None
            }
        }
    }

    /// Remove `identifier`, returning its value. Remaining entries keep their order.
    pub fn remove(&mut self, identifier: &str) -> Option<String> {
        self.position(identifier).map(|idx| self.entries.remove(idx).1)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(id, value)| (id.as_str(), value.as_str()))
    }

    fn position(&self, identifier: &str) -> Option<usize> {
        self.entries.iter().position(|(id, _)| id == identifier)
    }
}

/// Later duplicates overwrite earlier ones in place.
impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CredentialSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = CredentialSet::new();
        for (identifier, value) in iter {
            set.set(identifier, value);
        }
        set
    }
}

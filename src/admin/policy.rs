//! Who may run privileged admin commands.

use std::collections::HashSet;

use arc_swap::ArcSwap;

/// Decides whether a caller identity is privileged.
///
/// The identity is whatever the transport vouches for (a bot user id, a role
/// name, ...); the channel never interprets it.
pub trait PrivilegePolicy: Send + Sync {
    fn is_privileged(&self, identity: &str) -> bool;
}

/// A configured set of admin identities, swappable on config reload.
#[derive(Debug)]
pub struct AdminIdentities {
    ids: ArcSwap<HashSet<String>>,
}

impl AdminIdentities {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ArcSwap::from_pointee(normalize(ids)),
        }
    }

    /// Replace the identity set.
    pub fn replace<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids.store(std::sync::Arc::new(normalize(ids)));
    }

    pub fn len(&self) -> usize {
        self.ids.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PrivilegePolicy for AdminIdentities {
    fn is_privileged(&self, identity: &str) -> bool {
        let identity = identity.trim();
        !identity.is_empty() && self.ids.load().contains(identity)
    }
}

fn normalize<I, S>(ids: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ids.into_iter()
        .map(|id| id.into().trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_matching() {
        let ids = AdminIdentities::new(["7120352215", " ops "]);
        assert!(ids.is_privileged("7120352215"));
        assert!(ids.is_privileged("ops"));
        assert!(!ids.is_privileged("712035221"));
        assert!(!ids.is_privileged(""));
    }

    #[test]
    fn test_replace() {
        let ids = AdminIdentities::new(["a"]);
        ids.replace(vec!["b".to_string()]);
        assert!(!ids.is_privileged("a"));
        assert!(ids.is_privileged("b"));
        assert_eq!(ids.len(), 1);
    }
}

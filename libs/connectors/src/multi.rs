//! Policy-routed connector that fans a single logical store out across
//! multiple named child connectors (spec §4.4). Grounded on the reference
//! `connectors/multi.py`'s `Policy`/`MultiConnector` pair, extended with a
//! `host_pattern`-driven dormancy check that the reference implementation
//! does not have: a child can be marked unreachable from the current host
//! without being removed from the routing table, which is distinct from
//! simply having no matching policy.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::connector::{Connector, ConnectorConfig};
use crate::error::{ConnectorError, ConnectorResult};
use crate::key::{Key, MultiKey};

/// Per-child routing constraints. Every `Option` field is independently
/// optional: `None` means "unconstrained on this axis," not "excluded."
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Policy {
    /// Higher priority children are tried first among those whose
    /// constraints are satisfied.
    pub priority: i32,
    pub min_size_bytes: Option<usize>,
    pub max_size_bytes: Option<usize>,
    pub subset_tags: Vec<String>,
    pub superset_tags: Vec<String>,
    /// Regex matched against the local hostname. When set and the pattern
    /// does not match this host, the child is dormant: reachable for
    /// `get`/`exists`/`evict` (its existing data must remain visible) but
    /// never selected as a `put` destination.
    pub host_pattern: Option<String>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            priority: 0,
            min_size_bytes: None,
            max_size_bytes: None,
            subset_tags: Vec::new(),
            superset_tags: Vec::new(),
            host_pattern: None,
        }
    }
}

impl Policy {
    /// Whether this policy accepts an object of `size_bytes` carrying
    /// `tags`. Mirrors the reference `Policy.is_valid`: subset_tags means
    /// every object tag must be drawn from this set; superset_tags means
    /// this policy's tags must all be present on the object.
    pub fn is_valid(&self, size_bytes: usize, tags: &[String]) -> bool {
        if let Some(min) = self.min_size_bytes {
            if size_bytes < min {
                return false;
            }
        }
        if let Some(max) = self.max_size_bytes {
            if size_bytes > max {
                return false;
            }
        }
        if !self.subset_tags.is_empty() && !tags.iter().all(|t| self.subset_tags.contains(t)) {
            return false;
        }
        if !self.superset_tags.is_empty()
            && !self.superset_tags.iter().all(|t| tags.contains(t))
        {
            return false;
        }
        true
    }

    fn is_dormant_on(&self, hostname: &str) -> ConnectorResult<bool> {
        match &self.host_pattern {
            None => Ok(false),
            Some(pattern) => {
                let re = Regex::new(pattern).map_err(|e| ConnectorError::Configuration {
                    connector: "multi",
                    message: format!("invalid host_pattern '{pattern}': {e}"),
                })?;
                Ok(!re.is_match(hostname))
            }
        }
    }
}

struct Child {
    name: String,
    connector: Box<dyn Connector>,
    policy: Policy,
}

impl std::fmt::Debug for Child {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Child")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish()
    }
}

#[derive(Debug)]
pub struct MultiConnector {
    children: Vec<Child>,
    hostname: String,
}

impl MultiConnector {
    pub fn new(children: Vec<(String, Box<dyn Connector>, Policy)>) -> ConnectorResult<Self> {
        let hostname = hostname::get()
            .map_err(|e| ConnectorError::Configuration {
                connector: "multi",
                message: format!("failed to determine local hostname: {e}"),
            })?
            .to_string_lossy()
            .into_owned();
        let mut children: Vec<Child> = children
            .into_iter()
            .map(|(name, connector, policy)| Child {
                name,
                connector,
                policy,
            })
            .collect();
        children.sort_by(|a, b| b.policy.priority.cmp(&a.policy.priority));
        Ok(Self { children, hostname })
    }

    fn child_by_name(&self, name: &str) -> Option<&Child> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Select the highest-priority, non-dormant child whose policy accepts
    /// an object of `size_bytes` carrying `tags`.
    pub fn select_for_put(&self, size_bytes: usize, tags: &[String]) -> ConnectorResult<&str> {
        for child in &self.children {
            if !child.policy.is_valid(size_bytes, tags) {
                continue;
            }
            if child.policy.is_dormant_on(&self.hostname)? {
                continue;
            }
            return Ok(child.name.as_str());
        }
        Err(ConnectorError::NoSuitableChild)
    }
}

impl Connector for MultiConnector {
    fn put(&self, obj: &[u8]) -> ConnectorResult<Key> {
        let name = self.select_for_put(obj.len(), &[])?;
        let child = self.child_by_name(name).expect("selected child must exist");
        let connector_key = child.connector.put(obj)?;
        Ok(Key::Multi(MultiKey {
            connector_name: child.name.clone(),
            connector_key: Box::new(connector_key),
        }))
    }

    fn get(&self, key: &Key) -> ConnectorResult<Option<Vec<u8>>> {
        let Key::Multi(mkey) = key else {
            return Ok(None);
        };
        let child = self.child_by_name(&mkey.connector_name).ok_or_else(|| {
            ConnectorError::Configuration {
                connector: "multi",
                message: format!("unknown child connector '{}'", mkey.connector_name),
            }
        })?;
        if child.policy.is_dormant_on(&self.hostname)? {
            return Err(ConnectorError::Dormant {
                child: child.name.clone(),
                key: key.clone(),
            });
        }
        child.connector.get(&mkey.connector_key)
    }

    fn exists(&self, key: &Key) -> ConnectorResult<bool> {
        let Key::Multi(mkey) = key else {
            return Ok(false);
        };
        let Some(child) = self.child_by_name(&mkey.connector_name) else {
            return Ok(false);
        };
        if child.policy.is_dormant_on(&self.hostname)? {
            return Err(ConnectorError::Dormant {
                child: child.name.clone(),
                key: key.clone(),
            });
        }
        child.connector.exists(&mkey.connector_key)
    }

    fn evict(&self, key: &Key) -> ConnectorResult<()> {
        let Key::Multi(mkey) = key else {
            return Ok(());
        };
        let Some(child) = self.child_by_name(&mkey.connector_name) else {
            return Ok(());
        };
        if child.policy.is_dormant_on(&self.hostname)? {
            return Err(ConnectorError::Dormant {
                child: child.name.clone(),
                key: key.clone(),
            });
        }
        child.connector.evict(&mkey.connector_key)
    }

    fn close(&self) -> ConnectorResult<()> {
        for child in &self.children {
            child.connector.close()?;
        }
        Ok(())
    }

    fn config(&self) -> ConnectorConfig {
        #[derive(Serialize)]
        struct ChildConfig {
            name: String,
            connector: ConnectorConfig,
            policy: Policy,
        }
        let children: Vec<ChildConfig> = self
            .children
            .iter()
            .map(|c| ChildConfig {
                name: c.name.clone(),
                connector: c.connector.config(),
                policy: c.policy.clone(),
            })
            .collect();
        ConnectorConfig {
            kind: "multi".to_string(),
            options: serde_json::to_value(children).unwrap(),
        }
    }

    fn kind_name(&self) -> &'static str {
        "multi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalConnector;

    fn named(name: &str, policy: Policy) -> (String, Box<dyn Connector>, Policy) {
        (name.to_string(), Box::new(LocalConnector::new()), policy)
    }

    #[test]
    fn routes_by_priority() {
        let m = MultiConnector::new(vec![
            named("low", Policy { priority: 1, ..Default::default() }),
            named("high", Policy { priority: 10, ..Default::default() }),
        ])
        .unwrap();
        assert_eq!(m.select_for_put(10, &[]).unwrap(), "high");
    }

    #[test]
    fn respects_size_window() {
        let m = MultiConnector::new(vec![
            named(
                "small",
                Policy {
                    priority: 10,
                    max_size_bytes: Some(100),
                    ..Default::default()
                },
            ),
            named(
                "big",
                Policy {
                    priority: 1,
                    min_size_bytes: Some(101),
                    ..Default::default()
                },
            ),
        ])
        .unwrap();
        assert_eq!(m.select_for_put(50, &[]).unwrap(), "small");
        assert_eq!(m.select_for_put(500, &[]).unwrap(), "big");
    }

    #[test]
    fn no_suitable_child_is_distinct_from_missing_key() {
        let m = MultiConnector::new(vec![named(
            "tight",
            Policy {
                priority: 1,
                max_size_bytes: Some(10),
                ..Default::default()
            },
        )])
        .unwrap();
        let err = m.select_for_put(1000, &[]).unwrap_err();
        assert!(matches!(err, ConnectorError::NoSuitableChild));
    }

    #[test]
    fn dormant_child_is_skipped_for_put_but_not_removed() {
        let m = MultiConnector::new(vec![
            named(
                "unreachable",
                Policy {
                    priority: 10,
                    host_pattern: Some("^this-host-will-never-match$".to_string()),
                    ..Default::default()
                },
            ),
            named("fallback", Policy { priority: 1, ..Default::default() }),
        ])
        .unwrap();
        assert_eq!(m.select_for_put(10, &[]).unwrap(), "fallback");
        assert!(m.child_by_name("unreachable").is_some());
    }

    #[test]
    fn get_against_a_dormant_child_is_dormant_not_missing() {
        let m = MultiConnector::new(vec![named("small", Policy::default())]).unwrap();
        let key = m.put(b"payload").unwrap();

        // Rebuild the same logical child under a policy that is dormant on
        // this host, keeping the same connector_name so the key still
        // routes to it (spec §4.5, scenario S5).
        let m = MultiConnector::new(vec![named(
            "small",
            Policy {
                host_pattern: Some("^this-host-will-never-match$".to_string()),
                ..Default::default()
            },
        )])
        .unwrap();

        let err = m.get(&key).unwrap_err();
        assert!(matches!(err, ConnectorError::Dormant { .. }));
        let err = m.exists(&key).unwrap_err();
        assert!(matches!(err, ConnectorError::Dormant { .. }));
    }

    #[test]
    fn put_get_evict_round_trip_through_multi_key() {
        let m = MultiConnector::new(vec![named("only", Policy::default())]).unwrap();
        let k = m.put(b"payload").unwrap();
        assert_eq!(m.get(&k).unwrap(), Some(b"payload".to_vec()));
        m.evict(&k).unwrap();
        assert_eq!(m.get(&k).unwrap(), None);
    }
}

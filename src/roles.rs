//! Bitmask role catalogue.
//!
//! An identity's roles are a 64-bit mask: each configurable role occupies one
//! bit position 0..=62, named from configuration at startup. Two sentinels
//! exist outside the configurable range: `guest` (mask 0, matches nothing)
//! and `root` (all bits set, matches everything).

use std::collections::{BTreeSet, HashMap};

pub const GUEST_VALUE: u64 = 0;
pub const ROOT_VALUE: u64 = u64::MAX;

/// Number of configurable single-bit slots (bit positions 0..=62).
pub const CONFIGURABLE_SLOTS: usize = 63;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: String,
    pub value: u64,
}

/// Role lookup tables, built once at startup from the ordered list of
/// configured role names and passed by handle to every consumer.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    /// Configured name per bit position; `None` for unconfigured slots.
    slots: Vec<Option<String>>,
    by_name: HashMap<String, Role>,
}

impl RoleRegistry {
    /// Builds the registry from the ordered role-name list. Names beyond the
    /// 63 configurable slots are ignored with a warning.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        if names.len() > CONFIGURABLE_SLOTS {
            tracing::warn!(
                configured = names.len(),
                max = CONFIGURABLE_SLOTS,
                "more role names configured than available bit positions; extra names ignored"
            );
        }

        let mut slots: Vec<Option<String>> = vec![None; CONFIGURABLE_SLOTS];
        let mut by_name = HashMap::new();

        for (bit, name) in names.iter().take(CONFIGURABLE_SLOTS).enumerate() {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            let role = Role {
                id: name.to_string(),
                value: 1u64 << bit,
            };
            slots[bit] = Some(role.id.clone());
            by_name.insert(name.to_lowercase(), role);
        }

        by_name.insert(
            "guest".to_string(),
            Role { id: "guest".to_string(), value: GUEST_VALUE },
        );
        by_name.insert(
            "root".to_string(),
            Role { id: "root".to_string(), value: ROOT_VALUE },
        );

        Self { slots, by_name }
    }

    /// Expands a bitmask into the set of configured role names. Unconfigured
    /// bit positions are silently skipped; the sentinels are never emitted,
    /// so the guest mask yields the empty set and the root mask yields every
    /// configured name.
    pub fn roles_from_bitmask(&self, mask: u64) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for (bit, slot) in self.slots.iter().enumerate() {
            if let Some(name) = slot {
                if mask & (1u64 << bit) != 0 {
                    out.insert(name.clone());
                }
            }
        }
        out
    }

    /// Case-insensitive lookup by role name; resolves the sentinels too.
    pub fn role_by_name(&self, name: &str) -> Option<&Role> {
        self.by_name.get(&name.to_lowercase())
    }
}

//! Collection access rules.

use serde::Serialize;

/// One of the five rule slots of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleSlot {
    /// Listing records.
    List,
    /// Viewing a single record.
    View,
    /// Creating records.
    Create,
    /// Updating records.
    Update,
    /// Deleting records.
    Delete,
}

impl RuleSlot {
    /// All slots in canonical order.
    pub const ALL: [RuleSlot; 5] = [
        RuleSlot::List,
        RuleSlot::View,
        RuleSlot::Create,
        RuleSlot::Update,
        RuleSlot::Delete,
    ];

    /// Slot name as used in summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleSlot::List => "list",
            RuleSlot::View => "view",
            RuleSlot::Create => "create",
            RuleSlot::Update => "update",
            RuleSlot::Delete => "delete",
        }
    }
}

impl std::fmt::Display for RuleSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access predicates for a collection.
///
/// `None` means the slot is unset and must be left as the backend has it; it
/// never means "deny".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Rules {
    /// List rule.
    pub list: Option<String>,
    /// View rule.
    pub view: Option<String>,
    /// Create rule.
    pub create: Option<String>,
    /// Update rule.
    pub update: Option<String>,
    /// Delete rule.
    pub delete: Option<String>,
}

impl Rules {
    /// Rules with every slot unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a slot.
    pub fn with(mut self, slot: RuleSlot, predicate: impl Into<String>) -> Self {
        *self.slot_mut(slot) = Some(predicate.into());
        self
    }

    /// Read a slot.
    pub fn get(&self, slot: RuleSlot) -> Option<&str> {
        match slot {
            RuleSlot::List => self.list.as_deref(),
            RuleSlot::View => self.view.as_deref(),
            RuleSlot::Create => self.create.as_deref(),
            RuleSlot::Update => self.update.as_deref(),
            RuleSlot::Delete => self.delete.as_deref(),
        }
    }

    fn slot_mut(&mut self, slot: RuleSlot) -> &mut Option<String> {
        match slot {
            RuleSlot::List => &mut self.list,
            RuleSlot::View => &mut self.view,
            RuleSlot::Create => &mut self.create,
            RuleSlot::Update => &mut self.update,
            RuleSlot::Delete => &mut self.delete,
        }
    }

    /// Check if no slot is set.
    pub fn is_unset(&self) -> bool {
        RuleSlot::ALL.iter().all(|slot| self.get(*slot).is_none())
    }

    /// Slots this (desired) rule set specifies with a value the current set
    /// does not have.
    pub fn differing_slots(&self, current: &Rules) -> Vec<RuleSlot> {
        RuleSlot::ALL
            .into_iter()
            .filter(|slot| match self.get(*slot) {
                Some(desired) => current.get(*slot) != Some(desired),
                None => false,
            })
            .collect()
    }

    /// Overwrite the slots of `target` that this rule set specifies.
    pub fn merge_into(&self, target: &mut Rules) {
        for slot in RuleSlot::ALL {
            if let Some(predicate) = self.get(slot) {
                *target.slot_mut(slot) = Some(predicate.to_string());
            }
        }
    }
}

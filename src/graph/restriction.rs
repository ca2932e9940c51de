//! Turn restrictions resolved against the joints of one graph.

use std::collections::hash_map::Entry;

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::codec::{FeatureId, Restriction, RestrictionKind};
use crate::graph::JointId;

#[derive(Debug, Clone, PartialEq, Eq)]
enum TurnRule {
    Forbidden(SmallVec<[FeatureId; 2]>),
    Only(FeatureId),
}

/// Feature level turn rules, keyed by the arriving feature and the joint
/// passed through, plus the joint triples those rules forbid.
#[derive(Debug, Clone, Default)]
pub struct RestrictionSet {
    rules: FxHashMap<(FeatureId, JointId), TurnRule>,
    blocked: FxHashSet<(JointId, JointId, JointId)>,
}

impl RestrictionSet {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of forbidden joint triples.
    pub fn blocked_transitions(&self) -> usize {
        self.blocked.len()
    }

    /// Whether arriving at `via` along `from`, one may leave along `to`.
    pub fn is_turn_allowed(&self, from: FeatureId, via: JointId, to: FeatureId) -> bool {
        match self.rules.get(&(from, via)) {
            None => true,
            Some(TurnRule::Forbidden(features)) => !features.contains(&to),
            Some(TurnRule::Only(feature)) => *feature == to,
        }
    }

    pub fn is_transition_allowed(&self, prev: JointId, via: JointId, next: JointId) -> bool {
        !self.blocked.contains(&(prev, via, next))
    }

    pub(crate) fn add_rule(&mut self, restriction: &Restriction, via: JointId) {
        let rule = match self.rules.entry((restriction.from, via)) {
            Entry::Vacant(slot) => {
                slot.insert(match restriction.kind {
                    RestrictionKind::No => TurnRule::Forbidden(SmallVec::from_elem(restriction.to, 1)),
                    RestrictionKind::Only => TurnRule::Only(restriction.to),
                });
                return;
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        match (restriction.kind, rule) {
            (RestrictionKind::No, TurnRule::Forbidden(features)) => {
                if !features.contains(&restriction.to) {
                    features.push(restriction.to);
                }
            }
            (RestrictionKind::No, TurnRule::Only(only)) => {
                if *only == restriction.to {
                    debug!("Restriction {restriction:?} contradicts a mandatory turn at joint {via}, keeping the mandatory turn");
                }
            }
            (RestrictionKind::Only, TurnRule::Only(only)) => {
                if *only != restriction.to {
                    debug!("Restriction {restriction:?} conflicts with mandatory turn onto {only} at joint {via}, keeping the first");
                }
            }
            (RestrictionKind::Only, rule) => {
                *rule = TurnRule::Only(restriction.to);
            }
        }
    }

    pub(crate) fn rule_keys(&self) -> impl Iterator<Item = (FeatureId, JointId)> + '_ {
        self.rules.keys().copied()
    }

    pub(crate) fn set_blocked(&mut self, blocked: FxHashSet<(JointId, JointId, JointId)>) {
        self.blocked = blocked;
    }
}

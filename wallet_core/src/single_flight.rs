//! Single-flight guard for chain-mutating operations.
//!
//! At most one operation of a given kind runs per entity. Operations on other
//! entities, or of other kinds, are never blocked. A [`FlightGuard`] releases
//! its slot when dropped, so every return path resets it.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    PublishOrganization,
    UpdateOrganization,
    ClaimNode,
    Stake,
    Unstake,
    /// Any microblock appended to a wallet's account chain.
    AppendAccountChain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Organization { wallet_id: u64, org_id: u64 },
    Node { wallet_id: u64, org_id: u64, node_id: u64 },
    Account { wallet_id: u64 },
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Organization { wallet_id, org_id } => {
                write!(f, "wallet {wallet_id} / organization {org_id}")
            }
            Self::Node {
                wallet_id,
                org_id,
                node_id,
            } => write!(f, "wallet {wallet_id} / organization {org_id} / node {node_id}"),
            Self::Account { wallet_id } => write!(f, "wallet {wallet_id} / account"),
        }
    }
}

type Slots = Arc<Mutex<HashSet<(OperationKind, EntityKey)>>>;

#[derive(Clone, Default)]
pub struct SingleFlight {
    in_flight: Slots,
}

fn lock(slots: &Slots) -> MutexGuard<'_, HashSet<(OperationKind, EntityKey)>> {
    // The set is left consistent by every holder, so a poisoned lock is safe to reuse.
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `(kind, key)`. `None` if it is already taken.
    pub fn try_begin(&self, kind: OperationKind, key: EntityKey) -> Option<FlightGuard> {
        if !lock(&self.in_flight).insert((kind, key)) {
            return None;
        }
        Some(FlightGuard {
            slots: Arc::clone(&self.in_flight),
            slot: (kind, key),
        })
    }

    pub fn is_in_flight(&self, kind: OperationKind, key: EntityKey) -> bool {
        lock(&self.in_flight).contains(&(kind, key))
    }

    pub fn in_flight_count(&self) -> usize {
        lock(&self.in_flight).len()
    }
}

#[must_use = "the slot is released as soon as the guard is dropped"]
pub struct FlightGuard {
    slots: Slots,
    slot: (OperationKind, EntityKey),
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        lock(&self.slots).remove(&self.slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORG: EntityKey = EntityKey::Organization {
        wallet_id: 1,
        org_id: 1,
    };

    #[test]
    fn second_begin_on_same_slot_is_rejected() {
        let flights = SingleFlight::new();
        let guard = flights.try_begin(OperationKind::PublishOrganization, ORG);
        assert!(guard.is_some());
        assert!(flights
            .try_begin(OperationKind::PublishOrganization, ORG)
            .is_none());
        assert!(flights.is_in_flight(OperationKind::PublishOrganization, ORG));
    }

    #[test]
    fn drop_releases_slot() {
        let flights = SingleFlight::new();
        {
            let _guard = flights.try_begin(OperationKind::ClaimNode, ORG).unwrap();
        }
        assert!(!flights.is_in_flight(OperationKind::ClaimNode, ORG));
        assert!(flights.try_begin(OperationKind::ClaimNode, ORG).is_some());
    }

    #[test]
    fn other_entities_and_kinds_are_independent() {
        let flights = SingleFlight::new();
        let _a = flights
            .try_begin(OperationKind::PublishOrganization, ORG)
            .unwrap();
        let other_org = EntityKey::Organization {
            wallet_id: 1,
            org_id: 2,
        };
        let _b = flights
            .try_begin(OperationKind::PublishOrganization, other_org)
            .unwrap();
        let _c = flights
            .try_begin(OperationKind::UpdateOrganization, ORG)
            .unwrap();
        assert_eq!(flights.in_flight_count(), 3);
    }

    #[test]
    fn account_slot_is_shared_across_nodes() {
        let flights = SingleFlight::new();
        let account = EntityKey::Account { wallet_id: 1 };
        let _stake = flights
            .try_begin(OperationKind::AppendAccountChain, account)
            .unwrap();
        assert!(flights
            .try_begin(OperationKind::AppendAccountChain, account)
            .is_none());
        assert!(flights
            .try_begin(OperationKind::AppendAccountChain, EntityKey::Account { wallet_id: 2 })
            .is_some());
        assert_eq!(
            EntityKey::Account { wallet_id: 1 }.to_string(),
            "wallet 1 / account"
        );
    }
}

use proptest::prelude::*;
use std::sync::Arc;

use ledgerdesk_store::{LocalEntityStore, MemoryStore};
use ledgerdesk_types::{NewOrganization, NewWallet};

#[derive(Clone, Debug)]
enum Op {
    Add,
    /// Remove the n-th live organization (modulo the live count).
    Remove(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![3 => Just(Op::Add), 1 => any::<usize>().prop_map(Op::Remove)]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

proptest! {
    /// Organization ids within a wallet strictly increase across any sequence
    /// of additions and removals.
    #[test]
    fn organization_ids_strictly_increase(ops in prop::collection::vec(op(), 1..40)) {
        let issued = runtime().block_on(async {
            let store = LocalEntityStore::new(Arc::new(MemoryStore::new()));
            let wallet = store
                .add_wallet(NewWallet {
                    name: "w".into(),
                    seed: "11".repeat(32),
                    node_endpoint: "http://localhost:26657".into(),
                })
                .await
                .unwrap();

            let mut issued = Vec::new();
            let mut live: Vec<u64> = Vec::new();
            for op in ops {
                match op {
                    Op::Add => {
                        let org = store
                            .add_organization(wallet.id, NewOrganization::new("org"))
                            .await
                            .unwrap()
                            .unwrap();
                        issued.push(org.id);
                        live.push(org.id);
                    }
                    Op::Remove(n) if !live.is_empty() => {
                        let id = live.remove(n % live.len());
                        assert!(store.remove_organization(wallet.id, id).await.unwrap());
                    }
                    Op::Remove(_) => {}
                }
            }
            issued
        });

        for pair in issued.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
    }
}

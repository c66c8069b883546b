use caveat_core::codec::{decode_permission_context, encode_permission_context};
use caveat_core::{Address, Caveat, Delegation, H256};
use proptest::prelude::*;

fn arb_address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address)
}

fn arb_caveat() -> impl Strategy<Value = Caveat> {
    (
        arb_address(),
        proptest::collection::vec(any::<u8>(), 0..64),
        proptest::collection::vec(any::<u8>(), 0..16),
    )
        .prop_map(|(enforcer, terms, args)| Caveat::new(enforcer, terms).with_args(args))
}

fn arb_delegation() -> impl Strategy<Value = Delegation> {
    (
        arb_address(),
        arb_address(),
        any::<[u8; 32]>(),
        proptest::collection::vec(arb_caveat(), 0..4),
        any::<u128>(),
        proptest::collection::vec(any::<u8>(), 0..97),
    )
        .prop_map(|(delegator, delegate, authority, caveats, salt, signature)| {
            let mut d = Delegation::new(delegator, delegate)
                .with_authority(H256(authority))
                .with_salt(salt)
                .with_signature(signature);
            d.caveats = caveats;
            d
        })
}

proptest! {
    #[test]
    fn hash_ignores_signature_and_args(d in arb_delegation(), sig in proptest::collection::vec(any::<u8>(), 0..97)) {
        let mut stripped = d.clone().with_signature(sig);
        for caveat in &mut stripped.caveats {
            caveat.args.clear();
        }
        prop_assert_eq!(d.hash(), stripped.hash());
    }

    #[test]
    fn hash_binds_salt(d in arb_delegation()) {
        let bumped = d.clone().with_salt(d.salt.wrapping_add(1));
        prop_assert_ne!(d.hash(), bumped.hash());
    }

    #[test]
    fn permission_context_preserves_chain(chain in proptest::collection::vec(arb_delegation(), 0..4)) {
        let decoded = decode_permission_context(&encode_permission_context(&chain)).unwrap();
        let before: Vec<H256> = chain.iter().map(Delegation::hash).collect();
        let after: Vec<H256> = decoded.iter().map(Delegation::hash).collect();
        prop_assert_eq!(before, after);
        prop_assert_eq!(decoded, chain);
    }
}

//! Chain validation: a valid chain passes, and changing any single signed
//! field of any link makes it fail.

use caveat_core::enforcers::ValueLteEnforcer;
use caveat_core::registry::RevocationRegistry;
use caveat_core::signature::KeySigner;
use caveat_core::sim::{AccountValidator, World};
use caveat_core::validator::ChainValidator;
use caveat_core::{Address, Delegation, DelegationError, ErrorClass, ManagerConfig, H256};

struct Chain {
    world: World,
    domain: H256,
    keys: Vec<KeySigner>,
    accounts: Vec<Address>,
}

/// Accounts 0 → 1 → 2, with 2 redeeming.
fn chain_setup() -> Chain {
    let mut world = World::new();
    let keys: Vec<KeySigner> = ["root", "middle", "leaf"]
        .iter()
        .map(|l| KeySigner::from_label(l))
        .collect();
    let accounts = ["root", "middle", "leaf"]
        .iter()
        .zip(&keys)
        .map(|(l, k)| world.deploy_named_account(l, AccountValidator::SingleOwner(k.address())))
        .collect();
    Chain {
        world,
        domain: ManagerConfig::default().domain().separator(),
        keys,
        accounts,
    }
}

fn build(c: &Chain, root: Delegation, leaf_of: impl Fn(H256) -> Delegation) -> Vec<Delegation> {
    let root_sig = c.keys[0].sign_delegation(&c.domain, &root);
    let root = root.with_signature(root_sig);
    let leaf = leaf_of(root.hash());
    let leaf_sig = c.keys[1].sign_delegation(&c.domain, &leaf);
    vec![leaf.with_signature(leaf_sig), root]
}

fn valid_chain(c: &Chain) -> Vec<Delegation> {
    build(
        c,
        Delegation::new(c.accounts[0], c.accounts[1]).with_caveat(ValueLteEnforcer::caveat(10)),
        |parent| Delegation::new(c.accounts[1], c.accounts[2]).with_authority(parent),
    )
}

fn validate(c: &Chain, chain: Vec<Delegation>) -> Result<(), DelegationError> {
    let registry = RevocationRegistry::new();
    ChainValidator::new(c.domain, &registry)
        .validate(&c.world, chain, &c.accounts[2])
        .map(|_| ())
}

#[test]
fn valid_chain_passes() {
    let c = chain_setup();
    let validated = ChainValidator::new(c.domain, &RevocationRegistry::new())
        .validate(&c.world, valid_chain(&c), &c.accounts[2])
        .unwrap();
    assert_eq!(validated.len(), 2);
    assert_eq!(validated.root_delegator(), Some(c.accounts[0]));
}

#[test]
fn post_signing_mutations_are_rejected() {
    let c = chain_setup();
    type Mutation = fn(&mut Vec<Delegation>);
    let mutations: [(&str, Mutation); 6] = [
        ("leaf salt", |ch| ch[0].salt += 1),
        ("root salt", |ch| ch[1].salt += 1),
        ("root caveat terms", |ch| ch[1].caveats[0].terms[31] ^= 1),
        ("root dropped caveat", |ch| {
            ch[1].caveats.clear();
        }),
        ("leaf delegate", |ch| ch[0].delegate = Address::derive("mallory")),
        ("leaf signature byte", |ch| {
            let last = ch[0].signature.len() - 1;
            ch[0].signature[last] ^= 1;
        }),
    ];

    for (name, mutate) in mutations {
        let mut chain = valid_chain(&c);
        mutate(&mut chain);
        let err = validate(&c, chain).expect_err(name);
        assert_eq!(err.class(), ErrorClass::Authorization, "{name}: {err}");
    }
}

#[test]
fn caveat_args_do_not_affect_validity() {
    let c = chain_setup();
    let mut chain = valid_chain(&c);
    chain[1].caveats[0].args = vec![0xde, 0xad];
    validate(&c, chain).unwrap();
}

#[test]
fn wrong_authority_link_is_reported_at_its_index() {
    let c = chain_setup();
    let chain = build(
        &c,
        Delegation::new(c.accounts[0], c.accounts[1]),
        |_| Delegation::new(c.accounts[1], c.accounts[2]).with_authority(H256([7; 32])),
    );
    let err = validate(&c, chain).unwrap_err();
    assert!(matches!(err, DelegationError::InvalidAuthority { index: 0, .. }));
}

#[test]
fn unsigned_link_is_rejected() {
    let c = chain_setup();
    let mut chain = valid_chain(&c);
    chain[1].signature.clear();
    let err = validate(&c, chain).unwrap_err();
    assert!(matches!(err, DelegationError::EmptySignature { .. }));
}

#[test]
fn signature_from_another_domain_is_rejected() {
    let c = chain_setup();
    let other = ManagerConfig {
        chain_id: 2,
        ..ManagerConfig::default()
    }
    .domain()
    .separator();
    let root = Delegation::new(c.accounts[0], c.accounts[2]);
    let sig = c.keys[0].sign_delegation(&other, &root);
    let err = validate(&c, vec![root.with_signature(sig)]).unwrap_err();
    assert!(matches!(err, DelegationError::InvalidContractSignature { .. }));
}

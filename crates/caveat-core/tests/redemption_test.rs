//! End-to-end redemptions against the simulation host.

use caveat_core::enforcer::{EnforcerError, HookArgs, HookEnv, HookResult};
use caveat_core::enforcers::{
    AllowedTargetsEnforcer, ApprovalAmountEnforcer, BalanceDirection, Erc20BalanceChangeEnforcer,
    LimitedCallsEnforcer,
};
use caveat_core::signature::{KeySigner, ThresholdPolicy};
use caveat_core::sim::{AccountValidator, World};
use caveat_core::{
    Address, CaveatEnforcer, Caveat, Delegation, DelegationError, DelegationManager, Erc20Call,
    ErrorClass, ExecType, Execution, HookKind, HostView, ManagerConfig, ManagerEvent,
    RedemptionRequest, ANY_DELEGATE,
};
use std::sync::{Arc, Mutex};

struct Party {
    key: KeySigner,
    account: Address,
}

struct Setup {
    world: World,
    manager: DelegationManager,
    token: Address,
    a: Party,
    b: Party,
    c: Party,
}

fn party(world: &mut World, label: &str) -> Party {
    let key = KeySigner::from_label(label);
    let account = world.deploy_named_account(label, AccountValidator::SingleOwner(key.address()));
    Party { key, account }
}

fn setup() -> Setup {
    let mut world = World::new().with_time(1_700_000_000);
    let a = party(&mut world, "a");
    let b = party(&mut world, "b");
    let c = party(&mut world, "c");
    let token = world.deploy_token("TKN");
    world.mint(&token, a.account, 1_000).unwrap();
    Setup {
        world,
        manager: DelegationManager::with_catalog(ManagerConfig::default()),
        token,
        a,
        b,
        c,
    }
}

fn sign(manager: &DelegationManager, signer: &Party, delegation: Delegation) -> Delegation {
    let signature = signer.key.sign_delegation(&manager.domain_hash(), &delegation);
    delegation.with_signature(signature)
}

fn approve(token: Address, spender: Address, amount: u128) -> Execution {
    Execution::new(token, 0, Erc20Call::Approve { spender, amount }.encode())
}

fn transfer(token: Address, to: Address, amount: u128) -> Execution {
    Execution::new(token, 0, Erc20Call::Transfer { to, amount }.encode())
}

#[test]
fn approval_within_cap_succeeds_and_over_cap_leaves_state_untouched() {
    let mut s = setup();
    let delegation = sign(
        &s.manager,
        &s.a,
        Delegation::new(s.a.account, s.b.account)
            .with_caveat(ApprovalAmountEnforcer::caveat(&s.token, 100)),
    );
    let chain = [delegation.clone()];

    s.manager
        .redeem(
            &mut s.world,
            s.b.account,
            &[RedemptionRequest::single(&chain, &approve(s.token, s.b.account, 100))],
        )
        .unwrap();
    assert_eq!(s.world.allowance(&s.token, &s.a.account, &s.b.account), 100);
    assert_eq!(
        s.manager.take_events(),
        vec![ManagerEvent::RedeemedDelegation {
            root_delegator: s.a.account,
            redeemer: s.b.account,
            delegation_hash: delegation.hash(),
        }]
    );

    let err = s
        .manager
        .redeem(
            &mut s.world,
            s.b.account,
            &[RedemptionRequest::single(&chain, &approve(s.token, s.b.account, 101))],
        )
        .unwrap_err();
    match &err {
        DelegationError::Caveat { hook, source, .. } => {
            assert_eq!(*hook, HookKind::Before);
            assert_eq!(
                *source,
                EnforcerError::rejected("ApprovalAmountEnforcer:allowance-exceeded")
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.class(), ErrorClass::Policy);
    assert_eq!(s.world.allowance(&s.token, &s.a.account, &s.b.account), 100);
    assert!(s.manager.events().is_empty());
}

#[test]
fn two_link_chain_executes_on_root_account() {
    let mut s = setup();
    let ab = sign(&s.manager, &s.a, Delegation::new(s.a.account, s.b.account));
    let bc = sign(
        &s.manager,
        &s.b,
        Delegation::new(s.b.account, s.c.account).with_authority(ab.hash()),
    );

    let redemption = s
        .manager
        .redeem(
            &mut s.world,
            s.c.account,
            &[RedemptionRequest::single(
                &[bc.clone(), ab.clone()],
                &transfer(s.token, s.c.account, 25),
            )],
        )
        .unwrap();

    assert_eq!(redemption.entries[0].account, s.a.account);
    assert_eq!(redemption.redeemed(), 2);
    assert_eq!(s.world.token_balance(&s.token, &s.c.account), 25);
    assert_eq!(s.world.token_balance(&s.token, &s.a.account), 975);

    let hashes: Vec<_> = s
        .manager
        .events()
        .iter()
        .map(|e| match e {
            ManagerEvent::RedeemedDelegation {
                root_delegator,
                delegation_hash,
                ..
            } => {
                assert_eq!(*root_delegator, s.a.account);
                *delegation_hash
            }
            other => panic!("unexpected event {other:?}"),
        })
        .collect();
    assert_eq!(hashes, vec![bc.hash(), ab.hash()]);
}

#[test]
fn disabled_intermediate_delegation_rejects_the_chain() {
    let mut s = setup();
    let ab = sign(&s.manager, &s.a, Delegation::new(s.a.account, s.b.account));
    let bc = sign(
        &s.manager,
        &s.b,
        Delegation::new(s.b.account, s.c.account).with_authority(ab.hash()),
    );
    s.manager.disable_delegation(&s.a.account, &ab).unwrap();

    let err = s
        .manager
        .redeem(
            &mut s.world,
            s.c.account,
            &[RedemptionRequest::single(&[bc, ab.clone()], &transfer(s.token, s.c.account, 1))],
        )
        .unwrap_err();
    assert!(matches!(err, DelegationError::DisabledDelegation { hash } if hash == ab.hash()));
    assert_eq!(s.world.token_balance(&s.token, &s.c.account), 0);

    s.manager.enable_delegation(&s.a.account, &ab).unwrap();
    s.manager
        .redeem(
            &mut s.world,
            s.b.account,
            &[RedemptionRequest::single(&[ab], &transfer(s.token, s.b.account, 1))],
        )
        .unwrap();
}

#[test]
fn open_delegation_is_redeemable_by_anyone() {
    let mut s = setup();
    let open = sign(&s.manager, &s.a, Delegation::new(s.a.account, ANY_DELEGATE));
    s.manager
        .redeem(
            &mut s.world,
            s.c.account,
            &[RedemptionRequest::single(&[open], &transfer(s.token, s.c.account, 3))],
        )
        .unwrap();
    assert_eq!(s.world.token_balance(&s.token, &s.c.account), 3);
}

#[test]
fn later_entry_failure_reverts_earlier_entries() {
    let mut s = setup();
    let delegation = sign(
        &s.manager,
        &s.a,
        Delegation::new(s.a.account, s.b.account)
            .with_caveat(AllowedTargetsEnforcer::caveat(&[s.token])),
    );
    let chain = [delegation];
    let other = Address::derive("elsewhere");

    let err = s
        .manager
        .redeem(
            &mut s.world,
            s.b.account,
            &[
                RedemptionRequest::single(&chain, &transfer(s.token, s.b.account, 10)),
                RedemptionRequest::single(&chain, &Execution::new(other, 0, vec![])),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, DelegationError::Caveat { .. }));
    assert_eq!(s.world.token_balance(&s.token, &s.b.account), 0);
}

#[test]
fn call_limit_counts_across_batches() {
    let mut s = setup();
    let delegation = sign(
        &s.manager,
        &s.a,
        Delegation::new(s.a.account, s.b.account).with_caveat(LimitedCallsEnforcer::caveat(2)),
    );
    let request = RedemptionRequest::single(&[delegation], &transfer(s.token, s.b.account, 1));

    s.manager
        .redeem(&mut s.world, s.b.account, &[request.clone(), request.clone()])
        .unwrap();
    let err = s
        .manager
        .redeem(&mut s.world, s.b.account, &[request])
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Policy);
    assert_eq!(s.world.token_balance(&s.token, &s.b.account), 2);
}

#[test]
fn balance_decrease_cap_checked_after_all_entries() {
    let mut s = setup();
    let delegation = sign(
        &s.manager,
        &s.a,
        Delegation::new(s.a.account, s.b.account).with_caveat(Erc20BalanceChangeEnforcer::caveat(
            BalanceDirection::Decrease,
            &s.token,
            &s.a.account,
            50,
        )),
    );
    let chain = [delegation];

    s.manager
        .redeem(
            &mut s.world,
            s.b.account,
            &[RedemptionRequest::single(&chain, &transfer(s.token, s.b.account, 50))],
        )
        .unwrap();

    let err = s
        .manager
        .redeem(
            &mut s.world,
            s.b.account,
            &[RedemptionRequest::single(&chain, &transfer(s.token, s.b.account, 51))],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        DelegationError::Caveat {
            hook: HookKind::AfterAll,
            ..
        }
    ));
    assert_eq!(s.world.token_balance(&s.token, &s.b.account), 50);
    assert!(s.manager.enforcer_storage().is_empty());
}

#[test]
fn threshold_account_as_delegator() {
    let mut s = setup();
    let mut keys: Vec<KeySigner> = (0..3)
        .map(|i| KeySigner::from_label(&format!("treasury-{i}")))
        .collect();
    keys.sort_by_key(KeySigner::address);
    let policy = ThresholdPolicy::new(keys.iter().map(KeySigner::address), 2).unwrap();
    let treasury = s
        .world
        .deploy_named_account("treasury", AccountValidator::Threshold(policy));
    s.world.mint(&s.token, treasury, 10).unwrap();

    let unsigned = Delegation::new(treasury, s.b.account);
    let digest = s.manager.signing_digest(&unsigned);
    let mut both = keys[0].sign_digest(&digest);
    both.extend(keys[2].sign_digest(&digest));

    let request = |d: Delegation| {
        RedemptionRequest::single(&[d], &transfer(s.token, s.b.account, 10))
    };

    let one_signer = unsigned.clone().with_signature(keys[0].sign_digest(&digest));
    let err = s
        .manager
        .redeem(&mut s.world, s.b.account, &[request(one_signer)])
        .unwrap_err();
    assert!(matches!(err, DelegationError::InvalidContractSignature { .. }));

    s.manager
        .redeem(&mut s.world, s.b.account, &[request(unsigned.with_signature(both))])
        .unwrap();
    assert_eq!(s.world.token_balance(&s.token, &s.b.account), 10);
}

#[test]
fn try_mode_skips_failed_calls() {
    let mut s = setup();
    let delegation = sign(&s.manager, &s.a, Delegation::new(s.a.account, s.b.account));
    let request = RedemptionRequest::batch(
        &[delegation],
        &[
            transfer(s.token, s.b.account, 5_000),
            transfer(s.token, s.b.account, 5),
        ],
    )
    .with_exec_type(ExecType::Try);

    let redemption = s
        .manager
        .redeem(&mut s.world, s.b.account, &[request])
        .unwrap();
    assert_eq!(redemption.entries[0].return_data.len(), 2);
    assert_eq!(s.world.token_balance(&s.token, &s.b.account), 5);
    assert_eq!(s.world.failed_calls().len(), 1);
}

// ── hook ordering ─────────────────────────────────────────────────────

struct Recorder {
    log: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn record(&self, kind: HookKind, hook: &HookArgs<'_>) -> HookResult {
        let label = String::from_utf8_lossy(hook.terms);
        self.log.lock().unwrap().push(format!("{kind}:{label}"));
        Ok(())
    }
}

impl CaveatEnforcer for Recorder {
    fn name(&self) -> &str {
        "Recorder"
    }

    fn before_all_hook(&self, hook: &HookArgs<'_>, _env: &mut HookEnv<'_>) -> HookResult {
        self.record(HookKind::BeforeAll, hook)
    }

    fn before_hook(&self, hook: &HookArgs<'_>, _env: &mut HookEnv<'_>) -> HookResult {
        self.record(HookKind::Before, hook)
    }

    fn after_hook(&self, hook: &HookArgs<'_>, env: &mut HookEnv<'_>) -> HookResult {
        assert!(env.host.timestamp() > 0);
        self.record(HookKind::After, hook)
    }

    fn after_all_hook(&self, hook: &HookArgs<'_>, _env: &mut HookEnv<'_>) -> HookResult {
        self.record(HookKind::AfterAll, hook)
    }
}

#[test]
fn hooks_run_leaf_to_root_before_and_root_to_leaf_after() {
    let mut s = setup();
    let recorder = Address::derive("recorder");
    let log = Arc::new(Mutex::new(Vec::new()));
    s.manager
        .enforcers_mut()
        .register(recorder, Arc::new(Recorder { log: Arc::clone(&log) }));

    let ab = sign(
        &s.manager,
        &s.a,
        Delegation::new(s.a.account, s.b.account)
            .with_caveat(Caveat::new(recorder, b"ab0".to_vec()))
            .with_caveat(Caveat::new(recorder, b"ab1".to_vec())),
    );
    let bc = sign(
        &s.manager,
        &s.b,
        Delegation::new(s.b.account, s.c.account)
            .with_authority(ab.hash())
            .with_caveat(Caveat::new(recorder, b"bc0".to_vec()))
            .with_caveat(Caveat::new(recorder, b"bc1".to_vec())),
    );

    s.manager
        .redeem(
            &mut s.world,
            s.c.account,
            &[RedemptionRequest::single(&[bc, ab], &transfer(s.token, s.c.account, 1))],
        )
        .unwrap();

    let forward = ["bc0", "bc1", "ab0", "ab1"];
    let mut expected: Vec<String> = Vec::new();
    for kind in [HookKind::BeforeAll, HookKind::Before] {
        expected.extend(forward.iter().map(|l| format!("{kind}:{l}")));
    }
    for kind in [HookKind::After, HookKind::AfterAll] {
        expected.extend(forward.iter().rev().map(|l| format!("{kind}:{l}")));
    }
    assert_eq!(*log.lock().unwrap(), expected);
}

#[test]
fn before_all_runs_for_every_entry_before_any_execution() {
    let mut s = setup();
    let recorder = Address::derive("recorder");
    let log = Arc::new(Mutex::new(Vec::new()));
    s.manager
        .enforcers_mut()
        .register(recorder, Arc::new(Recorder { log: Arc::clone(&log) }));

    let first = sign(
        &s.manager,
        &s.a,
        Delegation::new(s.a.account, s.b.account).with_caveat(Caveat::new(recorder, b"one".to_vec())),
    );
    let second = sign(
        &s.manager,
        &s.a,
        Delegation::new(s.a.account, s.b.account)
            .with_salt(1)
            .with_caveat(Caveat::new(recorder, b"two".to_vec())),
    );

    s.manager
        .redeem(
            &mut s.world,
            s.b.account,
            &[
                RedemptionRequest::single(&[first], &transfer(s.token, s.b.account, 1)),
                RedemptionRequest::single(&[second], &transfer(s.token, s.b.account, 1)),
            ],
        )
        .unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "beforeAll:one",
            "beforeAll:two",
            "before:one",
            "after:one",
            "before:two",
            "after:two",
            "afterAll:one",
            "afterAll:two",
        ]
    );
}

use hex_literal::hex;
use vaa_core::{
    Action, Address, Amount, Chain, Config, Contract, GovernancePacket, GuardianAddress,
    GuardianSet, LocalChainState, MemoryClaimStore, MemoryGuardianSetStore, Module, Submitted,
    Vaa, VaaError, GOVERNANCE_EMITTER,
};
use vaa_testing::{governance, MockGuardianSet, TestVaa};

/// The mainnet upgrade from guardian set 0 to guardian set 1.
const GUARDIAN_SET_UPGRADE_VAA: [u8; 543] = hex!(
    "010000000001007ac31b282c2aeeeb37f3385ee0de5f8e421d30b9e5ae8ba3d4375c1c77a86e77159bb697d9c456d6f8"
    "c02d22a94b1279b65b0d6a9957e7d3857423845ac758e300610ac1d20000000300010000000000000000000000000000"
    "000000000000000000000000000000000004000000000000053900000000000000000000000000000000000000000000"
    "00000000000000436f7265020000000000011358cc3ae5c097b213ce3c81979e1b9f9570746aa5ff6cb952589bde862c"
    "25ef4392132fb9d4a42157114de8460193bdf3a2fcf81f86a09765f4762fd1107a0086b32d7a0977926a205131d8731d"
    "39cbeb8c82b2fd82faed2711d59af0f2499d16e726f6b211b39756c042441be6d8650b69b54ebe715e234354ce5b4d34"
    "8fb74b958e8966e2ec3dbd4958a7cdeb5f7389fa26941519f0863349c223b73a6ddee774a3bf913953d695260d88bc1a"
    "a25a4eee363ef0000ac0076727b35fbea2dac28fee5ccb0fea768eaf45ced136b9d9e24903464ae889f5c8a723fc14f9"
    "3124b7c738843cbb89e864c862c38cddcccf95d2cc37a4dc036a8d232b48f62cdd4731412f4890da798f6896a3331f64"
    "b48c12d1d57fd9cbe7081171aa1be1d36cafe3867910f99c09e347899c19c38192b6e7387ccd768277c17dab1b7a5027"
    "c0b3cf178e21ad2e77ae06711549cfbb1f9c7a9d8096e85e1487f35515d02a92753504a8d75471b9f49edb6fbebc898f"
    "403e4773e95feb15e80c9a99c8348d"
);

const MAINNET_GUARDIAN_0: GuardianAddress =
    GuardianAddress(hex!("58cc3ae5c097b213ce3c81979e1b9f9570746aa5"));

fn contract_with(config: Config, guardians: &MockGuardianSet) -> Contract {
    Contract::new(config, guardians.guardian_set())
}

fn governance_vaa(packet: &GovernancePacket, sequence: u64, guardians: &MockGuardianSet) -> Vaa {
    TestVaa::governance(packet, sequence)
        .unwrap()
        .sign(guardians)
        .unwrap()
}

#[test]
fn mainnet_guardian_set_upgrade() {
    let mut contract = Contract::new(
        Config::new(Chain::Ethereum),
        GuardianSet::new(0, vec![MAINNET_GUARDIAN_0]),
    );

    let now = 1_628_094_930 + 60;
    let applied = match contract.submit_vaa(&GUARDIAN_SET_UPGRADE_VAA, now).unwrap() {
        Submitted::Governance(applied) => applied,
        other => panic!("unexpected {other:?}"),
    };

    assert_eq!(Chain::Any, applied.packet.chain);
    assert_eq!(1_337, applied.claim.sequence);
    assert_eq!(
        hex!("ed3a5600d44b9dcc889daf0178dd69ab1e9356308194ba3628a7b720ae48a8d5"),
        applied.digest.secp256k_hash
    );

    let current = contract.current_guardian_set().unwrap();
    assert_eq!(1, current.index);
    assert_eq!(19, current.addresses.len());
    assert_eq!(MAINNET_GUARDIAN_0, current.addresses[0]);
    assert_eq!(13, current.quorum());
    assert_eq!(now, current.creation_time);

    let previous = contract.guardian_set(0).unwrap();
    assert_eq!(now + 86_400, previous.expiration_time);

    // The upgrade is claimed, not just superseded.
    assert_eq!(
        Err(VaaError::AlreadyConsumed(applied.claim)),
        contract.submit_vaa(&GUARDIAN_SET_UPGRADE_VAA, now)
    );
}

#[test]
fn upgrade_then_expire() {
    let old = MockGuardianSet::default_set(0);
    let new = MockGuardianSet::generate(1, 10, b"next");

    let mut config = Config::new(Chain::Sui);
    config.guardian_set_expiry = 600;
    let mut contract = contract_with(config, &old);

    let upgrade = governance_vaa(&governance::upgrade_guardian_set(1, &new), 1, &old);
    contract.dispatch(&upgrade, 1_000).unwrap();
    assert_eq!(1, contract.current_guardian_set().unwrap().index);

    let message = TestVaa::new(Chain::Ethereum, Address([5; 32]), 1, vec![1]);
    let under_old = message.sign(&old).unwrap();
    let under_new = message.clone().nonce(1).sign_quorum(&new).unwrap();

    // Old set still honoured during the grace window.
    assert!(contract.verify_vaa(&under_old, 1_600).is_ok());
    assert_eq!(
        Err(VaaError::GuardianSetExpired {
            index: 0,
            expiration_time: 1_600
        }),
        contract.redeem(&under_old, 1_601)
    );
    assert!(contract.redeem(&under_new, 1_601).is_ok());
}

#[test]
fn governance_requires_current_set() {
    let old = MockGuardianSet::default_set(0);
    let new = MockGuardianSet::generate(1, 4, b"next");
    let mut contract = contract_with(Config::new(Chain::Sui), &old);

    contract
        .dispatch(
            &governance_vaa(&governance::upgrade_guardian_set(1, &new), 1, &old),
            10,
        )
        .unwrap();

    // Still within the grace window, but governance wants the latest set.
    let fee = governance_vaa(&governance::set_message_fee(Chain::Sui, 5), 2, &old);
    assert!(contract.verify_vaa(&fee, 10).is_ok());
    assert_eq!(
        Err(VaaError::LatestGuardianSetRequired {
            current: 1,
            found: 0
        }),
        contract.dispatch(&fee, 10)
    );
    assert!(!contract.is_consumed(&fee.message_id()));

    let fee = governance_vaa(&governance::set_message_fee(Chain::Sui, 5), 2, &new);
    contract.dispatch(&fee, 10).unwrap();
    assert_eq!(Amount::from(5), contract.state().message_fee);
}

#[test]
fn target_chain_scoping() {
    let guardians = MockGuardianSet::default_set(0);

    // Oasis is chain 7, Polygon is chain 5.
    let mut on_oasis = contract_with(Config::new(Chain::Oasis), &guardians);
    let for_polygon = governance_vaa(&governance::set_message_fee(Chain::Polygon, 1), 1, &guardians);
    assert_eq!(
        Err(VaaError::WrongChain {
            target: Chain::Polygon,
            chain: Chain::Oasis
        }),
        on_oasis.dispatch(&for_polygon, 0)
    );
    assert!(!on_oasis.is_consumed(&for_polygon.message_id()));

    let mut on_polygon = contract_with(Config::new(Chain::Polygon), &guardians);
    on_polygon.dispatch(&for_polygon, 0).unwrap();

    // Target 0 applies everywhere.
    let for_all = governance_vaa(&governance::set_message_fee(Chain::Any, 2), 2, &guardians);
    on_oasis.dispatch(&for_all, 0).unwrap();
    on_polygon.dispatch(&for_all, 0).unwrap();
    assert_eq!(Amount::from(2), on_oasis.state().message_fee);
    assert_eq!(Amount::from(2), on_polygon.state().message_fee);
}

#[test]
fn module_scoping() {
    let guardians = MockGuardianSet::default_set(0);
    let mut config = Config::new(Chain::Sui);
    config.module = Module::TOKEN_BRIDGE;
    let mut token_bridge = contract_with(config, &guardians);

    let core = governance_vaa(
        &governance::upgrade_contract(Module::CORE, Chain::Sui, Address([1; 32])),
        1,
        &guardians,
    );
    assert_eq!(
        Err(VaaError::WrongModule {
            expected: Module::TOKEN_BRIDGE,
            found: Module::CORE
        }),
        token_bridge.dispatch(&core, 0)
    );

    let register = governance_vaa(
        &governance::register_chain(Module::TOKEN_BRIDGE, Chain::Ethereum, Address([2; 32])),
        2,
        &guardians,
    );
    token_bridge.dispatch(&register, 0).unwrap();
    assert_eq!(
        Some(&Address([2; 32])),
        token_bridge.state().registered_emitters.get(&Chain::Ethereum)
    );

    // A second registration for the same chain is refused and leaves no claim behind.
    let again = governance_vaa(
        &governance::register_chain(Module::TOKEN_BRIDGE, Chain::Ethereum, Address([3; 32])),
        3,
        &guardians,
    );
    assert_eq!(
        Err(VaaError::ChainAlreadyRegistered(Chain::Ethereum)),
        token_bridge.dispatch(&again, 0)
    );
    assert!(!token_bridge.is_consumed(&again.message_id()));
}

#[test]
fn governance_from_other_emitter() {
    let guardians = MockGuardianSet::default_set(0);
    let mut contract = contract_with(Config::new(Chain::Sui), &guardians);

    let payload = governance::set_message_fee(Chain::Any, 1).to_bytes().unwrap();
    let forged = TestVaa::new(Chain::Ethereum, GOVERNANCE_EMITTER, 1, payload)
        .sign(&guardians)
        .unwrap();
    assert_eq!(
        Err(VaaError::InvalidGovernanceEmitter {
            chain: Chain::Ethereum,
            address: GOVERNANCE_EMITTER
        }),
        contract.dispatch(&forged, 0)
    );
}

#[test]
fn invalid_guardian_set_upgrades() {
    let guardians = MockGuardianSet::default_set(0);
    let mut contract = contract_with(Config::new(Chain::Sui), &guardians);

    let skip = governance_vaa(&governance::upgrade_guardian_set(2, &guardians), 1, &guardians);
    assert_eq!(
        Err(VaaError::InvalidGuardianSetIndex {
            expected: 1,
            found: 2
        }),
        contract.dispatch(&skip, 0)
    );

    let mut addresses = guardians.addresses();
    addresses[3] = addresses[1];
    let duplicate = GovernancePacket {
        module: Module::CORE,
        chain: Chain::Any,
        action: Action::UpgradeGuardianSet {
            new_guardian_set_index: 1,
            new_guardian_set: addresses.clone(),
        },
    };
    let duplicate = governance_vaa(&duplicate, 2, &guardians);
    assert_eq!(
        Err(VaaError::DuplicateGuardianAddress(addresses[1])),
        contract.dispatch(&duplicate, 0)
    );

    let empty = GovernancePacket {
        module: Module::CORE,
        chain: Chain::Any,
        action: Action::UpgradeGuardianSet {
            new_guardian_set_index: 1,
            new_guardian_set: vec![],
        },
    };
    assert_eq!(
        Err(VaaError::ZeroGuardians),
        contract.dispatch(&governance_vaa(&empty, 3, &guardians), 0)
    );

    assert_eq!(0, contract.current_guardian_set().unwrap().index);
    assert!(contract.claims().is_empty());
}

#[test]
fn trailing_governance_bytes() {
    let guardians = MockGuardianSet::default_set(0);
    let mut contract = contract_with(Config::new(Chain::Sui), &guardians);

    let mut payload = governance::set_message_fee(Chain::Any, 1).to_bytes().unwrap();
    payload.push(0);
    let vaa = TestVaa::new(Chain::Solana, GOVERNANCE_EMITTER, 1, payload)
        .sign(&guardians)
        .unwrap();

    assert!(matches!(
        contract.dispatch(&vaa, 0),
        Err(VaaError::Malformed(_))
    ));
}

#[test]
fn fees_and_chain_id_recovery() {
    let guardians = MockGuardianSet::default_set(0);
    let evm_chain_id = Amount::from(1);
    let mut contract = Contract::with_stores(
        Config::new(Chain::Ethereum),
        MemoryGuardianSetStore::with_genesis(guardians.guardian_set()),
        MemoryClaimStore::new(),
        LocalChainState::with_evm_chain_id(evm_chain_id),
    );
    contract
        .state_mut()
        .collect_fee(Amount::from(100))
        .unwrap();

    let recipient = Address([9; 32]);
    let too_much = governance_vaa(
        &governance::transfer_fees(Chain::Ethereum, 101, recipient),
        1,
        &guardians,
    );
    assert_eq!(
        Err(VaaError::InsufficientFees(Amount::from(101))),
        contract.dispatch(&too_much, 0)
    );

    let transfer = governance_vaa(
        &governance::transfer_fees(Chain::Ethereum, 60, recipient),
        2,
        &guardians,
    );
    contract.dispatch(&transfer, 0).unwrap();
    assert_eq!(Amount::from(40), contract.state().fees_collected);
    assert_eq!(
        vec![(recipient, Amount::from(60))],
        contract.state().fee_transfers
    );

    // After a fork the chain adopts a new id and old targets stop matching.
    let recover = governance_vaa(
        &governance::recover_chain_id(Module::CORE, 1, Chain::Unknown(10_002)),
        3,
        &guardians,
    );
    let applied = contract.dispatch(&recover, 0).unwrap();
    assert_eq!(Chain::Any, applied.packet.chain);
    assert_eq!(Chain::Unknown(10_002), contract.config().chain_id);

    let for_old_id = governance_vaa(&governance::set_message_fee(Chain::Ethereum, 1), 4, &guardians);
    assert_eq!(
        Err(VaaError::WrongChain {
            target: Chain::Ethereum,
            chain: Chain::Unknown(10_002)
        }),
        contract.dispatch(&for_old_id, 0)
    );
}

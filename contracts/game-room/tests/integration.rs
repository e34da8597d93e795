use soroban_sdk::{
    contract, contractimpl, contracttype,
    testutils::{Address as _, Ledger},
    token::{StellarAssetClient, TokenClient},
    vec, Address, Env, String,
};

use gameroom_escrow::{
    CreateRoomParams, Currency, Error, GameRoom, GameRoomClient, Payout, RoomStatus, SplitRule,
};

/// Recorded when the nested call never reached the room contract's own code.
const HOST_REJECTED: u32 = u32::MAX;

/// Token that calls back into the room contract every time it pays someone
/// out, and records what that nested call returned.
#[contract]
struct ReentrantToken;

#[contracttype]
enum ReentrantKey {
    Target,
    Creator,
    RoomId,
    Transfers,
    Nested,
}

#[contractimpl]
impl ReentrantToken {
    pub fn arm(env: Env, target: Address, creator: Address, room_id: u64) {
        env.storage().instance().set(&ReentrantKey::Target, &target);
        env.storage().instance().set(&ReentrantKey::Creator, &creator);
        env.storage().instance().set(&ReentrantKey::RoomId, &room_id);
    }

    pub fn transfers(env: Env) -> u32 {
        env.storage()
            .instance()
            .get(&ReentrantKey::Transfers)
            .unwrap_or(0)
    }

    pub fn nested_outcome(env: Env) -> Option<u32> {
        env.storage().instance().get(&ReentrantKey::Nested)
    }

    pub fn allowance(_env: Env, _from: Address, _spender: Address) -> i128 {
        i128::MAX
    }

    pub fn balance(_env: Env, _id: Address) -> i128 {
        i128::MAX
    }

    pub fn transfer_from(
        _env: Env,
        _spender: Address,
        _from: Address,
        _to: Address,
        _amount: i128,
    ) {
    }

    pub fn transfer(env: Env, _from: Address, _to: Address, _amount: i128) {
        let transfers = Self::transfers(env.clone()) + 1;
        env.storage()
            .instance()
            .set(&ReentrantKey::Transfers, &transfers);

        let target: Option<Address> = env.storage().instance().get(&ReentrantKey::Target);
        if let Some(target) = target {
            let creator: Address = env.storage().instance().get(&ReentrantKey::Creator).unwrap();
            let room_id: u64 = env.storage().instance().get(&ReentrantKey::RoomId).unwrap();
            let outcome = match GameRoomClient::new(&env, &target)
                .try_cancel_game_room(&creator, &room_id)
            {
                Ok(_) => 0,
                Err(Ok(err)) => err as u32,
                Err(Err(_)) => HOST_REJECTED,
            };
            env.storage().instance().set(&ReentrantKey::Nested, &outcome);
        }
    }
}

/// Token whose second payout fails.
#[contract]
struct FlakyToken;

#[contracttype]
enum FlakyKey {
    Transfers,
}

#[contractimpl]
impl FlakyToken {
    pub fn transfers(env: Env) -> u32 {
        env.storage()
            .instance()
            .get(&FlakyKey::Transfers)
            .unwrap_or(0)
    }

    pub fn allowance(_env: Env, _from: Address, _spender: Address) -> i128 {
        i128::MAX
    }

    pub fn balance(_env: Env, _id: Address) -> i128 {
        i128::MAX
    }

    pub fn transfer_from(
        _env: Env,
        _spender: Address,
        _from: Address,
        _to: Address,
        _amount: i128,
    ) {
    }

    pub fn transfer(env: Env, _from: Address, _to: Address, _amount: i128) {
        let transfers = Self::transfers(env.clone()) + 1;
        if transfers == 2 {
            panic!("transfer rejected");
        }
        env.storage().instance().set(&FlakyKey::Transfers, &transfers);
    }
}

fn create_token<'a>(env: &'a Env, token_admin: &Address) -> (Address, StellarAssetClient<'a>) {
    let token_contract = env.register_stellar_asset_contract_v2(token_admin.clone());
    let token_client = StellarAssetClient::new(env, &token_contract.address());
    (token_contract.address(), token_client)
}

fn room_params(env: &Env, entry_fee: i128, split_rule: SplitRule) -> CreateRoomParams {
    CreateRoomParams {
        name: String::from_str(env, "Friday Finals"),
        entry_fee,
        max_players: 8,
        start_time: 100,
        end_time: 200,
        split_rule,
        currency: Currency::Usdc,
    }
}

#[test]
fn test_full_room_lifecycle_integration() {
    let env = Env::default();

    let admin = Address::generate(&env);
    let token_admin = Address::generate(&env);
    let (usdc_addr, usdc_sac) = create_token(&env, &token_admin);
    let (usdt_addr, _) = create_token(&env, &token_admin);

    let room_contract = env.register(GameRoom, ());
    let rooms = GameRoomClient::new(&env, &room_contract);

    env.mock_all_auths();
    rooms.init(&admin, &usdc_addr, &usdt_addr);

    let usdc = TokenClient::new(&env, &usdc_addr);
    let expiration = env.ledger().sequence() + 500;

    let creator = Address::generate(&env);
    let alice = Address::generate(&env);
    let bob = Address::generate(&env);
    let carol = Address::generate(&env);
    for who in [&creator, &alice, &bob, &carol] {
        usdc_sac.mint(who, &500i128);
        usdc.approve(who, &room_contract, &250i128, &expiration);
    }

    let room_id = rooms.create_game_room(&creator, &room_params(&env, 250, SplitRule::Top3));
    rooms.add_to_room(&alice, &room_id);
    rooms.add_to_room(&bob, &room_id);
    rooms.add_to_room(&carol, &room_id);
    assert_eq!(usdc.balance(&room_contract), 1_000);

    env.ledger().set_timestamp(100);
    rooms.start_game_room(&creator, &room_id);

    rooms.update_score(&creator, &room_id, &alice, &40u64);
    rooms.update_score(&creator, &room_id, &bob, &95u64);
    rooms.update_score(&creator, &room_id, &carol, &40u64);
    rooms.update_score(&creator, &room_id, &creator, &10u64);

    env.ledger().set_timestamp(200);
    let payouts = rooms.complete_game_room(&creator, &room_id);

    // Alice and Carol tie; Alice joined first.
    assert_eq!(
        payouts,
        vec![
            &env,
            Payout {
                recipient: bob.clone(),
                amount: 500,
            },
            Payout {
                recipient: alice.clone(),
                amount: 300,
            },
            Payout {
                recipient: carol.clone(),
                amount: 200,
            },
        ]
    );
    assert_eq!(usdc.balance(&bob), 750);
    assert_eq!(usdc.balance(&alice), 550);
    assert_eq!(usdc.balance(&carol), 450);
    assert_eq!(usdc.balance(&creator), 250);
    assert_eq!(usdc.balance(&room_contract), 0);

    let room = rooms.fetch_game_room_details(&room_id);
    assert_eq!(room.status, RoomStatus::Completed);
    assert_eq!(room.total_prize_pool, 0);
    assert_eq!(rooms.get_participants(&room_id).len(), 4);
}

/// Room contract bound to `usdc_token`, with a creator and two joiners in
/// one Pending room.
fn room_with_three_players<'a>(
    env: &'a Env,
    usdc_token: &Address,
    split_rule: SplitRule,
) -> (GameRoomClient<'a>, Address, u64, [Address; 3]) {
    let admin = Address::generate(env);
    let token_admin = Address::generate(env);
    let (usdt_addr, _) = create_token(env, &token_admin);

    let room_contract = env.register(GameRoom, ());
    let rooms = GameRoomClient::new(env, &room_contract);

    env.mock_all_auths();
    rooms.init(&admin, usdc_token, &usdt_addr);

    let creator = Address::generate(env);
    let alice = Address::generate(env);
    let bob = Address::generate(env);
    let room_id = rooms.create_game_room(&creator, &room_params(env, 100, split_rule));
    rooms.add_to_room(&alice, &room_id);
    rooms.add_to_room(&bob, &room_id);

    (rooms, room_contract, room_id, [creator, alice, bob])
}

#[test]
fn test_reentrant_refund_is_refused_by_host() {
    let env = Env::default();
    let hostile_id = env.register(ReentrantToken, ());
    let hostile = ReentrantTokenClient::new(&env, &hostile_id);
    let (rooms, room_contract, room_id, [creator, _, _]) =
        room_with_three_players(&env, &hostile_id, SplitRule::Top1);

    hostile.arm(&room_contract, &creator, &room_id);
    rooms.cancel_game_room(&creator, &room_id);

    // The nested cancel never reaches the room contract: the host refuses
    // contract re-entry before the lock is even consulted.
    assert_eq!(hostile.nested_outcome(), Some(HOST_REJECTED));
    assert_eq!(hostile.transfers(), 3);

    let room = rooms.fetch_game_room_details(&room_id);
    assert_eq!(room.status, RoomStatus::Cancelled);
    assert_eq!(room.total_prize_pool, 0);
}

#[test]
fn test_failed_refund_rolls_back_whole_cancel() {
    let env = Env::default();
    let flaky_id = env.register(FlakyToken, ());
    let flaky = FlakyTokenClient::new(&env, &flaky_id);
    let (rooms, _, room_id, [creator, _, _]) =
        room_with_three_players(&env, &flaky_id, SplitRule::Top1);

    assert_eq!(
        rooms.try_cancel_game_room(&creator, &room_id),
        Err(Ok(Error::TokenTransferFailed))
    );

    let room = rooms.fetch_game_room_details(&room_id);
    assert_eq!(room.status, RoomStatus::Pending);
    assert_eq!(room.total_prize_pool, 300);
    assert_eq!(room.active_players_count, 3);
    assert_eq!(flaky.transfers(), 0);
}

#[test]
fn test_failed_payout_rolls_back_whole_completion() {
    let env = Env::default();
    let flaky_id = env.register(FlakyToken, ());
    let flaky = FlakyTokenClient::new(&env, &flaky_id);
    let (rooms, _, room_id, [creator, alice, bob]) =
        room_with_three_players(&env, &flaky_id, SplitRule::Top2);

    env.ledger().set_timestamp(100);
    rooms.start_game_room(&creator, &room_id);
    rooms.update_score(&creator, &room_id, &alice, &30u64);
    rooms.update_score(&creator, &room_id, &bob, &20u64);

    env.ledger().set_timestamp(200);
    assert_eq!(
        rooms.try_complete_game_room(&creator, &room_id),
        Err(Ok(Error::TokenTransferFailed))
    );

    let room = rooms.fetch_game_room_details(&room_id);
    assert_eq!(room.status, RoomStatus::Active);
    assert_eq!(room.total_prize_pool, 300);
    assert_eq!(rooms.get_payouts(&room_id).len(), 0);
    assert_eq!(flaky.transfers(), 0);
}

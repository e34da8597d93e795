//! GameRoom Escrow Contract
//!
//! Escrow for timed, multi-player competitions. Each room collects a fixed
//! SEP-41 entry fee from every participant into a shared pool. The room's
//! creator starts the competition, records scores while it runs and, once the
//! end time has passed, completes the room. Completion splits the pool among
//! the top scorers according to the room's split rule.
//!
//! ## Lifecycle
//! `Pending -> Active -> Completed` or `Pending -> Cancelled`. Join and leave
//! are only legal while Pending, score updates only while Active. Terminal
//! rooms stay queryable.
//!
//! ## Storage Strategy
//! - `instance()`: Admin, Paused, token addresses per currency, RoomCounter
//!   and the reentrancy lock.
//! - `persistent()`: one `Room` entry per room plus per-participant
//!   membership and score entries, and the payout record of completed rooms.
//!
//! ## Invariant
//! While a room is Pending or Active,
//! `total_prize_pool == entry_fee * active_players_count` and
//! `active_players_count == participant_list.len()`. Every storage write of
//! an operation happens before its token transfers.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, Address, Env, String, Vec,
};

mod custody;
mod distribution;
mod guard;
mod storage;

pub use custody::{Custody, TokenVault, Vault};
pub use distribution::{compute_payouts, top_ranked};

use guard::ReentrancyGuard;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Upper bound on `max_players`. Keeps the refund and payout loops inside the
/// per-invocation resource budget.
pub const MAX_PLAYERS_PER_ROOM: u32 = 100;

/// Persistent storage TTL in ledgers (~30 days at 5 s/ledger).
pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;

/// First id handed out by `create_game_room`.
pub const FIRST_ROOM_ID: u64 = 1;

// ---------------------------------------------------------------------------
// Error Types
// ---------------------------------------------------------------------------

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    NotAuthorized = 3,
    Unauthorized = 4,
    InvalidRoomId = 5,
    RoomNotFound = 6,
    InvalidAmount = 7,
    InvalidMaxPlayers = 8,
    InvalidTimeWindow = 9,
    GameRoomNotPending = 10,
    GameRoomNotActive = 11,
    InvalidTime = 12,
    MaxPlayersReached = 13,
    ParticipantAlreadyInRoom = 14,
    ParticipantNotInRoom = 15,
    CreatorCannotLeave = 16,
    InsufficientBalance = 17,
    InsufficientAllowance = 18,
    TokenTransferFailed = 19,
    ContractPaused = 20,
    AlreadyPaused = 21,
    NotPaused = 22,
    Reentrancy = 23,
    Overflow = 24,
}

impl From<gameroom_shared::Error> for Error {
    fn from(err: gameroom_shared::Error) -> Self {
        match err {
            gameroom_shared::Error::InvalidAmount => Error::InvalidAmount,
            gameroom_shared::Error::InvalidWeights | gameroom_shared::Error::Overflow => {
                Error::Overflow
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Storage Types
// ---------------------------------------------------------------------------

/// Selects which configured token contract custodies a room's funds.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Currency {
    Usdc = 0,
    Usdt = 1,
}

/// How the pool is divided among the ranked participants at completion.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum SplitRule {
    /// Rank 1 takes the whole pool.
    Top1 = 0,
    /// 60% to rank 1, the remainder to rank 2.
    Top2 = 1,
    /// 50% to rank 1, 30% to rank 2, the remainder to rank 3.
    Top3 = 2,
}

impl SplitRule {
    /// Basis-point weight of each paid rank. The last paid rank always
    /// receives the remainder rather than its nominal weight.
    pub fn weights_bps(&self) -> &'static [u32] {
        match self {
            SplitRule::Top1 => &[10_000],
            SplitRule::Top2 => &[6_000, 4_000],
            SplitRule::Top3 => &[5_000, 3_000, 2_000],
        }
    }

    pub fn tiers(&self) -> u32 {
        self.weights_bps().len() as u32
    }
}

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum RoomStatus {
    Pending = 0,
    Active = 1,
    Cancelled = 2,
    Completed = 3,
}

/// Arguments to `create_game_room`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreateRoomParams {
    pub name: String,
    pub entry_fee: i128,
    pub max_players: u32,
    pub start_time: u64,
    pub end_time: u64,
    pub split_rule: SplitRule,
    pub currency: Currency,
}

/// Full room record, returned as-is by `fetch_game_room_details`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Room {
    pub id: u64,
    pub name: String,
    pub entry_fee: i128,
    pub max_players: u32,
    pub start_time: u64,
    pub end_time: u64,
    /// Stakes currently held for this room. Set to 0 once the room is
    /// cancelled or completed and the funds are assigned to recipients.
    pub total_prize_pool: i128,
    pub created_at: u64,
    pub active_players_count: u32,
    pub currency: Currency,
    pub split_rule: SplitRule,
    pub status: RoomStatus,
    pub creator: Address,
    /// Join order; the creator is always at index 0.
    pub participant_list: Vec<Address>,
}

/// One prize transfer made at completion.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Payout {
    pub recipient: Address,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    // --- instance() ---
    Admin,
    Paused,
    Token(Currency),
    RoomCounter,
    Lock,
    // --- persistent() ---
    Room(u64),
    Member(u64, Address),
    Score(u64, Address),
    Payouts(u64),
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct Initialized {
    #[topic]
    pub admin: Address,
    pub usdc_token: Address,
    pub usdt_token: Address,
}

#[contractevent]
pub struct PauseChanged {
    pub paused: bool,
    pub admin: Address,
}

#[contractevent]
pub struct RoomCreated {
    #[topic]
    pub room_id: u64,
    #[topic]
    pub creator: Address,
    pub name: String,
    pub entry_fee: i128,
    pub max_players: u32,
    pub split_rule: SplitRule,
    pub currency: Currency,
}

#[contractevent]
pub struct RoomJoined {
    #[topic]
    pub room_id: u64,
    #[topic]
    pub participant: Address,
    pub entry_fee: i128,
}

#[contractevent]
pub struct RoomParticipantLeft {
    #[topic]
    pub room_id: u64,
    #[topic]
    pub participant: Address,
    pub room_name: String,
}

#[contractevent]
pub struct RoomStarted {
    #[topic]
    pub room_id: u64,
    pub time_started: u64,
}

#[contractevent]
pub struct RoomCancelled {
    #[topic]
    pub room_id: u64,
    pub name: String,
    pub refunded: i128,
}

#[contractevent]
pub struct ScoreUpdated {
    #[topic]
    pub room_id: u64,
    #[topic]
    pub participant: Address,
    pub score: u64,
}

#[contractevent]
pub struct RoomCompleted {
    #[topic]
    pub room_id: u64,
    pub name: String,
    pub total_paid: i128,
    pub winners: u32,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct GameRoom;

#[contractimpl]
impl GameRoom {
    // -----------------------------------------------------------------------
    // configuration
    // -----------------------------------------------------------------------

    /// Initialize the contract. May only be called once.
    ///
    /// `usdc_token` and `usdt_token` are the SEP-41 contracts custodying rooms
    /// created with `Currency::Usdc` and `Currency::Usdt` respectively.
    pub fn init(
        env: Env,
        admin: Address,
        usdc_token: Address,
        usdt_token: Address,
    ) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }

        admin.require_auth();

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Paused, &false);
        env.storage()
            .instance()
            .set(&DataKey::Token(Currency::Usdc), &usdc_token);
        env.storage()
            .instance()
            .set(&DataKey::Token(Currency::Usdt), &usdt_token);
        env.storage()
            .instance()
            .set(&DataKey::RoomCounter, &FIRST_ROOM_ID);

        Initialized {
            admin,
            usdc_token,
            usdt_token,
        }
        .publish(&env);

        Ok(())
    }

    /// Block room creation, joins, starts, score updates and completions.
    /// Leaving and cancelling stay available so stakes can always be
    /// returned.
    pub fn pause(env: Env, admin: Address) -> Result<(), Error> {
        storage::require_admin(&env, &admin)?;
        if storage::is_paused(&env) {
            return Err(Error::AlreadyPaused);
        }

        env.storage().instance().set(&DataKey::Paused, &true);
        PauseChanged {
            paused: true,
            admin,
        }
        .publish(&env);
        Ok(())
    }

    pub fn unpause(env: Env, admin: Address) -> Result<(), Error> {
        storage::require_admin(&env, &admin)?;
        if !storage::is_paused(&env) {
            return Err(Error::NotPaused);
        }

        env.storage().instance().set(&DataKey::Paused, &false);
        PauseChanged {
            paused: false,
            admin,
        }
        .publish(&env);
        Ok(())
    }

    pub fn is_paused(env: Env) -> bool {
        storage::is_paused(&env)
    }

    /// Token contract bound to `currency`.
    pub fn token_for(env: Env, currency: Currency) -> Result<Address, Error> {
        storage::require_initialized(&env)?;
        storage::get_token(&env, currency)
    }

    /// Amount of `currency` currently held by this contract across all rooms.
    pub fn custody_balance(env: Env, currency: Currency) -> Result<i128, Error> {
        storage::require_initialized(&env)?;
        let vault = Vault::for_currency(&env, currency)?;
        Ok(vault.balance(&env.current_contract_address()))
    }

    // -----------------------------------------------------------------------
    // room registry
    // -----------------------------------------------------------------------

    /// Create a room and enrol `creator` as its first participant.
    ///
    /// The creator's entry fee is pulled with `transfer_from`, so the creator
    /// must have approved this contract for at least `entry_fee` on the
    /// room's token beforehand. Returns the new room id.
    pub fn create_game_room(
        env: Env,
        creator: Address,
        params: CreateRoomParams,
    ) -> Result<u64, Error> {
        storage::require_initialized(&env)?;
        storage::ensure_not_paused(&env)?;
        let _lock = ReentrancyGuard::acquire(&env)?;

        creator.require_auth();

        if params.entry_fee <= 0 {
            return Err(Error::InvalidAmount);
        }
        if params.max_players == 0 || params.max_players > MAX_PLAYERS_PER_ROOM {
            return Err(Error::InvalidMaxPlayers);
        }
        if params.end_time <= params.start_time {
            return Err(Error::InvalidTimeWindow);
        }

        let vault = Vault::for_currency(&env, params.currency)?;
        let room_id = storage::next_room_id(&env)?;

        let mut participant_list = Vec::new(&env);
        participant_list.push_back(creator.clone());

        let room = Room {
            id: room_id,
            name: params.name.clone(),
            entry_fee: params.entry_fee,
            max_players: params.max_players,
            start_time: params.start_time,
            end_time: params.end_time,
            total_prize_pool: params.entry_fee,
            created_at: env.ledger().timestamp(),
            active_players_count: 1,
            currency: params.currency,
            split_rule: params.split_rule,
            status: RoomStatus::Pending,
            creator: creator.clone(),
            participant_list,
        };
        storage::save_room(&env, &room);
        storage::set_member(&env, room_id, &creator);

        vault.collect(&creator, params.entry_fee)?;

        RoomCreated {
            room_id,
            creator,
            name: params.name,
            entry_fee: params.entry_fee,
            max_players: params.max_players,
            split_rule: params.split_rule,
            currency: params.currency,
        }
        .publish(&env);

        Ok(room_id)
    }

    pub fn fetch_game_room_details(env: Env, room_id: u64) -> Result<Room, Error> {
        storage::require_initialized(&env)?;
        storage::get_room(&env, room_id)
    }

    /// The id the next `create_game_room` call will assign.
    pub fn room_counter(env: Env) -> Result<u64, Error> {
        storage::require_initialized(&env)?;
        Ok(storage::room_counter(&env))
    }

    // -----------------------------------------------------------------------
    // participation ledger
    // -----------------------------------------------------------------------

    /// Join a Pending room, paying its entry fee.
    pub fn add_to_room(env: Env, participant: Address, room_id: u64) -> Result<(), Error> {
        storage::require_initialized(&env)?;
        storage::ensure_not_paused(&env)?;
        let _lock = ReentrancyGuard::acquire(&env)?;

        participant.require_auth();

        let mut room = storage::get_room(&env, room_id)?;
        if room.status != RoomStatus::Pending {
            return Err(Error::GameRoomNotPending);
        }
        if storage::is_member(&env, room_id, &participant) {
            return Err(Error::ParticipantAlreadyInRoom);
        }
        if room.active_players_count >= room.max_players {
            return Err(Error::MaxPlayersReached);
        }

        room.participant_list.push_back(participant.clone());
        room.active_players_count = room
            .active_players_count
            .checked_add(1)
            .ok_or(Error::Overflow)?;
        room.total_prize_pool = room
            .total_prize_pool
            .checked_add(room.entry_fee)
            .ok_or(Error::Overflow)?;
        storage::save_room(&env, &room);
        storage::set_member(&env, room_id, &participant);

        Vault::for_currency(&env, room.currency)?.collect(&participant, room.entry_fee)?;

        RoomJoined {
            room_id,
            participant,
            entry_fee: room.entry_fee,
        }
        .publish(&env);

        Ok(())
    }

    /// Leave a Pending room and get the entry fee back.
    ///
    /// The refund does not restore the allowance consumed when joining; a
    /// participant who wants to rejoin has to approve the contract again.
    /// The creator cannot leave; cancelling the room is their exit.
    pub fn leave_game_room(env: Env, participant: Address, room_id: u64) -> Result<(), Error> {
        storage::require_initialized(&env)?;
        let _lock = ReentrancyGuard::acquire(&env)?;

        participant.require_auth();

        let mut room = storage::get_room(&env, room_id)?;
        if room.status != RoomStatus::Pending {
            return Err(Error::GameRoomNotPending);
        }
        if !storage::is_member(&env, room_id, &participant) {
            return Err(Error::ParticipantNotInRoom);
        }
        if participant == room.creator {
            return Err(Error::CreatorCannotLeave);
        }

        let index = room
            .participant_list
            .first_index_of(&participant)
            .ok_or(Error::ParticipantNotInRoom)?;
        room.participant_list.remove(index);
        room.active_players_count = room
            .active_players_count
            .checked_sub(1)
            .ok_or(Error::Overflow)?;
        room.total_prize_pool = room
            .total_prize_pool
            .checked_sub(room.entry_fee)
            .ok_or(Error::Overflow)?;
        storage::save_room(&env, &room);
        storage::remove_member(&env, room_id, &participant);

        Vault::for_currency(&env, room.currency)?.pay(&participant, room.entry_fee)?;

        RoomParticipantLeft {
            room_id,
            participant,
            room_name: room.name,
        }
        .publish(&env);

        Ok(())
    }

    /// Overwrite a participant's score. Creator only, Active rooms only.
    pub fn update_score(
        env: Env,
        caller: Address,
        room_id: u64,
        participant: Address,
        score: u64,
    ) -> Result<(), Error> {
        storage::require_initialized(&env)?;
        storage::ensure_not_paused(&env)?;
        let _lock = ReentrancyGuard::acquire(&env)?;

        caller.require_auth();

        let room = storage::get_room(&env, room_id)?;
        require_creator(&room, &caller)?;
        if room.status != RoomStatus::Active {
            return Err(Error::GameRoomNotActive);
        }
        if !storage::is_member(&env, room_id, &participant) {
            return Err(Error::ParticipantNotInRoom);
        }

        storage::set_score(&env, room_id, &participant, score);

        ScoreUpdated {
            room_id,
            participant,
            score,
        }
        .publish(&env);

        Ok(())
    }

    /// Recorded score of `participant`; 0 if never set.
    pub fn get_score(env: Env, room_id: u64, participant: Address) -> Result<u64, Error> {
        storage::require_initialized(&env)?;
        storage::get_room(&env, room_id)?;
        Ok(storage::get_score(&env, room_id, &participant))
    }

    pub fn get_participants(env: Env, room_id: u64) -> Result<Vec<Address>, Error> {
        storage::require_initialized(&env)?;
        Ok(storage::get_room(&env, room_id)?.participant_list)
    }

    pub fn is_participant(env: Env, room_id: u64, who: Address) -> Result<bool, Error> {
        storage::require_initialized(&env)?;
        storage::get_room(&env, room_id)?;
        Ok(storage::is_member(&env, room_id, &who))
    }

    // -----------------------------------------------------------------------
    // lifecycle
    // -----------------------------------------------------------------------

    /// Move a Pending room to Active once its start time has been reached.
    pub fn start_game_room(env: Env, caller: Address, room_id: u64) -> Result<(), Error> {
        storage::require_initialized(&env)?;
        storage::ensure_not_paused(&env)?;
        let _lock = ReentrancyGuard::acquire(&env)?;

        caller.require_auth();

        let mut room = storage::get_room(&env, room_id)?;
        require_creator(&room, &caller)?;
        if room.status != RoomStatus::Pending {
            return Err(Error::GameRoomNotPending);
        }
        let now = env.ledger().timestamp();
        if now < room.start_time {
            return Err(Error::InvalidTime);
        }

        room.status = RoomStatus::Active;
        storage::save_room(&env, &room);

        RoomStarted {
            room_id,
            time_started: now,
        }
        .publish(&env);

        Ok(())
    }

    /// Cancel a Pending room and refund every participant's entry fee.
    ///
    /// The room is marked Cancelled before the first refund goes out. If any
    /// refund fails the whole call fails and nothing is refunded.
    pub fn cancel_game_room(env: Env, caller: Address, room_id: u64) -> Result<(), Error> {
        storage::require_initialized(&env)?;
        let _lock = ReentrancyGuard::acquire(&env)?;

        caller.require_auth();

        let mut room = storage::get_room(&env, room_id)?;
        require_creator(&room, &caller)?;
        if room.status != RoomStatus::Pending {
            return Err(Error::GameRoomNotPending);
        }

        let refunded = room.total_prize_pool;
        room.status = RoomStatus::Cancelled;
        room.total_prize_pool = 0;
        storage::save_room(&env, &room);

        let vault = Vault::for_currency(&env, room.currency)?;
        for participant in room.participant_list.iter() {
            vault.pay(&participant, room.entry_fee)?;
        }

        RoomCancelled {
            room_id,
            name: room.name,
            refunded,
        }
        .publish(&env);

        Ok(())
    }

    /// Close an Active room after its end time and pay out the pool.
    ///
    /// Participants are ranked by score, highest first; equal scores keep
    /// join order. Returns the payouts made, which are also kept for
    /// `get_payouts`.
    pub fn complete_game_room(
        env: Env,
        caller: Address,
        room_id: u64,
    ) -> Result<Vec<Payout>, Error> {
        storage::require_initialized(&env)?;
        storage::ensure_not_paused(&env)?;
        let _lock = ReentrancyGuard::acquire(&env)?;

        caller.require_auth();

        let mut room = storage::get_room(&env, room_id)?;
        require_creator(&room, &caller)?;
        if room.status != RoomStatus::Active {
            return Err(Error::GameRoomNotActive);
        }
        if env.ledger().timestamp() < room.end_time {
            return Err(Error::InvalidTime);
        }

        let payouts = distribution::settle(&env, &room)?;
        let mut total_paid: i128 = 0;
        for payout in payouts.iter() {
            total_paid = total_paid
                .checked_add(payout.amount)
                .ok_or(Error::Overflow)?;
        }

        room.status = RoomStatus::Completed;
        room.total_prize_pool = 0;
        storage::save_room(&env, &room);
        storage::set_payouts(&env, room_id, &payouts);

        let vault = Vault::for_currency(&env, room.currency)?;
        for payout in payouts.iter() {
            vault.pay(&payout.recipient, payout.amount)?;
        }

        RoomCompleted {
            room_id,
            name: room.name,
            total_paid,
            winners: payouts.len(),
        }
        .publish(&env);

        Ok(payouts)
    }

    /// Payouts recorded when the room completed; empty before that.
    pub fn get_payouts(env: Env, room_id: u64) -> Result<Vec<Payout>, Error> {
        storage::require_initialized(&env)?;
        storage::get_room(&env, room_id)?;
        Ok(storage::get_payouts(&env, room_id))
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn require_creator(room: &Room, caller: &Address) -> Result<(), Error> {
    if caller != &room.creator {
        return Err(Error::Unauthorized);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

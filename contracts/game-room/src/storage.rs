//! Typed accessors over the contract's ledger storage.

use soroban_sdk::{Address, Env, IntoVal, Val, Vec};

use crate::{Currency, DataKey, Error, Payout, Room, FIRST_ROOM_ID, PERSISTENT_BUMP_LEDGERS};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub(crate) fn require_initialized(env: &Env) -> Result<(), Error> {
    if !env.storage().instance().has(&DataKey::Admin) {
        return Err(Error::NotInitialized);
    }
    Ok(())
}

/// Verify that `caller` is the stored admin and has signed the invocation.
pub(crate) fn require_admin(env: &Env, caller: &Address) -> Result<(), Error> {
    let admin: Address = env
        .storage()
        .instance()
        .get(&DataKey::Admin)
        .ok_or(Error::NotInitialized)?;
    caller.require_auth();
    if caller != &admin {
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

pub(crate) fn is_paused(env: &Env) -> bool {
    env.storage()
        .instance()
        .get(&DataKey::Paused)
        .unwrap_or(false)
}

pub(crate) fn ensure_not_paused(env: &Env) -> Result<(), Error> {
    if is_paused(env) {
        return Err(Error::ContractPaused);
    }
    Ok(())
}

pub(crate) fn get_token(env: &Env, currency: Currency) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Token(currency))
        .ok_or(Error::NotInitialized)
}

// ---------------------------------------------------------------------------
// Room registry
// ---------------------------------------------------------------------------

pub(crate) fn room_counter(env: &Env) -> u64 {
    env.storage()
        .instance()
        .get(&DataKey::RoomCounter)
        .unwrap_or(FIRST_ROOM_ID)
}

/// Hand out the next room id and advance the counter.
pub(crate) fn next_room_id(env: &Env) -> Result<u64, Error> {
    let id = room_counter(env);
    let next = id.checked_add(1).ok_or(Error::Overflow)?;
    env.storage().instance().set(&DataKey::RoomCounter, &next);
    Ok(id)
}

pub(crate) fn get_room(env: &Env, room_id: u64) -> Result<Room, Error> {
    if room_id == 0 {
        return Err(Error::InvalidRoomId);
    }

    env.storage()
        .persistent()
        .get(&DataKey::Room(room_id))
        .ok_or(Error::RoomNotFound)
}

pub(crate) fn save_room(env: &Env, room: &Room) {
    set_persistent(env, DataKey::Room(room.id), room);
}

// ---------------------------------------------------------------------------
// Participation ledger
// ---------------------------------------------------------------------------

pub(crate) fn is_member(env: &Env, room_id: u64, who: &Address) -> bool {
    env.storage()
        .persistent()
        .has(&DataKey::Member(room_id, who.clone()))
}

pub(crate) fn set_member(env: &Env, room_id: u64, who: &Address) {
    set_persistent(env, DataKey::Member(room_id, who.clone()), &true);
}

pub(crate) fn remove_member(env: &Env, room_id: u64, who: &Address) {
    env.storage()
        .persistent()
        .remove(&DataKey::Member(room_id, who.clone()));
}

pub(crate) fn get_score(env: &Env, room_id: u64, who: &Address) -> u64 {
    env.storage()
        .persistent()
        .get(&DataKey::Score(room_id, who.clone()))
        .unwrap_or(0)
}

pub(crate) fn set_score(env: &Env, room_id: u64, who: &Address, score: u64) {
    set_persistent(env, DataKey::Score(room_id, who.clone()), &score);
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

pub(crate) fn get_payouts(env: &Env, room_id: u64) -> Vec<Payout> {
    env.storage()
        .persistent()
        .get(&DataKey::Payouts(room_id))
        .unwrap_or(Vec::new(env))
}

pub(crate) fn set_payouts(env: &Env, room_id: u64, payouts: &Vec<Payout>) {
    set_persistent(env, DataKey::Payouts(room_id), payouts);
}

// ---------------------------------------------------------------------------
// TTL
// ---------------------------------------------------------------------------

/// Write a persistent entry and extend its TTL in one step.
fn set_persistent<T>(env: &Env, key: DataKey, value: &T)
where
    T: IntoVal<Env, Val>,
{
    env.storage().persistent().set(&key, value);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}

//! Reentrancy lock held for the duration of every mutating call.

use soroban_sdk::{log, Env};

use crate::{DataKey, Error};

/// Scoped lock over instance storage. The host already refuses a call that
/// re-enters this contract, so the flag is a second barrier: acquiring fails
/// whenever it is found held. Dropping the guard releases it on every exit
/// path.
pub(crate) struct ReentrancyGuard<'a> {
    env: &'a Env,
}

impl<'a> ReentrancyGuard<'a> {
    pub(crate) fn acquire(env: &'a Env) -> Result<Self, Error> {
        if env.storage().instance().has(&DataKey::Lock) {
            log!(env, "reentrant call rejected");
            return Err(Error::Reentrancy);
        }
        env.storage().instance().set(&DataKey::Lock, &true);
        Ok(Self { env })
    }
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        self.env.storage().instance().remove(&DataKey::Lock);
    }
}

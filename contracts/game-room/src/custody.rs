//! Token custody.
//!
//! Rooms never talk to a token contract directly. They go through a [`Vault`]
//! picked by the room's [`Currency`], which exposes the same three
//! operations whichever token backs it. Both supported tokens speak SEP-41.

use soroban_sdk::{log, token::TokenClient, Address, Env};

use crate::{storage, Currency, Error};

/// Fund movements a room needs from its token.
pub trait Custody {
    /// Pull `amount` from `from` into the contract. `from` must have approved
    /// the contract as spender for at least `amount`.
    fn collect(&self, from: &Address, amount: i128) -> Result<(), Error>;

    /// Push `amount` from the contract to `to`.
    fn pay(&self, to: &Address, amount: i128) -> Result<(), Error>;

    fn balance(&self, of: &Address) -> i128;
}

/// A SEP-41 token held on behalf of rooms.
pub struct TokenVault {
    env: Env,
    token: Address,
}

impl TokenVault {
    pub fn new(env: &Env, token: Address) -> Self {
        Self {
            env: env.clone(),
            token,
        }
    }

    fn client(&self) -> TokenClient<'_> {
        TokenClient::new(&self.env, &self.token)
    }
}

impl Custody for TokenVault {
    fn collect(&self, from: &Address, amount: i128) -> Result<(), Error> {
        let client = self.client();
        let spender = self.env.current_contract_address();

        if client.allowance(from, &spender) < amount {
            return Err(Error::InsufficientAllowance);
        }
        if client.balance(from) < amount {
            return Err(Error::InsufficientBalance);
        }

        match client.try_transfer_from(&spender, from, &spender, &amount) {
            Ok(Ok(())) => Ok(()),
            _ => {
                log!(&self.env, "collect failed", self.token, from.clone(), amount);
                Err(Error::TokenTransferFailed)
            }
        }
    }

    fn pay(&self, to: &Address, amount: i128) -> Result<(), Error> {
        if amount == 0 {
            return Ok(());
        }

        let from = self.env.current_contract_address();
        match self.client().try_transfer(&from, to, &amount) {
            Ok(Ok(())) => Ok(()),
            _ => {
                log!(&self.env, "pay failed", self.token, to.clone(), amount);
                Err(Error::TokenTransferFailed)
            }
        }
    }

    fn balance(&self, of: &Address) -> i128 {
        self.client().balance(of)
    }
}

/// The closed set of tokens a room can be denominated in.
pub enum Vault {
    Usdc(TokenVault),
    Usdt(TokenVault),
}

impl Vault {
    /// Vault for the token configured under `currency`.
    pub fn for_currency(env: &Env, currency: Currency) -> Result<Self, Error> {
        let token = storage::get_token(env, currency)?;
        let vault = TokenVault::new(env, token);
        Ok(match currency {
            Currency::Usdc => Vault::Usdc(vault),
            Currency::Usdt => Vault::Usdt(vault),
        })
    }

    fn adapter(&self) -> &TokenVault {
        match self {
            Vault::Usdc(vault) | Vault::Usdt(vault) => vault,
        }
    }
}

impl Custody for Vault {
    fn collect(&self, from: &Address, amount: i128) -> Result<(), Error> {
        self.adapter().collect(from, amount)
    }

    fn pay(&self, to: &Address, amount: i128) -> Result<(), Error> {
        self.adapter().pay(to, amount)
    }

    fn balance(&self, of: &Address) -> i128 {
        self.adapter().balance(of)
    }
}

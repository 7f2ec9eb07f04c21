// Allow `cargo stylus export-abi` to generate a main function.
#![cfg_attr(not(any(test, feature = "export-abi")), no_main)]
#![cfg_attr(not(any(test, feature = "export-abi")), no_std)]

#[macro_use]
extern crate alloc;

use alloc::vec::Vec;

use stylus_sdk::{
    alloy_primitives::{Address, U256},
    alloy_sol_types::{sol, SolCall},
    console,
    prelude::*,
    stylus_core::calls::context::Call,
};

pub mod pricing;
pub mod window;

use pricing::PriceError;

// Error and event definitions
sol! {
    #[derive(Debug)]
    error Unauthorized();
    #[derive(Debug)]
    error CooldownActive();
    #[derive(Debug)]
    error NotAllowed();
    #[derive(Debug)]
    error OracleError();
    #[derive(Debug)]
    error TransferFailed();
    #[derive(Debug)]
    error InsufficientBalance();
    #[derive(Debug)]
    error InvalidConfiguration();
    #[derive(Debug)]
    error IndexOutOfBounds();

    event Received(address indexed sender, uint256 amount);
    event Withdrew(address indexed to, uint256 amount);
    event PayeeUpdated(address indexed previous, address indexed current);
    event WhitelistAdded(address indexed account, uint256 enrolledAt);
    event WhitelistRemoved(address indexed account);
}

#[derive(SolidityError, Debug)]
pub enum WalletErrors {
    Unauthorized(Unauthorized),
    CooldownActive(CooldownActive),
    NotAllowed(NotAllowed),
    OracleError(OracleError),
    TransferFailed(TransferFailed),
    InsufficientBalance(InsufficientBalance),
    InvalidConfiguration(InvalidConfiguration),
    IndexOutOfBounds(IndexOutOfBounds),
}

impl From<PriceError> for WalletErrors {
    fn from(_: PriceError) -> Self {
        WalletErrors::OracleError(OracleError {})
    }
}

// Chainlink aggregator interface
sol! {
    interface IAggregatorV3 {
        function decimals() external view returns (uint8);
        function latestRoundData() external view returns (uint80 roundId, int256 answer, uint256 startedAt, uint256 updatedAt, uint80 answeredInRound);
    }
}

sol_storage! {
    #[entrypoint]
    pub struct AllowanceWallet {
        address owner;
        uint256 daily_limit_usd; // Quote-currency cap, see pricing::LIMIT_DECIMALS
        address oracle;
        uint256 oracle_decimals;

        // Zero address means no payee
        address payee;

        mapping(address => uint256) last_withdrawal;
        mapping(address => bool) has_withdrawn;

        // Emergency whitelist, insertion ordered
        address[] whitelist;
        mapping(address => bool) whitelisted;
        mapping(address => uint256) whitelist_enrolled_at;
    }
}

#[public]
impl AllowanceWallet {
    #[constructor]
    pub fn constructor(
        &mut self,
        owner: Address,
        daily_limit_usd: U256,
        oracle: Address,
        oracle_decimals: u8,
    ) -> Result<(), WalletErrors> {
        if self.owner.get() != Address::ZERO {
            return Err(WalletErrors::Unauthorized(Unauthorized {}));
        }
        if owner == Address::ZERO || oracle == Address::ZERO || daily_limit_usd == U256::ZERO {
            return Err(WalletErrors::InvalidConfiguration(InvalidConfiguration {}));
        }

        self.owner.set(owner);
        self.daily_limit_usd.set(daily_limit_usd);
        self.oracle.set(oracle);
        self.oracle_decimals.set(U256::from(oracle_decimals));

        Ok(())
    }

    #[receive]
    #[payable]
    pub fn receive(&mut self) -> Result<(), Vec<u8>> {
        let sender = self.vm().msg_sender();
        let amount = self.vm().msg_value();

        log(self.vm(), Received { sender, amount });

        Ok(())
    }

    // === ALLOWANCE === //

    pub fn receive_allowance(&mut self) -> Result<(), WalletErrors> {
        let caller = self.vm().msg_sender();
        self.only_owner_or_payee(caller)?;

        let now = U256::from(self.vm().block_timestamp());
        if !window::cooldown_elapsed(self.last_withdrawal_of(caller), now) {
            return Err(WalletErrors::CooldownActive(CooldownActive {}));
        }

        let amount = self.quote_daily_allowance()?;
        if self.current_balance() < amount {
            return Err(WalletErrors::InsufficientBalance(InsufficientBalance {}));
        }

        // Cooldown is committed before any value leaves the wallet
        self.last_withdrawal.setter(caller).set(now);
        self.has_withdrawn.setter(caller).set(true);

        self.send_value(caller, amount)?;

        console!("allowance of {} wei sent to {}", amount, caller);
        log(self.vm(), Withdrew { to: caller, amount });

        Ok(())
    }

    // === PAYEE MANAGEMENT === //

    pub fn add_payee(&mut self, payee: Address) -> Result<(), WalletErrors> {
        self.only_owner()?;

        if payee == self.owner.get() {
            return Err(WalletErrors::InvalidConfiguration(InvalidConfiguration {}));
        }

        let previous = self.payee.get();
        self.payee.set(payee);

        log(self.vm(), PayeeUpdated { previous, current: payee });

        Ok(())
    }

    // === WHITELIST MANAGEMENT === //

    pub fn add_whitelist(&mut self, account: Address) -> Result<(), WalletErrors> {
        self.only_owner()?;

        if account == Address::ZERO || account == self.owner.get() {
            return Err(WalletErrors::InvalidConfiguration(InvalidConfiguration {}));
        }
        if self.whitelisted.get(account) {
            return Ok(());
        }

        let enrolled_at = U256::from(self.vm().block_timestamp());
        self.whitelist.push(account);
        self.whitelisted.setter(account).set(true);
        self.whitelist_enrolled_at.setter(account).set(enrolled_at);

        log(self.vm(), WhitelistAdded { account, enrolledAt: enrolled_at });

        Ok(())
    }

    pub fn remove_whitelist(&mut self, account: Address) -> Result<(), WalletErrors> {
        self.only_owner()?;

        if !self.whitelisted.get(account) {
            return Ok(());
        }

        let len = self.whitelist.len();
        let Some(index) = (0..len).find(|&i| self.whitelist.get(i) == Some(account)) else {
            return Ok(());
        };

        // Shift the tail left by one so the remaining entries keep their order
        for i in index..len - 1 {
            let next = self.whitelist.get(i + 1).unwrap_or_default();
            if let Some(mut slot) = self.whitelist.setter(i) {
                slot.set(next);
            }
        }
        self.whitelist.pop();

        self.whitelisted.setter(account).set(false);
        self.whitelist_enrolled_at.setter(account).set(U256::ZERO);

        log(self.vm(), WhitelistRemoved { account });

        Ok(())
    }

    // === EMERGENCY FUNCTIONS === //

    pub fn emergency_withdraw(&mut self) -> Result<(), WalletErrors> {
        let caller = self.vm().msg_sender();
        let now = U256::from(self.vm().block_timestamp());

        // Owner, unlisted and still-locked callers all get the same error
        let unlocked = self.whitelisted.get(caller)
            && window::has_elapsed(
                self.whitelist_enrolled_at.get(caller),
                now,
                window::EMERGENCY_TIMELOCK,
            );
        if caller == self.owner.get() || !unlocked {
            return Err(WalletErrors::NotAllowed(NotAllowed {}));
        }

        let amount = self.current_balance();

        self.last_withdrawal.setter(caller).set(now);
        self.has_withdrawn.setter(caller).set(true);

        self.send_value(caller, amount)?;

        console!("emergency sweep of {} wei by {}", amount, caller);
        log(self.vm(), Withdrew { to: caller, amount });

        Ok(())
    }

    // === VIEW FUNCTIONS === //

    pub fn get_balance(&self) -> U256 {
        self.current_balance()
    }

    pub fn owner(&self) -> Address {
        self.owner.get()
    }

    pub fn payee(&self) -> Address {
        self.payee.get()
    }

    pub fn daily_limit_usd(&self) -> U256 {
        self.daily_limit_usd.get()
    }

    pub fn oracle(&self) -> Address {
        self.oracle.get()
    }

    pub fn oracle_decimals(&self) -> U256 {
        self.oracle_decimals.get()
    }

    /// Current wei value of the daily limit.
    pub fn daily_allowance(&self) -> Result<U256, WalletErrors> {
        self.quote_daily_allowance()
    }

    pub fn whitelist(&self, index: U256) -> Result<Address, WalletErrors> {
        if index >= U256::from(self.whitelist.len()) {
            return Err(WalletErrors::IndexOutOfBounds(IndexOutOfBounds {}));
        }
        self.whitelist
            .get(index.as_limbs()[0] as usize)
            .ok_or(WalletErrors::IndexOutOfBounds(IndexOutOfBounds {}))
    }

    pub fn whitelist_length(&self) -> U256 {
        U256::from(self.whitelist.len())
    }

    pub fn is_whitelisted(&self, account: Address) -> bool {
        self.whitelisted.get(account)
    }

    pub fn whitelisted_at(&self, account: Address) -> U256 {
        self.whitelist_enrolled_at.get(account)
    }

    /// Zero when `account` never withdrew.
    pub fn last_withdrawal(&self, account: Address) -> U256 {
        self.last_withdrawal_of(account).unwrap_or_default()
    }

    pub fn next_allowance_at(&self, account: Address) -> U256 {
        let now = U256::from(self.vm().block_timestamp());
        window::next_allowance_at(self.last_withdrawal_of(account), now)
    }

    pub fn emergency_unlock_at(&self, account: Address) -> Result<U256, WalletErrors> {
        if !self.whitelisted.get(account) || account == self.owner.get() {
            return Err(WalletErrors::NotAllowed(NotAllowed {}));
        }
        Ok(window::emergency_unlock_at(self.whitelist_enrolled_at.get(account)))
    }
}

// === INTERNAL FUNCTIONS === //

impl AllowanceWallet {
    fn only_owner(&self) -> Result<(), WalletErrors> {
        if self.vm().msg_sender() != self.owner.get() {
            return Err(WalletErrors::Unauthorized(Unauthorized {}));
        }
        Ok(())
    }

    fn only_owner_or_payee(&self, caller: Address) -> Result<(), WalletErrors> {
        let payee = self.payee.get();
        if caller == self.owner.get() || (payee != Address::ZERO && caller == payee) {
            return Ok(());
        }
        Err(WalletErrors::Unauthorized(Unauthorized {}))
    }

    fn last_withdrawal_of(&self, account: Address) -> Option<U256> {
        if self.has_withdrawn.get(account) {
            Some(self.last_withdrawal.get(account))
        } else {
            None
        }
    }

    fn current_balance(&self) -> U256 {
        self.vm().balance(self.vm().contract_address())
    }

    fn quote_daily_allowance(&self) -> Result<U256, WalletErrors> {
        let oracle = self.oracle.get();

        let raw = self
            .vm()
            .static_call(&Call::new(), oracle, &IAggregatorV3::decimalsCall {}.abi_encode())
            .map_err(|_| WalletErrors::OracleError(OracleError {}))?;
        let feed_decimals = IAggregatorV3::decimalsCall::abi_decode_returns(&raw, true)
            .map_err(|_| WalletErrors::OracleError(OracleError {}))?
            ._0;
        if U256::from(feed_decimals) != self.oracle_decimals.get() {
            return Err(WalletErrors::OracleError(OracleError {}));
        }

        let raw = self
            .vm()
            .static_call(&Call::new(), oracle, &IAggregatorV3::latestRoundDataCall {}.abi_encode())
            .map_err(|_| WalletErrors::OracleError(OracleError {}))?;
        let round = IAggregatorV3::latestRoundDataCall::abi_decode_returns(&raw, true)
            .map_err(|_| WalletErrors::OracleError(OracleError {}))?;
        if round.updatedAt == U256::ZERO || round.answeredInRound < round.roundId {
            return Err(WalletErrors::OracleError(OracleError {}));
        }

        Ok(pricing::limit_in_wei(self.daily_limit_usd.get(), round.answer, feed_decimals)?)
    }

    fn send_value(&mut self, to: Address, amount: U256) -> Result<(), WalletErrors> {
        self.vm()
            .transfer_eth(to, amount)
            .map_err(|_| WalletErrors::TransferFailed(TransferFailed {}))
    }
}

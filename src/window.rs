//! Elapsed-time rules for the allowance cooldown and the emergency time-lock.

use stylus_sdk::alloy_primitives::U256;

/// Seconds an actor must wait between two allowance withdrawals.
pub const ALLOWANCE_COOLDOWN: u64 = 24 * 60 * 60;

/// Seconds a whitelisted address must stay enrolled before it can sweep.
pub const EMERGENCY_TIMELOCK: u64 = 12 * 24 * 60 * 60;

/// True once at least `period` seconds separate `since` and `now`.
///
/// A `now` earlier than `since` never satisfies the period.
pub fn has_elapsed(since: U256, now: U256, period: u64) -> bool {
    match now.checked_sub(since) {
        Some(elapsed) => elapsed >= U256::from(period),
        None => false,
    }
}

/// Whether an actor with the given last withdrawal may withdraw at `now`.
pub fn cooldown_elapsed(last_withdrawal: Option<U256>, now: U256) -> bool {
    match last_withdrawal {
        None => true,
        Some(last) => has_elapsed(last, now, ALLOWANCE_COOLDOWN),
    }
}

/// Earliest timestamp at which the next allowance can be drawn.
pub fn next_allowance_at(last_withdrawal: Option<U256>, now: U256) -> U256 {
    match last_withdrawal {
        None => now,
        Some(last) => last.saturating_add(U256::from(ALLOWANCE_COOLDOWN)),
    }
}

/// Earliest timestamp at which an entry enrolled at `enrolled_at` unlocks.
pub fn emergency_unlock_at(enrolled_at: U256) -> U256 {
    enrolled_at.saturating_add(U256::from(EMERGENCY_TIMELOCK))
}

//! Currency module
//!
//! A player's spendable balances: coins (primary) and agent medals
//! (secondary). Balances are signed so that a permissive economy can still
//! represent overspending; see `EconomyConfig::enforce_balance`.

use serde::{Deserialize, Serialize};

/// Which balance an acquisition is charged against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Primary currency
    Coins,
    /// Secondary currency earned through agent missions
    AgentMedals,
}

impl Currency {
    /// Database column holding this balance
    pub fn column(&self) -> &'static str {
        match self {
            Currency::Coins => "coins",
            Currency::AgentMedals => "agent_medals",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Coins => write!(f, "coins"),
            Currency::AgentMedals => write!(f, "agent medals"),
        }
    }
}

/// The two independent balances a player holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyAccount {
    pub coins: i32,
    pub agent_medals: i32,
}

impl CurrencyAccount {
    pub fn new(coins: i32, agent_medals: i32) -> Self {
        Self {
            coins,
            agent_medals,
        }
    }

    /// Current balance of a currency
    pub fn balance(&self, currency: Currency) -> i32 {
        match currency {
            Currency::Coins => self.coins,
            Currency::AgentMedals => self.agent_medals,
        }
    }

    /// Check whether `cost` can be paid without going negative
    pub fn can_afford(&self, currency: Currency, cost: u32) -> bool {
        i64::from(self.balance(currency)) >= i64::from(cost)
    }

    /// Balance after paying `cost`, without applying it
    pub fn balance_after(&self, currency: Currency, cost: u32) -> i32 {
        let cost = i32::try_from(cost).unwrap_or(i32::MAX);
        self.balance(currency).saturating_sub(cost)
    }

    /// Overwrite a balance
    pub fn set_balance(&mut self, currency: Currency, balance: i32) {
        match currency {
            Currency::Coins => self.coins = balance,
            Currency::AgentMedals => self.agent_medals = balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balances_are_independent() {
        let mut account = CurrencyAccount::new(500, 20);
        account.set_balance(Currency::AgentMedals, 5);

        assert_eq!(account.balance(Currency::Coins), 500);
        assert_eq!(account.balance(Currency::AgentMedals), 5);
    }

    #[test]
    fn test_can_afford() {
        let account = CurrencyAccount::new(100, 0);
        assert!(account.can_afford(Currency::Coins, 100));
        assert!(!account.can_afford(Currency::Coins, 101));
        assert!(account.can_afford(Currency::AgentMedals, 0));
        assert!(!account.can_afford(Currency::AgentMedals, 1));
    }

    #[test]
    fn test_balance_after_can_go_negative() {
        let account = CurrencyAccount::new(50, 0);
        assert_eq!(account.balance_after(Currency::Coins, 80), -30);
        assert_eq!(account.balance_after(Currency::Coins, 0), 50);
    }

    #[test]
    fn test_huge_cost_saturates() {
        let account = CurrencyAccount::new(i32::MIN + 1, 0);
        assert_eq!(account.balance_after(Currency::Coins, u32::MAX), i32::MIN);
    }
}

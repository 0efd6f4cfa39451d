//! Per-mission time-unit bookkeeping
//!
//! A mission may pay for a step before it can take it (turning first, for
//! example). That payment is kept as credit and consumed by the next spend.

use serde::{Deserialize, Serialize};

/// Something holding a time-unit balance
pub trait TimeUnitAccount {
    fn time_units(&self) -> u32;

    /// Deduct `cost` if affordable; never leaves a negative balance
    fn try_spend_time_units(&mut self, cost: u32) -> bool;
}

/// Result of a spend attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpendOutcome {
    Paid,
    /// Not affordable yet; this many TU must be acquired first
    Deferred(u32),
    /// Not affordable and the caller asked to give up
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceLedger {
    prepaid: u32,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepaid(&self) -> u32 {
        self.prepaid
    }

    /// Record TU already paid for an action still to come
    pub fn prepay(&mut self, amount: u32) {
        self.prepaid = self.prepaid.saturating_add(amount);
    }

    /// Pay `cost`, drawing on prepaid credit first
    ///
    /// Credit is only consumed when the whole cost is covered.
    pub fn spend(
        &mut self,
        account: &mut impl TimeUnitAccount,
        cost: u32,
        cancel_on_failure: bool,
    ) -> SpendOutcome {
        let from_credit = self.prepaid.min(cost);
        let remainder = cost - from_credit;
        if account.try_spend_time_units(remainder) {
            self.prepaid -= from_credit;
            SpendOutcome::Paid
        } else if cancel_on_failure {
            SpendOutcome::Cancelled
        } else {
            SpendOutcome::Deferred(remainder)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Wallet(u32);

    impl TimeUnitAccount for Wallet {
        fn time_units(&self) -> u32 {
            self.0
        }

        fn try_spend_time_units(&mut self, cost: u32) -> bool {
            if cost > self.0 {
                return false;
            }
            self.0 -= cost;
            true
        }
    }

    #[test]
    fn test_plain_spend() {
        let mut ledger = ResourceLedger::new();
        let mut wallet = Wallet(10);
        assert_eq!(ledger.spend(&mut wallet, 4, false), SpendOutcome::Paid);
        assert_eq!(wallet.time_units(), 6);
    }

    #[test]
    fn test_prepaid_credit_covers_cost() {
        let mut ledger = ResourceLedger::new();
        let mut wallet = Wallet(10);
        ledger.prepay(4);
        assert_eq!(ledger.spend(&mut wallet, 4, false), SpendOutcome::Paid);
        assert_eq!(wallet.time_units(), 10);
        assert_eq!(ledger.prepaid(), 0);
    }

    #[test]
    fn test_partial_credit() {
        let mut ledger = ResourceLedger::new();
        let mut wallet = Wallet(10);
        ledger.prepay(3);
        assert_eq!(ledger.spend(&mut wallet, 5, false), SpendOutcome::Paid);
        assert_eq!(wallet.time_units(), 8);
        assert_eq!(ledger.prepaid(), 0);
    }

    #[test]
    fn test_unaffordable_defers_without_touching_credit() {
        let mut ledger = ResourceLedger::new();
        let mut wallet = Wallet(1);
        ledger.prepay(2);
        assert_eq!(ledger.spend(&mut wallet, 6, false), SpendOutcome::Deferred(4));
        assert_eq!(wallet.time_units(), 1);
        assert_eq!(ledger.prepaid(), 2);
    }

    #[test]
    fn test_unaffordable_cancels() {
        let mut ledger = ResourceLedger::new();
        let mut wallet = Wallet(1);
        assert_eq!(ledger.spend(&mut wallet, 6, true), SpendOutcome::Cancelled);
        assert_eq!(wallet.time_units(), 1);
    }

    #[test]
    fn test_zero_cost_always_paid() {
        let mut ledger = ResourceLedger::new();
        let mut wallet = Wallet(0);
        assert_eq!(ledger.spend(&mut wallet, 0, true), SpendOutcome::Paid);
    }
}

//! Double-entry balance verification for a proposed settlement.
//!
//! The settlement's journal is: invoices and debit-natured adjustments on
//! the debit side; the net payment, down payments and credit-natured
//! adjustments on the credit side; returns reduce the debit side. Balance
//! holds iff the two totals are exactly equal — amounts are already rounded
//! currency values, so there is no tolerance.

use serde::{Deserialize, Serialize};

use ledgerpay_core::{Amount, ChartOfAccountId, DomainResult, error::DomainError};

use crate::order::OtherAllocation;

/// Hydrated chart-of-account entry. `is_debit` is the account's normal
/// balance side and decides which side an "other" adjustment lands on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartOfAccount {
    pub id: ChartOfAccountId,
    pub name: String,
    pub is_debit: bool,
}

/// Tenant journal configuration lookup: `(feature, name) -> account`.
pub trait JournalSettings: Send + Sync {
    fn account(&self, feature: &str, name: &str) -> Option<ChartOfAccountId>;
}

/// The ledger accounts a settlement posting requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementAccounts {
    pub account_payable: ChartOfAccountId,
    pub down_payment: ChartOfAccountId,
}

/// Resolve the required named accounts, naming the missing feature/name
/// pair on failure.
pub fn require_settlement_accounts(
    settings: &dyn JournalSettings,
) -> DomainResult<SettlementAccounts> {
    let account_payable = settings
        .account("purchase", "account payable")
        .ok_or_else(|| DomainError::configuration_missing("purchase", "account payable"))?;
    let down_payment = settings
        .account("purchase", "down payment")
        .ok_or_else(|| DomainError::configuration_missing("purchase", "down payment"))?;
    Ok(SettlementAccounts {
        account_payable,
        down_payment,
    })
}

/// Outcome of the balance check. The caller turns `!is_balance` into
/// [`DomainError::JournalImbalance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceReport {
    pub is_balance: bool,
    pub debit: Amount,
    pub credit: Amount,
}

impl BalanceReport {
    pub fn into_result(self) -> DomainResult<Self> {
        if self.is_balance {
            Ok(self)
        } else {
            Err(DomainError::JournalImbalance {
                debit: self.debit,
                credit: self.credit,
            })
        }
    }
}

/// Compute debit/credit totals for a settlement. All additions are
/// checked; totals that would wrap surface as `InvalidData`.
pub fn check_balance(
    net_amount: Amount,
    invoice_amounts: &[Amount],
    down_payment_amounts: &[Amount],
    return_amounts: &[Amount],
    others: &[OtherAllocation],
) -> DomainResult<BalanceReport> {
    let overflow = || DomainError::invalid_data("journal totals overflow");

    let mut debit: Amount = 0;
    for amount in invoice_amounts {
        debit = debit.checked_add(*amount).ok_or_else(overflow)?;
    }
    for amount in return_amounts {
        debit = debit.checked_sub(*amount).ok_or_else(overflow)?;
    }

    let mut credit: Amount = net_amount;
    for amount in down_payment_amounts {
        credit = credit.checked_add(*amount).ok_or_else(overflow)?;
    }

    for other in others {
        if other.account.is_debit {
            debit = debit.checked_add(other.amount).ok_or_else(overflow)?;
        } else {
            credit = credit.checked_add(other.amount).ok_or_else(overflow)?;
        }
    }

    Ok(BalanceReport {
        is_balance: debit == credit,
        debit,
        credit,
    })
}

//! Scan Budget
//!
//! Decides how many holder accounts and how many signatures per account a
//! discovery run may inspect. Budgets scale with the wallet target so the
//! number of RPC calls stays roughly linear in it, independent of how long the
//! token's transaction history is.

use serde::Deserialize;

/// Per-tier sampling limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TierBudget {
    /// Most holder accounts scanned per discovery
    pub max_accounts: usize,
    /// Most signatures inspected per holder account
    pub max_signatures_per_account: usize,
    /// `limit` sent with getSignaturesForAddress
    pub signature_page_limit: usize,
    /// Hard cap on wallets returned regardless of the caller's target
    #[serde(default)]
    pub wallet_cap: Option<usize>,
}

impl TierBudget {
    /// Conservative limits for rate-limited public endpoints
    pub fn public() -> Self {
        Self {
            max_accounts: 2,
            max_signatures_per_account: 3,
            signature_page_limit: 10,
            wallet_cap: Some(10),
        }
    }

    /// Wide limits for authenticated endpoints
    pub fn premium() -> Self {
        Self {
            max_accounts: 20,
            max_signatures_per_account: 50,
            signature_page_limit: 1000,
            wallet_cap: None,
        }
    }
}

/// Concrete limits for one discovery run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPlan {
    /// Wallets to collect before short-circuiting
    pub wallet_target: usize,
    /// Holder accounts to scan
    pub accounts: usize,
    /// Signatures to inspect per account
    pub signatures_per_account: usize,
    /// `limit` for getSignaturesForAddress
    pub signature_page_limit: usize,
}

impl ScanPlan {
    /// Build a plan from the tier budget, the caller's wallet target, the number
    /// of holder accounts available and how many candidates each transaction yields.
    pub fn new(
        budget: &TierBudget,
        max_wallets: usize,
        holder_count: usize,
        candidates_per_transaction: usize,
    ) -> Self {
        let wallet_target = match budget.wallet_cap {
            Some(cap) => max_wallets.min(cap),
            None => max_wallets,
        };

        let per_tx = candidates_per_transaction.max(1);
        let transactions_needed = wallet_target.div_ceil(per_tx).max(1);

        let accounts = holder_count
            .min(budget.max_accounts)
            .min(transactions_needed);

        // Oversample 2x: many candidates are duplicates or get filtered
        let signatures_per_account = if accounts == 0 {
            0
        } else {
            (2 * transactions_needed)
                .div_ceil(accounts)
                .clamp(1, budget.max_signatures_per_account.max(1))
        };

        Self {
            wallet_target,
            accounts,
            signatures_per_account,
            signature_page_limit: budget.signature_page_limit.max(signatures_per_account),
        }
    }

    /// Upper bound on getTransaction calls under this plan
    pub fn max_transactions(&self) -> usize {
        self.accounts * self.signatures_per_account
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_plan_matches_conservative_sampling() {
        let plan = ScanPlan::new(&TierBudget::public(), 50, 20, 3);
        assert_eq!(plan.wallet_target, 10);
        assert_eq!(plan.accounts, 2);
        assert_eq!(plan.signatures_per_account, 3);
        assert_eq!(plan.signature_page_limit, 10);
    }

    #[test]
    fn test_premium_plan_is_wider() {
        let public = ScanPlan::new(&TierBudget::public(), 50, 20, 3);
        let premium = ScanPlan::new(&TierBudget::premium(), 50, 20, 3);
        assert_eq!(premium.wallet_target, 50);
        assert!(premium.max_transactions() > public.max_transactions());
    }

    #[test]
    fn test_plan_bounded_by_holders() {
        let plan = ScanPlan::new(&TierBudget::premium(), 50, 1, 3);
        assert_eq!(plan.accounts, 1);
        assert_eq!(plan.signatures_per_account, 34);
    }

    #[test]
    fn test_calls_scale_with_target() {
        let small = ScanPlan::new(&TierBudget::premium(), 5, 100, 3);
        let large = ScanPlan::new(&TierBudget::premium(), 100, 100, 3);
        assert!(small.max_transactions() < large.max_transactions());
        assert!(large.max_transactions() <= 2 * 34 + 20);
    }

    #[test]
    fn test_no_holders_means_empty_plan() {
        let plan = ScanPlan::new(&TierBudget::public(), 10, 0, 3);
        assert_eq!(plan.accounts, 0);
        assert_eq!(plan.max_transactions(), 0);
    }
}

//! Admin-triggered airdrops
//!
//! An airdrop is one atomic `mint_batch` on the ledger under the airdrop's
//! own minter identity. Either every recipient is credited or none is.

use std::sync::Arc;

use tracing::info;

use lib_tokens::Ledger;
use lib_types::{Address, Amount};

use crate::errors::{DistributionError, DistributionResult};

/// Largest recipient list accepted by a single airdrop
pub const MAX_AIRDROP_RECIPIENTS: usize = 500;

pub struct Airdrop {
    admin: Address,
    /// Minter identity used on the ledger
    identity: Address,
    ledger: Arc<Ledger>,
}

impl Airdrop {
    pub fn new(admin: Address, identity: Address, ledger: Arc<Ledger>) -> Self {
        Self {
            admin,
            identity,
            ledger,
        }
    }

    pub fn identity(&self) -> Address {
        self.identity
    }

    /// Mint `amount` to every recipient. Returns the total minted.
    pub fn distribute(
        &self,
        caller: &Address,
        recipients: &[(Address, Amount)],
    ) -> DistributionResult<Amount> {
        if caller != &self.admin {
            return Err(DistributionError::Unauthorized(format!(
                "{} is not the airdrop admin",
                caller
            )));
        }
        validate_recipients(recipients)?;

        let total = self.ledger.mint_batch(&self.identity, recipients)?;
        info!(recipients = recipients.len(), total, "airdrop distributed");
        Ok(total)
    }
}

fn validate_recipients(recipients: &[(Address, Amount)]) -> DistributionResult<()> {
    if recipients.is_empty() {
        return Err(DistributionError::EmptyRecipients);
    }
    if recipients.len() > MAX_AIRDROP_RECIPIENTS {
        return Err(DistributionError::TooManyRecipients {
            count: recipients.len(),
            max: MAX_AIRDROP_RECIPIENTS,
        });
    }
    for (index, (to, amount)) in recipients.iter().enumerate() {
        if to.is_zero() {
            return Err(DistributionError::InvalidRecipient(format!(
                "entry {} is the zero address",
                index
            )));
        }
        if *amount == 0 {
            return Err(DistributionError::InvalidRecipient(format!(
                "entry {} ({}) has zero amount",
                index, to
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_tokens::MAX_SUPPLY;
    use lib_types::ErrorKind;

    fn admin() -> Address {
        Address::repeat(0xAA)
    }

    fn identity() -> Address {
        Address::repeat(0xAD)
    }

    fn setup() -> (Airdrop, Arc<Ledger>) {
        let ledger = Arc::new(Ledger::new(admin(), Address::repeat(0x5C)).unwrap());
        ledger.add_minter(&admin(), identity()).unwrap();
        (Airdrop::new(admin(), identity(), ledger.clone()), ledger)
    }

    #[test]
    fn test_distribute_credits_everyone() {
        let (airdrop, ledger) = setup();
        let recipients: Vec<_> = (1..=3u8).map(|i| (Address::repeat(i), i as Amount * 100)).collect();

        assert_eq!(airdrop.distribute(&admin(), &recipients).unwrap(), 600);
        assert_eq!(ledger.balance_of(&Address::repeat(2)), 200);
        assert_eq!(ledger.total_supply(), 600);
    }

    #[test]
    fn test_distribute_admin_only() {
        let (airdrop, _) = setup();
        let err = airdrop
            .distribute(&Address::repeat(1), &[(Address::repeat(1), 1)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn test_distribute_rejects_bad_lists() {
        let (airdrop, ledger) = setup();
        assert_eq!(airdrop.distribute(&admin(), &[]), Err(DistributionError::EmptyRecipients));

        let too_many = vec![(Address::repeat(1), 1); MAX_AIRDROP_RECIPIENTS + 1];
        assert!(matches!(
            airdrop.distribute(&admin(), &too_many),
            Err(DistributionError::TooManyRecipients { count: 501, max: 500 })
        ));

        let with_zero = [(Address::repeat(1), 5), (Address::repeat(2), 0)];
        assert!(matches!(
            airdrop.distribute(&admin(), &with_zero),
            Err(DistributionError::InvalidRecipient(_))
        ));

        let with_null = [(Address::zero(), 5)];
        assert!(matches!(
            airdrop.distribute(&admin(), &with_null),
            Err(DistributionError::InvalidRecipient(_))
        ));
        assert_eq!(ledger.total_supply(), 0);
    }

    #[test]
    fn test_distribute_is_all_or_nothing() {
        let (airdrop, ledger) = setup();
        let recipients = [(Address::repeat(1), 10), (Address::repeat(2), MAX_SUPPLY)];
        let err = airdrop.distribute(&admin(), &recipients).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientResource);
        assert_eq!(ledger.balance_of(&Address::repeat(1)), 0);
        assert_eq!(ledger.total_supply(), 0);
    }

    #[test]
    fn test_distribute_requires_minter_role() {
        let (airdrop, ledger) = setup();
        ledger.remove_minter(&admin(), &identity()).unwrap();
        assert!(matches!(
            airdrop.distribute(&admin(), &[(Address::repeat(1), 1)]),
            Err(DistributionError::Ledger(_))
        ));
    }
}

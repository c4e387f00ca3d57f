//! Presale phase table
//!
//! An ordered list of priced tranches populated once at construction. The
//! cursor only moves forward, one phase at a time.
//!
//! # Pricing
//!
//! `price` is the number of payment base units charged per whole token, so
//! a payment buys `payment * 10^18 / price` base units (floor).

use serde::{Deserialize, Serialize};

use lib_types::{Amount, BASE_UNITS_PER_TOKEN};

use crate::errors::{VestingError, VestingResult};

/// A priced tranche of purchasable entitlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// Payment base units per whole token
    pub price: Amount,
    /// Capacity in token base units
    pub tokens_available: Amount,
    /// Sold so far in token base units (never above `tokens_available`)
    pub sold: Amount,
}

impl Phase {
    pub fn new(price: Amount, tokens_available: Amount) -> Self {
        Self {
            price,
            tokens_available,
            sold: 0,
        }
    }

    pub fn remaining(&self) -> Amount {
        self.tokens_available.saturating_sub(self.sold)
    }

    /// Token base units bought by `payment` at this phase's price
    pub fn quote(&self, payment: Amount) -> VestingResult<Amount> {
        if self.price == 0 {
            return Err(VestingError::InvalidPhases("zero price".to_string()));
        }
        payment
            .checked_mul(BASE_UNITS_PER_TOKEN)
            .map(|v| v / self.price)
            .ok_or(VestingError::Overflow)
    }

    pub fn is_sold_out(&self) -> bool {
        self.sold >= self.tokens_available
    }
}

/// Ordered phases plus the forward-only cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTable {
    phases: Vec<Phase>,
    current: usize,
}

impl PhaseTable {
    /// Build a table from fresh or restored phases
    ///
    /// Rejects an empty table, zero prices and oversold phases.
    pub fn new(phases: Vec<Phase>) -> VestingResult<Self> {
        let table = Self { phases, current: 0 };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> VestingResult<()> {
        if self.phases.is_empty() {
            return Err(VestingError::InvalidPhases("no phases".to_string()));
        }
        if self.current >= self.phases.len() {
            return Err(VestingError::InvalidPhases(format!(
                "cursor {} out of range",
                self.current
            )));
        }
        for (index, phase) in self.phases.iter().enumerate() {
            if phase.price == 0 {
                return Err(VestingError::InvalidPhases(format!("phase {} has zero price", index)));
            }
            if phase.sold > phase.tokens_available {
                return Err(VestingError::InvalidPhases(format!(
                    "phase {} oversold: {} > {}",
                    index, phase.sold, phase.tokens_available
                )));
            }
        }
        Ok(())
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &Phase {
        &self.phases[self.current]
    }

    pub fn get(&self, index: usize) -> Option<&Phase> {
        self.phases.get(index)
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == self.phases.len()
    }

    /// Move the cursor forward by exactly one phase
    pub fn advance(&mut self) -> VestingResult<usize> {
        if self.is_last() {
            return Err(VestingError::LastPhase(self.current));
        }
        self.current += 1;
        Ok(self.current)
    }

    /// Check that `amount` fits the current phase and return the new `sold`
    pub fn check_sale(&self, amount: Amount) -> VestingResult<Amount> {
        let phase = self.current();
        let sold = phase.sold.checked_add(amount).ok_or(VestingError::Overflow)?;
        if amount == 0 || sold > phase.tokens_available {
            return Err(VestingError::PhaseExhausted {
                phase: self.current,
                requested: amount,
                remaining: phase.remaining(),
            });
        }
        Ok(sold)
    }

    pub(crate) fn set_current_sold(&mut self, sold: Amount) {
        self.phases[self.current].sold = sold;
    }

    pub fn total_sold(&self) -> Amount {
        self.phases.iter().map(|p| p.sold).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: Amount = BASE_UNITS_PER_TOKEN;

    #[test]
    fn test_quote_price_1000() {
        let phase = Phase::new(1_000, 1_000 * TOKEN);
        assert_eq!(phase.quote(1_000).unwrap(), TOKEN);
        assert_eq!(phase.quote(1).unwrap(), TOKEN / 1_000);
    }

    #[test]
    fn test_quote_floors() {
        let phase = Phase::new(3 * TOKEN, 1_000 * TOKEN);
        // 1 unit of payment at 3 tokens-of-payment per token rounds to zero
        assert_eq!(phase.quote(1).unwrap(), 0);
        assert_eq!(phase.quote(3 * TOKEN).unwrap(), TOKEN);
    }

    #[test]
    fn test_quote_overflow() {
        let phase = Phase::new(1, 1);
        assert_eq!(phase.quote(Amount::MAX), Err(VestingError::Overflow));
    }

    #[test]
    fn test_table_rejects_bad_input() {
        assert!(matches!(PhaseTable::new(vec![]), Err(VestingError::InvalidPhases(_))));
        assert!(matches!(
            PhaseTable::new(vec![Phase::new(0, 10)]),
            Err(VestingError::InvalidPhases(_))
        ));
        let oversold = Phase {
            price: 1,
            tokens_available: 10,
            sold: 11,
        };
        assert!(matches!(
            PhaseTable::new(vec![oversold]),
            Err(VestingError::InvalidPhases(_))
        ));
    }

    #[test]
    fn test_advance_one_step_at_a_time() {
        let mut table = PhaseTable::new(vec![
            Phase::new(1_000, 10),
            Phase::new(2_000, 10),
            Phase::new(4_000, 10),
        ])
        .unwrap();

        assert_eq!(table.advance().unwrap(), 1);
        assert_eq!(table.current().price, 2_000);
        assert_eq!(table.advance().unwrap(), 2);
        assert_eq!(table.advance(), Err(VestingError::LastPhase(2)));
        assert_eq!(table.current_index(), 2);
    }

    #[test]
    fn test_check_sale_capacity() {
        let mut table = PhaseTable::new(vec![Phase::new(1_000, 100)]).unwrap();
        assert_eq!(table.check_sale(100).unwrap(), 100);
        table.set_current_sold(60);

        let err = table.check_sale(41).unwrap_err();
        assert_eq!(
            err,
            VestingError::PhaseExhausted {
                phase: 0,
                requested: 41,
                remaining: 40,
            }
        );
        assert!(matches!(table.check_sale(0), Err(VestingError::PhaseExhausted { .. })));
        assert_eq!(table.total_sold(), 60);
    }
}

//! Gas meter. Consumed per instruction and per host call; exhaustion is sticky.

use crate::error::OutOfGas;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasMeter {
    remaining: u64,
    exhausted: bool,
}

impl GasMeter {
    #[must_use]
    pub const fn new(budget: u64) -> Self {
        Self {
            remaining: budget,
            exhausted: false,
        }
    }

    /// Remaining gas; zero once exhausted.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Deduct `amount`. If the counter would go negative it is clamped to the exhausted state
    /// and nothing else may be consumed afterwards.
    pub fn consume(&mut self, amount: u64) -> Result<(), OutOfGas> {
        if self.exhausted {
            return Err(OutOfGas);
        }
        match self.remaining.checked_sub(amount) {
            Some(left) => {
                self.remaining = left;
                Ok(())
            }
            None => {
                self.remaining = 0;
                self.exhausted = true;
                Err(OutOfGas)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_exact_budget_leaves_zero_but_not_exhausted() {
        let mut gas = GasMeter::new(5);
        assert!(gas.consume(5).is_ok());
        assert_eq!(gas.remaining(), 0);
        assert!(!gas.is_exhausted());
        assert_eq!(gas.consume(1), Err(OutOfGas));
        assert!(gas.is_exhausted());
    }

    #[test]
    fn overdraw_clamps_and_sticks() {
        let mut gas = GasMeter::new(3);
        assert_eq!(gas.consume(4), Err(OutOfGas));
        assert_eq!(gas.remaining(), 0);
        assert_eq!(gas.consume(0), Err(OutOfGas));
    }

    #[test]
    fn zero_cost_is_free() {
        let mut gas = GasMeter::new(0);
        assert!(gas.consume(0).is_ok());
    }
}

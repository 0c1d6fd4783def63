//! Per-attempt payment stage tracking.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{X402Error, X402Result};

/// Stage of one payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStage {
    Idle,
    Quoting,
    Building,
    Signing,
    Submitting,
    Success,
    Failed,
}

impl PaymentStage {
    /// Success or Failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    fn can_advance_to(self, next: Self) -> bool {
        use PaymentStage::*;
        matches!(
            (self, next),
            (Idle, Quoting)
                | (Idle, Building)
                | (Quoting, Building)
                | (Building, Signing)
                | (Signing, Submitting)
                | (Submitting, Success)
        )
    }
}

impl fmt::Display for PaymentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Quoting => "quoting",
            Self::Building => "building",
            Self::Signing => "signing",
            Self::Submitting => "submitting",
            Self::Success => "success",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Ordered stage history of one attempt.
///
/// Starts at `Idle`. `Idle -> Building` is allowed when the caller supplies
/// a requirement the user already saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentAttempt {
    history: Vec<PaymentStage>,
}

impl Default for PaymentAttempt {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentAttempt {
    pub fn new() -> Self {
        Self {
            history: vec![PaymentStage::Idle],
        }
    }

    /// Current stage.
    pub fn current(&self) -> PaymentStage {
        self.history
            .last()
            .copied()
            .unwrap_or(PaymentStage::Idle)
    }

    /// Every stage visited, in order.
    pub fn history(&self) -> &[PaymentStage] {
        &self.history
    }

    /// Move to `next`, rejecting out-of-order transitions.
    pub fn advance(&mut self, next: PaymentStage) -> X402Result<()> {
        let current = self.current();
        if !current.can_advance_to(next) {
            return Err(X402Error::InvalidStage {
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        self.history.push(next);
        Ok(())
    }

    /// Mark the attempt failed. No-op once terminal.
    pub fn fail(&mut self) {
        if !self.current().is_terminal() {
            self.history.push(PaymentStage::Failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PaymentStage::*;

    #[test]
    fn test_full_path() {
        let mut attempt = PaymentAttempt::new();
        for stage in [Quoting, Building, Signing, Submitting, Success] {
            attempt.advance(stage).unwrap();
        }
        assert_eq!(
            attempt.history(),
            &[Idle, Quoting, Building, Signing, Submitting, Success]
        );
    }

    #[test]
    fn test_predisplayed_requirement_skips_quoting() {
        let mut attempt = PaymentAttempt::new();
        attempt.advance(Building).unwrap();
        assert_eq!(attempt.current(), Building);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut attempt = PaymentAttempt::new();
        let err = attempt.advance(Submitting).unwrap_err();
        assert_eq!(
            err,
            X402Error::InvalidStage {
                from: "idle".into(),
                to: "submitting".into()
            }
        );
        assert_eq!(attempt.history(), &[Idle]);
    }

    #[test]
    fn test_fail_is_terminal() {
        let mut attempt = PaymentAttempt::new();
        attempt.advance(Quoting).unwrap();
        attempt.fail();
        attempt.fail();
        assert_eq!(attempt.history(), &[Idle, Quoting, Failed]);
        assert!(attempt.advance(Building).is_err());
    }
}

// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Trainer Boundary Adapter

//! Conversions between the trainer's `f64`/`f32` world and the simulation's
//! `Decimal` reward accounting.

use num_traits::ToPrimitive;
use rust_decimal::Decimal;

/// Convert Decimal to f64.
pub fn from_decimal(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Scalar reward handed back from `step`.
pub fn reward_to_f64(reward: Decimal) -> f64 {
    from_decimal(reward)
}

/// Step counts enter reward arithmetic as Decimals.
pub fn steps_to_decimal(steps: u64) -> Decimal {
    Decimal::from(steps)
}

/// Observation bits as the trainer consumes them.
pub fn flags_to_f32(flags: &[bool]) -> Vec<f32> {
    flags.iter().map(|&f| if f { 1.0 } else { 0.0 }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rewards_convert_exactly() {
        assert_eq!(from_decimal(dec!(2.5)), 2.5);
        assert_eq!(reward_to_f64(dec!(-8)), -8.0);
        assert_eq!(reward_to_f64(Decimal::ZERO), 0.0);
    }

    #[test]
    fn flags_become_unit_floats() {
        assert_eq!(flags_to_f32(&[true, false, true]), vec![1.0, 0.0, 1.0]);
        assert_eq!(steps_to_decimal(100) - steps_to_decimal(7), dec!(93));
    }
}

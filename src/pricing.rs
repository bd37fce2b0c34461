// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Duration-to-cost pricing.
//!
//! Billing is per started hour with a one-hour minimum: a 45 minute stay
//! bills one hour, a 61 minute stay bills two. A flat minimum charge floors
//! the computed amount for low hourly rates.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Pure mapping from a parking duration to a cost.
///
/// Stateless and side-effect free; cloning is cheap. A coordinator holds a
/// single global policy and derives per-slot variants through
/// [`PricingPolicy::with_rate`] where a slot carries a rate override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricingPolicy {
    hourly_rate: Decimal,
    minimum_charge: Decimal,
}

impl PricingPolicy {
    pub fn new(hourly_rate: Decimal, minimum_charge: Decimal) -> Self {
        Self {
            hourly_rate,
            minimum_charge,
        }
    }

    /// Derives a policy with a substituted hourly rate, keeping the floor.
    pub fn with_rate(&self, hourly_rate: Decimal) -> Self {
        Self {
            hourly_rate,
            minimum_charge: self.minimum_charge,
        }
    }

    pub fn hourly_rate(&self) -> Decimal {
        self.hourly_rate
    }

    pub fn minimum_charge(&self) -> Decimal {
        self.minimum_charge
    }

    /// Cost of a stay of `minutes` whole minutes.
    ///
    /// `max(minimum_charge, max(1, ceil(minutes / 60)) * hourly_rate)`.
    /// Negative durations (clock skew) bill as zero minutes.
    pub fn cost(&self, minutes: i64) -> Decimal {
        let minutes = minutes.max(0) as u64;
        let hours = minutes.div_ceil(60).max(1);
        (Decimal::from(hours) * self.hourly_rate).max(self.minimum_charge)
    }
}

impl Default for PricingPolicy {
    /// 50 per hour with a minimum charge of 25.
    fn default() -> Self {
        Self {
            hourly_rate: dec!(50),
            minimum_charge: dec!(25),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_hour_stay_bills_one_full_hour() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.cost(45), dec!(50));
    }

    #[test]
    fn zero_minutes_still_bills_the_minimum_hour() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.cost(0), dec!(50));
    }

    #[test]
    fn hours_round_up() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.cost(60), dec!(50));
        assert_eq!(policy.cost(61), dec!(100));
        assert_eq!(policy.cost(120), dec!(100));
        assert_eq!(policy.cost(121), dec!(150));
    }

    #[test]
    fn same_bucket_same_cost() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.cost(1), policy.cost(59));
        assert_eq!(policy.cost(61), policy.cost(119));
    }

    #[test]
    fn crossing_an_hour_boundary_strictly_increases_cost() {
        let policy = PricingPolicy::default();
        assert!(policy.cost(61) > policy.cost(60));
        assert!(policy.cost(121) > policy.cost(120));
    }

    #[test]
    fn minimum_charge_floors_low_rates() {
        // At 10/hour the one-hour charge would undercut the floor.
        let policy = PricingPolicy::new(dec!(10), dec!(25));
        assert_eq!(policy.cost(30), dec!(25));
        // Three hours clears the floor on its own.
        assert_eq!(policy.cost(170), dec!(30));
    }

    #[test]
    fn negative_duration_bills_as_zero_minutes() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.cost(-5), dec!(50));
    }

    #[test]
    fn with_rate_substitutes_rate_but_keeps_floor() {
        let policy = PricingPolicy::default().with_rate(dec!(100));
        assert_eq!(policy.cost(90), dec!(200));
        assert_eq!(policy.minimum_charge(), dec!(25));
    }
}

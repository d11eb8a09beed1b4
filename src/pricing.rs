//! Pricing Calculator
//!
//! Upstream rates are quoted per 1000 units. The storefront price is the
//! upstream rate times a fixed markup, prorated to the ordered quantity:
//!
//! ```text
//! charge = rate * markup * quantity / 1000
//! ```
//!
//! Charges are kept at full precision; only API output is rounded.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::ShopError;
use crate::gateway::types::DisplayAmount;
use crate::upstream::Service;

/// Default storefront markup (52%)
pub const DEFAULT_MARKUP: Decimal = Decimal::from_parts(152, 0, 0, false, 2);

const PER_UNITS: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingCalculator {
    markup: Decimal,
}

impl Default for PricingCalculator {
    fn default() -> Self {
        Self {
            markup: DEFAULT_MARKUP,
        }
    }
}

impl PricingCalculator {
    pub fn new(markup: Decimal) -> Result<Self, ShopError> {
        if markup <= Decimal::ZERO {
            return Err(ShopError::validation("markup must be positive"));
        }
        Ok(Self { markup })
    }

    pub fn markup(&self) -> Decimal {
        self.markup
    }

    /// Storefront charge for `quantity` units at upstream `rate`;
    /// `None` when the result does not fit a `Decimal`
    pub fn charge(&self, rate: Decimal, quantity: i64) -> Option<Decimal> {
        rate.checked_mul(self.markup)?
            .checked_mul(Decimal::from(quantity))?
            .checked_div(PER_UNITS)
    }

    /// Marked-up price per 1000 units, as shown in the catalog
    pub fn unit_price(&self, service: &Service) -> Option<Decimal> {
        service.rate.checked_mul(self.markup)
    }

    /// Bounds-checked charge for ordering `quantity` of `service`
    pub fn quote(&self, service: &Service, quantity: i64) -> Result<Decimal, ShopError> {
        if quantity <= 0 {
            return Err(ShopError::validation("quantity must be positive"));
        }
        if service.rate.is_sign_negative() {
            return Err(ShopError::validation(format!(
                "service {} has an invalid rate",
                service.id
            )));
        }
        if quantity < service.min {
            return Err(ShopError::validation(format!(
                "quantity {} is below the minimum of {}",
                quantity, service.min
            )));
        }
        if quantity > service.max {
            return Err(ShopError::validation(format!(
                "quantity {} is above the maximum of {}",
                quantity, service.max
            )));
        }
        self.charge(service.rate, quantity)
            .ok_or_else(|| ShopError::validation("order total is out of range"))
    }
}

/// Round half away from zero to 2 decimals for API output
pub fn display_amount(amount: Decimal) -> DisplayAmount {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    DisplayAmount::new(format!("{:.2}", rounded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn service(rate: Decimal, min: i64, max: i64) -> Service {
        Service {
            id: 1,
            name: "Instagram Followers".to_string(),
            kind: "Default".to_string(),
            category: "Instagram".to_string(),
            rate,
            min,
            max,
            refill: false,
            cancel: true,
        }
    }

    #[test]
    fn test_default_markup() {
        assert_eq!(DEFAULT_MARKUP, dec!(1.52));
        assert_eq!(PricingCalculator::default().markup(), dec!(1.52));
    }

    #[test]
    fn test_charge_formula() {
        let calc = PricingCalculator::default();
        // 0.90 * 1.52 * 1000 / 1000
        assert_eq!(calc.charge(dec!(0.90), 1000), Some(dec!(1.368)));
        // 2.50 * 1.52 * 250 / 1000
        assert_eq!(calc.charge(dec!(2.50), 250), Some(dec!(0.95)));
    }

    #[test]
    fn test_charge_not_rounded() {
        let calc = PricingCalculator::default();
        assert_eq!(calc.charge(dec!(0.0123), 7), Some(dec!(0.000130872)));
    }

    #[test]
    fn test_overflow_is_not_a_panic() {
        let calc = PricingCalculator::default();
        assert_eq!(calc.charge(Decimal::MAX, 1000), None);
        assert_eq!(calc.unit_price(&service(Decimal::MAX, 1, 10)), None);
        assert!(matches!(
            calc.quote(&service(Decimal::MAX, 1, 10), 5),
            Err(ShopError::Validation(_))
        ));
    }

    #[test]
    fn test_quote_bounds() {
        let calc = PricingCalculator::default();
        let svc = service(dec!(1.00), 10, 500);

        let err = calc.quote(&svc, 5).unwrap_err();
        assert_eq!(err.to_string(), "quantity 5 is below the minimum of 10");

        let err = calc.quote(&svc, 501).unwrap_err();
        assert_eq!(err.to_string(), "quantity 501 is above the maximum of 500");

        assert_eq!(calc.quote(&svc, 10).unwrap(), dec!(0.0152));
        assert_eq!(calc.quote(&svc, 500).unwrap(), dec!(0.76));
    }

    #[test]
    fn test_quote_rejects_non_positive_quantity() {
        let calc = PricingCalculator::default();
        let svc = service(dec!(1.00), 0, 500);
        assert!(matches!(calc.quote(&svc, 0), Err(ShopError::Validation(_))));
        assert!(matches!(calc.quote(&svc, -3), Err(ShopError::Validation(_))));
    }

    #[test]
    fn test_quote_rejects_negative_rate() {
        let calc = PricingCalculator::default();
        let svc = service(dec!(-1.00), 1, 500);
        assert!(matches!(calc.quote(&svc, 10), Err(ShopError::Validation(_))));
    }

    #[test]
    fn test_new_rejects_non_positive_markup() {
        assert!(PricingCalculator::new(dec!(0)).is_err());
        assert!(PricingCalculator::new(dec!(-1.2)).is_err());
        assert!(PricingCalculator::new(dec!(2)).is_ok());
    }

    #[test]
    fn test_unit_price() {
        let calc = PricingCalculator::default();
        assert_eq!(calc.unit_price(&service(dec!(0.90), 1, 10)), Some(dec!(1.368)));
    }

    #[test]
    fn test_display_amount_half_up() {
        assert_eq!(display_amount(dec!(1.365)).as_str(), "1.37");
        assert_eq!(display_amount(dec!(1.364)).as_str(), "1.36");
        assert_eq!(display_amount(dec!(2)).as_str(), "2.00");
        assert_eq!(display_amount(dec!(0.005)).as_str(), "0.01");
    }
}

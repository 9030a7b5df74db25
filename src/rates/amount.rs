use crate::core::{Conversion, Conversions, Rates};

/// Applies `amount` to every resolved rate.
pub fn apply_amount(amount: f64, rates: Rates) -> Conversions {
    rates
        .into_iter()
        .map(|(query, rate)| {
            (
                query,
                Conversion {
                    val: rate.val,
                    expired: rate.expired,
                    amount: amount * rate.val,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Rate;

    fn rates(val: f64, expired: bool) -> Rates {
        Rates::from([("EUR_USD".to_string(), Rate { val, expired })])
    }

    #[test]
    fn test_amount_at_par() {
        let conversions = apply_amount(100.0, rates(1.0, false));
        assert_eq!(
            conversions["EUR_USD"],
            Conversion {
                val: 1.0,
                expired: false,
                amount: 100.0
            }
        );
    }

    #[test]
    fn test_amount_scaled_by_rate() {
        assert_eq!(apply_amount(100.0, rates(0.9, false))["EUR_USD"].amount, 90.0);
        assert_eq!(apply_amount(100.0, rates(0.5, false))["EUR_USD"].amount, 50.0);
    }

    #[test]
    fn test_expiry_flag_is_kept() {
        let conversions = apply_amount(10.0, rates(2.0, true));
        assert!(conversions["EUR_USD"].expired);
        assert_eq!(conversions["EUR_USD"].amount, 20.0);
    }
}

pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn same_rate(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_round_to_nearest_tenth() {
        assert_eq!(round_to_tenth(2.81), 2.8);
        assert_eq!(round_to_tenth(2.86), 2.9);
        assert_eq!(round_to_tenth(0.5 + 0.1 * 2.0), 0.7);
    }

    #[test]
    fn should_compare_rates_with_tolerance() {
        assert!(same_rate(1.5, 1.5));
        assert!(same_rate(0.7, 0.5 + 0.1 * 2.0));
        assert!(!same_rate(1.5, 1.6));
    }
}

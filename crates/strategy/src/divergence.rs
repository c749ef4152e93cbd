use common::PhaseBoundary;

/// Price and momentum moved in opposite directions across the segment.
///
/// An exactly zero range on either side is never divergent.
pub fn is_divergent(price_range: f64, momentum_range: f64) -> bool {
    (price_range > 0.0 && momentum_range < 0.0) || (price_range < 0.0 && momentum_range > 0.0)
}

pub fn detect(phase: &PhaseBoundary) -> bool {
    is_divergent(phase.price_range(), phase.momentum_range())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::locate;
    use crate::test_support::priced_bars;
    use common::BarStatus::Up;

    #[test]
    fn opposite_signs_diverge() {
        assert!(is_divergent(1.0, -0.5));
        assert!(is_divergent(-2.0, 0.1));
    }

    #[test]
    fn same_signs_do_not_diverge() {
        assert!(!is_divergent(1.0, 0.5));
        assert!(!is_divergent(-1.0, -0.5));
    }

    #[test]
    fn zero_range_is_not_divergent() {
        assert!(!is_divergent(0.0, -1.0));
        assert!(!is_divergent(3.0, 0.0));
        assert!(!is_divergent(0.0, 0.0));
    }

    #[test]
    fn rising_price_with_fading_momentum_diverges() {
        let series = priced_bars(&[(Up, 10.0, 2.0), (Up, 11.0, 1.8), (Up, 12.0, 1.5)]);
        assert!(detect(&locate(&series).unwrap()));
    }
}

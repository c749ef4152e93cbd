/// MACD (Moving Average Convergence/Divergence) momentum indicator.
///
/// Computes the MACD line = EMA(fast) − EMA(slow) for every bar of a close
/// series. The line value is the `momentum` field every classified bar carries.
#[derive(Debug, Clone)]
pub struct MacdIndicator {
    pub fast: usize,
    pub slow: usize,
}

impl Default for MacdIndicator {
    fn default() -> Self {
        Self::new(12, 26)
    }
}

impl MacdIndicator {
    pub fn new(fast: usize, slow: usize) -> Self {
        assert!(
            fast > 0 && fast < slow,
            "MACD fast period must be positive and less than slow period"
        );
        Self { fast, slow }
    }

    /// MACD line for each close (oldest first). Same length as `closes`.
    ///
    /// Both EMAs are seeded with the first close, so the first value is 0 and
    /// every bar has a defined momentum.
    pub fn line(&self, closes: &[f64]) -> Vec<f64> {
        let fast = ema_series(closes, self.fast);
        let slow = ema_series(closes, self.slow);
        fast.iter().zip(&slow).map(|(f, s)| f - s).collect()
    }
}

/// Running exponential moving average over `data`.
fn ema_series(data: &[f64], period: usize) -> Vec<f64> {
    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(data.len());
    let mut prev: Option<f64> = None;
    for &price in data {
        let next = match prev {
            Some(p) => price * k + p * (1.0 - k),
            None => price,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending_up(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64 * 0.5).collect()
    }

    fn trending_down(n: usize) -> Vec<f64> {
        (0..n).map(|i| 200.0 - i as f64 * 0.5).collect()
    }

    #[test]
    fn line_has_one_value_per_close() {
        let macd = MacdIndicator::default();
        let prices = trending_up(40);
        assert_eq!(macd.line(&prices).len(), 40);
        assert!(macd.line(&[]).is_empty());
    }

    #[test]
    fn first_value_is_zero() {
        let macd = MacdIndicator::new(3, 6);
        assert_eq!(macd.line(&[42.0, 43.0])[0], 0.0);
    }

    #[test]
    fn macd_positive_on_up_trend_negative_on_down_trend() {
        let macd = MacdIndicator::new(3, 6);
        assert!(*macd.line(&trending_up(40)).last().unwrap() > 0.0);
        assert!(*macd.line(&trending_down(40)).last().unwrap() < 0.0);
    }

    #[test]
    fn flat_prices_have_zero_momentum() {
        let macd = MacdIndicator::default();
        assert!(macd.line(&vec![100.0; 30]).iter().all(|v| *v == 0.0));
    }

    #[test]
    #[should_panic]
    fn fast_must_be_shorter_than_slow() {
        MacdIndicator::new(26, 12);
    }
}

//! Round-trip-time estimation and the retransmission timeout.
//!
//! The sender waits at most [`RttEstimator::timeout`] for each ACK.  Instead
//! of a fixed value the timeout tracks the path, using the exponentially
//! weighted moving averages of Jacobson's algorithm:
//!
//! ```text
//!   first sample R:   EstimatedRTT = R
//!                     DevRTT       = R / 2
//!   later samples:    EstimatedRTT = (1 - α)·EstimatedRTT + α·R
//!                     DevRTT       = (1 - β)·DevRTT + β·|R - EstimatedRTT|
//!   always:           Timeout      = EstimatedRTT + 4·DevRTT
//! ```
//!
//! `DevRTT` is computed against the *updated* `EstimatedRTT`.
//!
//! Only clean round trips are sampled: the caller feeds a sample after a
//! verified ACK for the in-flight bit, never after a timeout or a rejected
//! response.  A timeout leaves the interval unchanged (no back-off).

use std::time::Duration;

/// Estimator parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RttConfig {
    /// Weight of a new sample in `EstimatedRTT`.
    pub alpha: f64,
    /// Weight of a new deviation in `DevRTT`.
    pub beta: f64,
    /// Timeout used until the first sample arrives.
    pub initial_timeout: Duration,
}

impl Default for RttConfig {
    fn default() -> Self {
        Self {
            alpha: 0.125,
            beta: 0.25,
            initial_timeout: Duration::from_secs(1),
        }
    }
}

/// EWMA state of one sender session.  All values are in seconds.
#[derive(Debug, Clone)]
pub struct RttEstimator {
    pub config: RttConfig,
    /// Smoothed RTT; `None` until the first sample.
    pub estimated_rtt: Option<f64>,
    /// Mean deviation of the RTT; `None` until the first sample.
    pub dev_rtt: Option<f64>,
    /// Current retransmission timeout.
    pub timeout_interval: f64,
}

impl Default for RttEstimator {
    fn default() -> Self {
        Self::new(RttConfig::default())
    }
}

impl RttEstimator {
    pub fn new(config: RttConfig) -> Self {
        Self {
            config,
            estimated_rtt: None,
            dev_rtt: None,
            timeout_interval: config.initial_timeout.as_secs_f64(),
        }
    }

    /// Fold one round-trip measurement into the estimate and recompute the
    /// timeout.
    pub fn record_sample(&mut self, sample: Duration) {
        let sample = sample.as_secs_f64();
        let (alpha, beta) = (self.config.alpha, self.config.beta);

        let (est, dev) = match (self.estimated_rtt, self.dev_rtt) {
            (Some(est), Some(dev)) => {
                let est = (1.0 - alpha) * est + alpha * sample;
                let dev = (1.0 - beta) * dev + beta * (sample - est).abs();
                (est, dev)
            }
            _ => (sample, sample / 2.0),
        };

        self.estimated_rtt = Some(est);
        self.dev_rtt = Some(dev);
        self.timeout_interval = est + 4.0 * dev;
    }

    /// The current timeout as a [`Duration`].
    ///
    /// Falls back to the initial timeout if the estimate is not a valid
    /// duration, which only weights outside `(0, 1]` can produce.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_interval).unwrap_or(self.config.initial_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn starts_at_initial_timeout_without_estimates() {
        let rtt = RttEstimator::default();
        assert_eq!(rtt.estimated_rtt, None);
        assert_eq!(rtt.dev_rtt, None);
        assert_eq!(rtt.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn first_sample_seeds_estimate_and_half_deviation() {
        let mut rtt = RttEstimator::default();
        rtt.record_sample(Duration::from_millis(200));

        assert!(close(rtt.estimated_rtt.unwrap(), 0.2));
        assert!(close(rtt.dev_rtt.unwrap(), 0.1));
        assert!(close(rtt.timeout_interval, 0.2 + 4.0 * 0.1));
    }

    #[test]
    fn second_sample_uses_default_weights() {
        let mut rtt = RttEstimator::default();
        rtt.record_sample(Duration::from_millis(100));
        rtt.record_sample(Duration::from_millis(300));

        let est = 0.875 * 0.1 + 0.125 * 0.3;
        let dev = 0.75 * 0.05 + 0.25 * (0.3f64 - est).abs();
        assert!(close(rtt.estimated_rtt.unwrap(), est));
        assert!(close(rtt.dev_rtt.unwrap(), dev));
        assert!(close(rtt.timeout_interval, est + 4.0 * dev));
    }

    #[test]
    fn custom_weights_are_used() {
        let mut rtt = RttEstimator::new(RttConfig {
            alpha: 0.5,
            beta: 0.5,
            initial_timeout: Duration::from_millis(250),
        });
        assert_eq!(rtt.timeout(), Duration::from_millis(250));

        rtt.record_sample(Duration::from_millis(100));
        rtt.record_sample(Duration::from_millis(200));
        // est = 0.15, dev = 0.5·0.05 + 0.5·0.05 = 0.05
        assert!(close(rtt.estimated_rtt.unwrap(), 0.15));
        assert!(close(rtt.dev_rtt.unwrap(), 0.05));
        assert!(close(rtt.timeout_interval, 0.35));
    }

    #[test]
    fn steady_samples_converge_on_the_sample() {
        let mut rtt = RttEstimator::default();
        for _ in 0..200 {
            rtt.record_sample(Duration::from_millis(40));
        }
        assert!((rtt.estimated_rtt.unwrap() - 0.04).abs() < 1e-6);
        assert!(rtt.dev_rtt.unwrap() < 1e-6);
        assert!((rtt.timeout_interval - 0.04).abs() < 1e-5);
    }
}

//! Wall-clock throughput of a sequence of sends.
//!
//! The protocol itself exposes nothing for measurement; a [`Meter`] just
//! wraps the caller's loop of [`crate::client::Client::send`] calls and
//! counts the payload bytes handed in.

use std::fmt;
use std::time::{Duration, Instant};

/// Running measurement, started at construction.
#[derive(Debug, Clone)]
pub struct Meter {
    started: Instant,
    bytes: u64,
    messages: u64,
}

impl Default for Meter {
    fn default() -> Self {
        Self::start()
    }
}

impl Meter {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            bytes: 0,
            messages: 0,
        }
    }

    /// Count one acknowledged payload of `len` bytes.
    pub fn record(&mut self, len: usize) {
        self.bytes += len as u64;
        self.messages += 1;
    }

    /// Snapshot of everything recorded so far.
    pub fn finish(&self) -> Throughput {
        Throughput {
            bytes: self.bytes,
            messages: self.messages,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Payload bytes moved over an interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    pub bytes: u64,
    pub messages: u64,
    pub elapsed: Duration,
}

impl Throughput {
    /// Application-level goodput; `0.0` for an empty interval.
    pub fn bits_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        (self.bytes * 8) as f64 / secs
    }
}

impl fmt::Display for Throughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes in {} messages over {:.3}s ({:.1} bit/s)",
            self.bytes,
            self.messages,
            self.elapsed.as_secs_f64(),
            self.bits_per_second()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_per_second_from_bytes_and_time() {
        let t = Throughput {
            bytes: 1_000,
            messages: 4,
            elapsed: Duration::from_secs(2),
        };
        assert_eq!(t.bits_per_second(), 4_000.0);
        assert_eq!(
            t.to_string(),
            "1000 bytes in 4 messages over 2.000s (4000.0 bit/s)"
        );
    }

    #[test]
    fn zero_elapsed_reports_zero() {
        let t = Throughput {
            bytes: 10,
            messages: 1,
            elapsed: Duration::ZERO,
        };
        assert_eq!(t.bits_per_second(), 0.0);
    }

    #[test]
    fn meter_accumulates() {
        let mut m = Meter::start();
        m.record(3);
        m.record(5);
        let t = m.finish();
        assert_eq!(t.bytes, 8);
        assert_eq!(t.messages, 2);
    }
}

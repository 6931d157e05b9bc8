//! Rolling-window engine performance tracking

use chrono::{DateTime, Duration, Utc};
use meridian_core::PerformanceReport;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::Mutex;

const MAX_SAMPLES: usize = 10_000;

#[derive(Default)]
struct Samples {
    order_times: VecDeque<DateTime<Utc>>,
    fill_times: VecDeque<DateTime<Utc>>,
    submit_latencies_ms: VecDeque<(DateTime<Utc>, i64)>,
    slippages: VecDeque<(DateTime<Utc>, Decimal)>,
    completed: u64,
    rejected: u64,
    terminal: u64,
}

fn push_capped<T>(queue: &mut VecDeque<T>, value: T) {
    if queue.len() >= MAX_SAMPLES {
        queue.pop_front();
    }
    queue.push_back(value);
}

/// Collects engine latency and throughput samples; read through [`report`].
///
/// [`report`]: PerformanceTracker::report
pub struct PerformanceTracker {
    window: Duration,
    samples: Mutex<Samples>,
}

impl PerformanceTracker {
    pub fn new(window: std::time::Duration) -> Self {
        Self {
            window: Duration::from_std(window).unwrap_or(Duration::seconds(60)),
            samples: Mutex::new(Samples::default()),
        }
    }

    pub fn record_order(&self, at: DateTime<Utc>) {
        push_capped(&mut self.samples.lock().unwrap().order_times, at);
    }

    pub fn record_fill(&self, at: DateTime<Utc>) {
        push_capped(&mut self.samples.lock().unwrap().fill_times, at);
    }

    pub fn record_submit_latency(&self, at: DateTime<Utc>, latency_ms: i64) {
        push_capped(
            &mut self.samples.lock().unwrap().submit_latencies_ms,
            (at, latency_ms),
        );
    }

    pub fn record_completion(&self, at: DateTime<Utc>, slippage: Option<Decimal>) {
        let mut samples = self.samples.lock().unwrap();
        samples.completed += 1;
        samples.terminal += 1;
        if let Some(slippage) = slippage {
            push_capped(&mut samples.slippages, (at, slippage));
        }
    }

    pub fn record_rejection(&self) {
        let mut samples = self.samples.lock().unwrap();
        samples.rejected += 1;
        samples.terminal += 1;
    }

    /// Other terminal outcomes (canceled, failed) count toward rates only
    pub fn record_terminal(&self) {
        self.samples.lock().unwrap().terminal += 1;
    }

    pub fn report(&self, now: DateTime<Utc>) -> PerformanceReport {
        let samples = self.samples.lock().unwrap();
        let cutoff = now - self.window;
        let window_secs = Decimal::from(self.window.num_seconds().max(1));

        let orders_in_window = samples.order_times.iter().filter(|t| **t > cutoff).count();
        let fills_in_window = samples.fill_times.iter().filter(|t| **t > cutoff).count();

        let latencies: Vec<i64> = samples
            .submit_latencies_ms
            .iter()
            .filter(|(t, _)| *t > cutoff)
            .map(|(_, ms)| *ms)
            .collect();
        let avg_submit_latency_ms = if latencies.is_empty() {
            Decimal::ZERO
        } else {
            Decimal::from(latencies.iter().sum::<i64>()) / Decimal::from(latencies.len())
        };

        let slippages: Vec<Decimal> = samples
            .slippages
            .iter()
            .filter(|(t, _)| *t > cutoff)
            .map(|(_, s)| *s)
            .collect();
        let avg_slippage = if slippages.is_empty() {
            Decimal::ZERO
        } else {
            slippages.iter().copied().sum::<Decimal>() / Decimal::from(slippages.len())
        };

        let terminal = Decimal::from(samples.terminal.max(1));
        PerformanceReport {
            orders_per_second: Decimal::from(orders_in_window) / window_secs,
            fills_per_second: Decimal::from(fills_in_window) / window_secs,
            fill_rate: Decimal::from(samples.completed) / terminal,
            rejection_rate: Decimal::from(samples.rejected) / terminal,
            avg_submit_latency_ms,
            avg_slippage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rates_are_ratios_of_terminal_orders() {
        let tracker = PerformanceTracker::new(std::time::Duration::from_secs(60));
        let now = Utc::now();

        tracker.record_completion(now, Some(dec!(0.5)));
        tracker.record_completion(now, Some(dec!(1.5)));
        tracker.record_rejection();
        tracker.record_terminal();

        let report = tracker.report(now);
        assert_eq!(report.fill_rate, dec!(0.5));
        assert_eq!(report.rejection_rate, dec!(0.25));
        assert_eq!(report.avg_slippage, dec!(1));
    }

    #[test]
    fn throughput_only_counts_the_window() {
        let tracker = PerformanceTracker::new(std::time::Duration::from_secs(60));
        let now = Utc::now();

        tracker.record_order(now - Duration::seconds(120));
        tracker.record_order(now - Duration::seconds(10));
        tracker.record_fill(now - Duration::seconds(5));

        let report = tracker.report(now);
        assert_eq!(report.orders_per_second, Decimal::from(1) / Decimal::from(60));
        assert_eq!(report.fills_per_second, Decimal::from(1) / Decimal::from(60));
    }
}

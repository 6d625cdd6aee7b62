//! # Metrics Recorder
//!
//! Counters and latency accumulators for the lookup pipeline. One recorder
//! is created at startup and shared (`Arc`) with the cache layer; nothing
//! here is a global.
//!
//! All counters live behind a single lock, so every [`MetricsSnapshot`]
//! satisfies `cache_hits + cache_misses == total_requests` and
//! `errors <= total_requests`.
//!
//! Each [`reset`](MetricsRecorder::reset) starts a new epoch. A load reports
//! its error with the epoch its miss was counted in; errors from an earlier
//! epoch are skipped (and logged), since their request is no longer counted.

use chrono::{DateTime, Utc};
use num_format::{Locale, ToFormattedString};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Hits served from a remembered "not found" (included in `cache_hits`)
    pub negative_hits: u64,
    /// Misses that joined an in-flight load (included in `cache_misses`)
    pub coalesced_waits: u64,
    pub errors: u64,
    /// Sub-elements dropped by the assembler
    pub partial_losses: u64,
    pub evictions: u64,
    /// Mean response time in seconds
    pub avg_response_time: f64,
    pub last_reset: DateTime<Utc>,
}

impl MetricsSnapshot {
    pub fn hit_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_requests as f64
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "📊 Metrics:\n\
             📨 Requests: {}\n\
             ✅ Hits: {} ({} negative, {:.1}%)\n\
             ❌ Misses: {} ({} coalesced)\n\
             🚨 Errors: {}\n\
             🧩 Partial losses: {}\n\
             🗑️ Evictions: {}\n\
             ⏱️ Avg response: {:.3}s\n\
             🔄 Since: {}",
            self.total_requests.to_formatted_string(&Locale::en),
            self.cache_hits.to_formatted_string(&Locale::en),
            self.negative_hits.to_formatted_string(&Locale::en),
            self.hit_ratio() * 100.0,
            self.cache_misses.to_formatted_string(&Locale::en),
            self.coalesced_waits.to_formatted_string(&Locale::en),
            self.errors.to_formatted_string(&Locale::en),
            self.partial_losses.to_formatted_string(&Locale::en),
            self.evictions.to_formatted_string(&Locale::en),
            self.avg_response_time,
            self.last_reset.to_rfc3339(),
        )
    }
}

#[derive(Debug)]
struct Counters {
    total_requests: u64,
    cache_hits: u64,
    cache_misses: u64,
    negative_hits: u64,
    coalesced_waits: u64,
    errors: u64,
    partial_losses: u64,
    evictions: u64,
    latency_sum: Duration,
    latency_samples: u64,
    last_reset: DateTime<Utc>,
    epoch: u64,
}

impl Counters {
    fn new(epoch: u64) -> Self {
        Self {
            total_requests: 0,
            cache_hits: 0,
            cache_misses: 0,
            negative_hits: 0,
            coalesced_waits: 0,
            errors: 0,
            partial_losses: 0,
            evictions: 0,
            latency_sum: Duration::ZERO,
            latency_samples: 0,
            last_reset: Utc::now(),
            epoch,
        }
    }
}

/// Process-lifetime recorder, injected into the cache layer.
#[derive(Debug)]
pub struct MetricsRecorder {
    counters: Mutex<Counters>,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(Counters::new(0)),
        }
    }

    pub fn record_hit(&self) {
        let mut c = self.counters.lock();
        c.total_requests += 1;
        c.cache_hits += 1;
    }

    /// Hit on a remembered "not found".
    pub fn record_negative_hit(&self) {
        let mut c = self.counters.lock();
        c.total_requests += 1;
        c.cache_hits += 1;
        c.negative_hits += 1;
    }

    /// Counts a miss that starts a load. Returns the current epoch, to be
    /// handed back to [`record_error`](Self::record_error) if the load fails.
    pub fn record_miss(&self) -> u64 {
        let mut c = self.counters.lock();
        c.total_requests += 1;
        c.cache_misses += 1;
        c.epoch
    }

    /// Miss que se unió a una carga ya en curso.
    pub fn record_coalesced(&self) {
        let mut c = self.counters.lock();
        c.total_requests += 1;
        c.cache_misses += 1;
        c.coalesced_waits += 1;
    }

    /// Counts one failed load whose miss was recorded in `epoch`.
    ///
    /// Returns `false` when a reset happened in between; the error belongs to
    /// a request the current counters no longer include.
    pub fn record_error(&self, epoch: u64) -> bool {
        let mut c = self.counters.lock();
        if c.epoch != epoch {
            debug!("Error de una época anterior descartado ({} != {})", epoch, c.epoch);
            return false;
        }
        c.errors += 1;
        true
    }

    pub fn record_latency(&self, elapsed: Duration) {
        let mut c = self.counters.lock();
        c.latency_sum += elapsed;
        c.latency_samples += 1;
    }

    pub fn record_partial_loss(&self, skipped: usize) {
        if skipped > 0 {
            self.counters.lock().partial_losses += skipped as u64;
        }
    }

    pub fn record_eviction(&self) {
        self.counters.lock().evictions += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = self.counters.lock();
        let avg_response_time = if c.latency_samples == 0 {
            0.0
        } else {
            c.latency_sum.as_secs_f64() / c.latency_samples as f64
        };

        MetricsSnapshot {
            total_requests: c.total_requests,
            cache_hits: c.cache_hits,
            cache_misses: c.cache_misses,
            negative_hits: c.negative_hits,
            coalesced_waits: c.coalesced_waits,
            errors: c.errors,
            partial_losses: c.partial_losses,
            evictions: c.evictions,
            avg_response_time,
            last_reset: c.last_reset,
        }
    }

    /// Vuelve todos los contadores a cero (acción de operador).
    pub fn reset(&self) {
        let mut c = self.counters.lock();
        let next = c.epoch + 1;
        *c = Counters::new(next);
    }
}

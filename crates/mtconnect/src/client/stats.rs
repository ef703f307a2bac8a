// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client statistics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters updated by the worker thread.
#[derive(Debug)]
pub struct ClientStats {
    /// Documents parsed (probe, current, sample, assets, errors).
    pub documents_received: AtomicU64,
    /// Observations delivered to the handler.
    pub observations_received: AtomicU64,
    /// Raw body bytes read.
    pub bytes_received: AtomicU64,
    /// Sample streams opened after the first one.
    pub reconnects: AtomicU64,
    /// Restarts caused by an agent instance change.
    pub instance_resets: AtomicU64,
    /// Framing or XML failures.
    pub xml_errors: AtomicU64,
    /// Transport failures.
    pub connection_errors: AtomicU64,
    /// Client start time.
    pub created: Instant,
}

impl ClientStats {
    pub fn new() -> Self {
        Self {
            documents_received: AtomicU64::new(0),
            observations_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
            instance_resets: AtomicU64::new(0),
            xml_errors: AtomicU64::new(0),
            connection_errors: AtomicU64::new(0),
            created: Instant::now(),
        }
    }

    pub(crate) fn record_document(&self, observations: usize) {
        self.documents_received.fetch_add(1, Ordering::Relaxed);
        self.observations_received
            .fetch_add(observations as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_bytes(&self, bytes: usize) {
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_instance_reset(&self) {
        self.instance_resets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_xml_error(&self) {
        self.xml_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current stats.
    pub fn snapshot(&self) -> ClientStatsSnapshot {
        ClientStatsSnapshot {
            documents_received: self.documents_received.load(Ordering::Relaxed),
            observations_received: self.observations_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            instance_resets: self.instance_resets.load(Ordering::Relaxed),
            xml_errors: self.xml_errors.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            uptime_secs: self.created.elapsed().as_secs(),
        }
    }
}

impl Default for ClientStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of client statistics.
#[derive(Debug, Clone, Default)]
pub struct ClientStatsSnapshot {
    pub documents_received: u64,
    pub observations_received: u64,
    pub bytes_received: u64,
    pub reconnects: u64,
    pub instance_resets: u64,
    pub xml_errors: u64,
    pub connection_errors: u64,
    pub uptime_secs: u64,
}

impl ClientStatsSnapshot {
    /// Observations per second since start.
    pub fn observations_per_second(&self) -> f64 {
        if self.uptime_secs > 0 {
            self.observations_received as f64 / self.uptime_secs as f64
        } else {
            0.0
        }
    }
}

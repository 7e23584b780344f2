// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adapter configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const SCAN_RANGE: (u16, u16) = (4, 16_384);
const CONNECTION_INTERVAL_RANGE: (u16, u16) = (6, 3200);
const CONNECTION_LATENCY_RANGE: (u16, u16) = (0, 500);
const CONNECTION_TIMEOUT_RANGE: (u16, u16) = (10, 3200);

/// Configuration for a [`BlueGigaAdapter`](crate::BlueGigaAdapter).
///
/// Scan intervals and windows are in 0.625 ms units, connection intervals in
/// 1.25 ms units and the connection timeout in 10 ms units, as the adapter
/// expects them. Durations serialize as milliseconds.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use bluegiga_lib::adapter::AdapterConfig;
///
/// let config = AdapterConfig::new("/dev/ttyACM0")
///     .with_active_scan(0x40, 0x30)
///     .with_discovery_enabled(false)
///     .with_command_timeout(Duration::from_secs(2));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Serial device path.
    pub port: String,
    /// Scan interval used while actively scanning.
    pub active_scan_interval: u16,
    /// Scan window used while actively scanning.
    pub active_scan_window: u16,
    /// Scan interval used while passively scanning.
    pub passive_scan_interval: u16,
    /// Scan window used while passively scanning.
    pub passive_scan_window: u16,
    /// Idle time before passive scanning is resumed after a command.
    #[serde(with = "duration_ms")]
    pub passive_scan_idle_time: Duration,
    /// Minimum connection interval.
    pub connection_interval_min: u16,
    /// Maximum connection interval.
    pub connection_interval_max: u16,
    /// Slave latency.
    pub connection_latency: u16,
    /// Supervision timeout.
    pub connection_timeout: u16,
    /// Whether passively discovered devices are announced.
    pub discovery_enabled: bool,
    /// Timeout for a single command transaction.
    #[serde(with = "duration_ms")]
    pub command_timeout: Duration,
    /// Timeout for a GATT procedure.
    #[serde(with = "duration_ms")]
    pub procedure_timeout: Duration,
    /// Timeout for establishing a connection.
    #[serde(with = "duration_ms")]
    pub connect_timeout: Duration,
    /// Delay between initialization attempts.
    #[serde(with = "duration_ms")]
    pub init_retry_interval: Duration,
    /// Period of the inactive device sweep.
    #[serde(with = "duration_ms")]
    pub inactive_device_sweep_interval: Duration,
    /// Age after which an unused device is evicted.
    #[serde(with = "duration_ms")]
    pub inactive_device_grace: Duration,
    /// Period at which known devices are re-announced.
    #[serde(with = "duration_ms")]
    pub discovery_refresh_interval: Duration,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            active_scan_interval: 0x40,
            active_scan_window: 0x32,
            passive_scan_interval: 0x40,
            passive_scan_window: 0x32,
            passive_scan_idle_time: Duration::from_millis(1000),
            connection_interval_min: 0x3C,
            connection_interval_max: 0x64,
            connection_latency: 0,
            connection_timeout: 0x64,
            discovery_enabled: true,
            command_timeout: Duration::from_secs(5),
            procedure_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(60),
            init_retry_interval: Duration::from_secs(60),
            inactive_device_sweep_interval: Duration::from_secs(60),
            inactive_device_grace: Duration::from_secs(300),
            discovery_refresh_interval: Duration::from_secs(10),
        }
    }
}

impl AdapterConfig {
    /// Creates a configuration with default values for `port`.
    #[must_use]
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    /// Sets the active scan interval and window.
    #[must_use]
    pub fn with_active_scan(mut self, interval: u16, window: u16) -> Self {
        self.active_scan_interval = interval;
        self.active_scan_window = window;
        self
    }

    /// Sets the passive scan interval and window.
    #[must_use]
    pub fn with_passive_scan(mut self, interval: u16, window: u16) -> Self {
        self.passive_scan_interval = interval;
        self.passive_scan_window = window;
        self
    }

    /// Sets the idle time before passive scanning resumes.
    #[must_use]
    pub fn with_passive_scan_idle_time(mut self, idle: Duration) -> Self {
        self.passive_scan_idle_time = idle;
        self
    }

    /// Sets the connection interval range.
    #[must_use]
    pub fn with_connection_interval(mut self, min: u16, max: u16) -> Self {
        self.connection_interval_min = min;
        self.connection_interval_max = max;
        self
    }

    /// Sets the slave latency.
    #[must_use]
    pub fn with_connection_latency(mut self, latency: u16) -> Self {
        self.connection_latency = latency;
        self
    }

    /// Sets the supervision timeout.
    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: u16) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Enables or disables announcement of passively discovered devices.
    #[must_use]
    pub fn with_discovery_enabled(mut self, enabled: bool) -> Self {
        self.discovery_enabled = enabled;
        self
    }

    /// Sets the command transaction timeout.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the GATT procedure timeout.
    #[must_use]
    pub fn with_procedure_timeout(mut self, timeout: Duration) -> Self {
        self.procedure_timeout = timeout;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the delay between initialization attempts.
    #[must_use]
    pub fn with_init_retry_interval(mut self, interval: Duration) -> Self {
        self.init_retry_interval = interval;
        self
    }

    /// Sets the sweep period and grace period for inactive devices.
    #[must_use]
    pub fn with_inactive_device_eviction(mut self, sweep: Duration, grace: Duration) -> Self {
        self.inactive_device_sweep_interval = sweep;
        self.inactive_device_grace = grace;
        self
    }

    /// Sets the discovery refresh period.
    #[must_use]
    pub fn with_discovery_refresh_interval(mut self, interval: Duration) -> Self {
        self.discovery_refresh_interval = interval;
        self
    }

    /// Checks that every value is accepted by the adapter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingPort`] without a port and
    /// [`ConfigError::OutOfRange`] for the first value outside its range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port.trim().is_empty() {
            return Err(ConfigError::MissingPort);
        }

        check("active_scan_interval", self.active_scan_interval, SCAN_RANGE)?;
        check(
            "active_scan_window",
            self.active_scan_window,
            (SCAN_RANGE.0, self.active_scan_interval),
        )?;
        check("passive_scan_interval", self.passive_scan_interval, SCAN_RANGE)?;
        check(
            "passive_scan_window",
            self.passive_scan_window,
            (SCAN_RANGE.0, self.passive_scan_interval),
        )?;
        check(
            "connection_interval_max",
            self.connection_interval_max,
            CONNECTION_INTERVAL_RANGE,
        )?;
        check(
            "connection_interval_min",
            self.connection_interval_min,
            (CONNECTION_INTERVAL_RANGE.0, self.connection_interval_max),
        )?;
        check(
            "connection_latency",
            self.connection_latency,
            CONNECTION_LATENCY_RANGE,
        )?;
        check(
            "connection_timeout",
            self.connection_timeout,
            CONNECTION_TIMEOUT_RANGE,
        )?;
        Ok(())
    }
}

fn check(field: &'static str, value: u16, (min, max): (u16, u16)) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            min: u32::from(min),
            max: u32::from(max),
            actual: u32::from(value),
        })
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The adapter coordinator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;

use crate::device::{BlueGigaDevice, ConnectionState};
use crate::error::{Error, ProtocolError, Result};
use crate::event::{AdapterEvent, EventBus};
use crate::protocol::{
    AdapterInfo, BAUD_RATE, Command, Event, Frame, GapConnectableMode, GapDiscoverMode,
    GapDiscoverableMode, Response, SerialHandler, SerialPortOpener, TransactionManager,
};
use crate::scheduler::{ScheduledTask, Scheduler};
use crate::subscription::{ListenerId, ListenerRegistry};
use crate::types::{AddressType, BluetoothAddress, PRIMARY_SERVICE, uuid_from_u16};

use super::config::AdapterConfig;
use super::discovery::{DiscoveredDevice, DiscoverySink};
use super::status::AdapterStatus;

const FIRST_HANDLE: u16 = 0x0001;
const LAST_HANDLE: u16 = 0xFFFF;

struct Link {
    serial: SerialHandler,
    transactions: TransactionManager,
}

#[derive(Default)]
struct PassiveScanTimer {
    seq: u64,
    task: Option<ScheduledTask>,
}

/// Shared adapter state. Devices hold a weak reference to it.
pub(crate) struct AdapterInner {
    me: Weak<AdapterInner>,
    config: AdapterConfig,
    opener: Arc<dyn SerialPortOpener>,
    scheduler: Scheduler,
    status: RwLock<AdapterStatus>,
    events: EventBus,
    link: RwLock<Option<Link>>,
    start_lock: tokio::sync::Mutex<()>,
    init_complete: AtomicBool,
    active_scan: AtomicBool,
    max_connections: AtomicU8,
    address: RwLock<Option<BluetoothAddress>>,
    info: RwLock<Option<AdapterInfo>>,
    /// Known devices, keyed by address.
    devices: RwLock<HashMap<BluetoothAddress, Arc<BlueGigaDevice>>>,
    /// Connection handle to device address. Only event handlers mutate it.
    connections: RwLock<HashMap<u8, BluetoothAddress>>,
    discovery_sinks: ListenerRegistry<dyn DiscoverySink>,
    passive_scan: Mutex<PassiveScanTimer>,
    init_task: Mutex<Option<ScheduledTask>>,
    housekeeping: Mutex<Vec<ScheduledTask>>,
}

fn check_result(response: Response) -> Result<Response> {
    match response.result() {
        Some(result) if !result.is_success() => Err(Error::Command(result)),
        _ => Ok(response),
    }
}

fn unexpected(command: &Command, response: &Response) -> Error {
    ProtocolError::UnexpectedResponse {
        expected: command.message_id(),
        actual: response.message_id(),
    }
    .into()
}

impl AdapterInner {
    // =========================================================================
    // Status
    // =========================================================================

    fn set_status(&self, status: AdapterStatus) {
        {
            let mut current = self.status.write();
            if *current == status {
                return;
            }
            *current = status.clone();
        }
        tracing::info!(port = %self.config.port, %status, "Adapter status changed");
        self.events.publish(AdapterEvent::StatusChanged(status));
    }

    fn is_initialized(&self) -> bool {
        self.init_complete.load(Ordering::Acquire)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    async fn start(&self) -> Result<()> {
        let _guard = self.start_lock.lock().await;
        if self.is_initialized() {
            return Ok(());
        }

        self.set_status(AdapterStatus::Initializing);
        if let Err(e) = self.bring_up().await.and_then(|()| self.go_online()) {
            tracing::warn!(port = %self.config.port, error = %e, "Adapter initialization failed");
            self.release_link();
            self.set_status(AdapterStatus::Offline(e.to_string()));
            return Err(e);
        }
        Ok(())
    }

    /// Marks the adapter initialized, unless the link was lost during
    /// bring-up.
    fn go_online(&self) -> Result<()> {
        // Held until online so a concurrent link loss runs after this
        let link = self.link.read();
        if link.is_none() {
            return Err(ProtocolError::ChannelClosed(self.config.port.clone()).into());
        }

        self.init_complete.store(true, Ordering::Release);
        tracing::info!(
            port = %self.config.port,
            address = ?*self.address.read(),
            max_connections = self.max_connections.load(Ordering::Acquire),
            "BlueGiga adapter initialized"
        );
        self.set_status(AdapterStatus::Online);
        self.start_housekeeping();
        Ok(())
    }

    /// Opens the link and brings the adapter to a known state.
    async fn bring_up(&self) -> Result<()> {
        self.config.validate()?;
        let stream = self.opener.open(&self.config.port, BAUD_RATE)?;
        let serial = SerialHandler::start(self.config.port.clone(), stream);
        let transactions = TransactionManager::new(serial.clone());

        let me = self.me.clone();
        transactions.add_event_listener(Arc::new(move |frame: &Frame| {
            if let (Frame::Event(event), Some(inner)) = (frame, me.upgrade()) {
                inner.on_event(event);
            }
        }));
        let me = self.me.clone();
        serial.set_closed_observer(Box::new(move |reason| {
            if let Some(inner) = me.upgrade() {
                inner.on_link_lost(&reason);
            }
        }));
        *self.link.write() = Some(Link {
            serial,
            transactions,
        });

        // Whatever the adapter was doing before belongs to a previous session
        if let Err(e) = self.send_unchecked(&Command::GapEndProcedure).await.and_then(check_result) {
            tracing::debug!(error = %e, "No procedure to end");
        }

        let command = Command::GapSetMode {
            discover: GapDiscoverableMode::NonDiscoverable,
            connect: GapConnectableMode::NonConnectable,
        };
        self.send_unchecked(&command).await.and_then(check_result)?;

        let command = Command::SystemGetInfo;
        let info = match self.send_unchecked(&command).await? {
            Response::SystemGetInfo(info) => info,
            other => return Err(unexpected(&command, &other)),
        };
        tracing::debug!(
            firmware = %info.version(),
            protocol = info.protocol_version,
            hardware = info.hardware,
            "Adapter info"
        );
        *self.info.write() = Some(info);

        let command = Command::SystemGetConnections;
        let max_connections = match self.send_unchecked(&command).await? {
            Response::SystemGetConnections { max_connections } => max_connections,
            other => return Err(unexpected(&command, &other)),
        };
        self.max_connections.store(max_connections, Ordering::Release);

        for connection in 0..max_connections {
            let command = Command::ConnectionDisconnect { connection };
            if let Err(e) = self.send_unchecked(&command).await.and_then(check_result) {
                tracing::trace!(connection, error = %e, "Connection slot already free");
            }
        }
        self.connections.write().clear();

        let command = Command::SystemAddressGet;
        let address = match self.send_unchecked(&command).await? {
            Response::SystemAddressGet { address } => address,
            other => return Err(unexpected(&command, &other)),
        };
        *self.address.write() = Some(address);
        Ok(())
    }

    fn release_link(&self) {
        if let Some(link) = self.link.write().take() {
            link.transactions.close();
            link.serial.close();
        }
    }

    fn on_link_lost(&self, reason: &str) {
        tracing::warn!(port = %self.config.port, reason, "Serial link lost");
        self.release_link();
        self.init_complete.store(false, Ordering::Release);
        self.stop_housekeeping();
        self.connections.write().clear();

        let devices: Vec<_> = self.devices.read().values().cloned().collect();
        for device in devices {
            device.link_lost();
        }
        self.set_status(AdapterStatus::Offline(reason.to_string()));
    }

    async fn dispose(&self) {
        if let Some(task) = self.init_task.lock().take() {
            task.cancel();
        }
        self.stop_housekeeping();

        let devices: Vec<_> = self.devices.write().drain().map(|(_, d)| d).collect();
        for device in devices {
            device.dispose().await;
        }

        self.init_complete.store(false, Ordering::Release);
        self.cancel_passive_scan();
        self.release_link();
        self.connections.write().clear();
        self.set_status(AdapterStatus::Uninitialized);
        tracing::debug!(port = %self.config.port, "Adapter disposed");
    }

    // =========================================================================
    // Scheduled tasks
    // =========================================================================

    fn start_housekeeping(&self) {
        self.schedule_passive_scan();

        let mut tasks = self.housekeeping.lock();
        for task in tasks.drain(..) {
            task.cancel();
        }

        let me = self.me.clone();
        let sweep = self.config.inactive_device_sweep_interval;
        tasks.push(self.scheduler.schedule_with_fixed_delay(sweep, sweep, move || {
            let me = me.clone();
            async move {
                if let Some(inner) = me.upgrade() {
                    inner.remove_inactive_devices().await;
                }
            }
        }));

        let me = self.me.clone();
        let refresh = self.config.discovery_refresh_interval;
        tasks.push(self.scheduler.schedule_with_fixed_delay(refresh, refresh, move || {
            let me = me.clone();
            async move {
                if let Some(inner) = me.upgrade() {
                    inner.announce_all();
                }
            }
        }));
    }

    fn stop_housekeeping(&self) {
        self.cancel_passive_scan();
        for task in self.housekeeping.lock().drain(..) {
            task.cancel();
        }
    }

    fn cancel_passive_scan(&self) {
        if let Some(task) = self.passive_scan.lock().task.take() {
            task.cancel();
        }
    }

    /// Re-arms the passive scan timer, replacing any pending one.
    fn schedule_passive_scan(&self) {
        let mut timer = self.passive_scan.lock();
        timer.seq += 1;
        let seq = timer.seq;
        let me = self.me.clone();
        let task = self
            .scheduler
            .schedule(self.config.passive_scan_idle_time, move || async move {
                if let Some(inner) = me.upgrade() {
                    inner.on_passive_scan_timer(seq).await;
                }
            });
        if let Some(previous) = timer.task.replace(task) {
            previous.cancel();
        }
    }

    async fn on_passive_scan_timer(&self, seq: u64) {
        {
            let mut timer = self.passive_scan.lock();
            if timer.seq != seq {
                return;
            }
            timer.task = None;
        }
        if self.active_scan.load(Ordering::Acquire) || !self.is_initialized() {
            return;
        }
        tracing::debug!("Resuming passive scan");
        self.bg_start_scanning(
            false,
            self.config.passive_scan_interval,
            self.config.passive_scan_window,
        )
        .await;
    }

    async fn remove_inactive_devices(&self) -> usize {
        let grace = self.config.inactive_device_grace;
        let evicted: Vec<Arc<BlueGigaDevice>> = {
            let mut devices = self.devices.write();
            let stale: Vec<BluetoothAddress> = devices
                .values()
                .filter(|d| {
                    !d.has_listeners()
                        && d.connection_handle().is_none()
                        && d.connection_state() != ConnectionState::Connected
                        && d.is_inactive(grace)
                })
                .map(|d| d.address())
                .collect();
            stale.iter().filter_map(|a| devices.remove(a)).collect()
        };

        for device in &evicted {
            tracing::debug!(address = %device.address(), "Removing inactive device");
            device.dispose().await;
            self.events.publish(AdapterEvent::DeviceRemoved {
                address: device.address(),
            });
        }
        evicted.len()
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    fn announcements_enabled(&self) -> bool {
        self.config.discovery_enabled || self.active_scan.load(Ordering::Acquire)
    }

    /// Hands a device snapshot to the discovery sinks.
    pub(crate) fn report_discovered(&self, device: &DiscoveredDevice) {
        if !self.announcements_enabled() {
            return;
        }
        tracing::debug!(address = %device.address, name = ?device.name, "Device discovered");
        self.discovery_sinks
            .for_each(|sink| sink.device_discovered(device));
    }

    fn announce_all(&self) {
        if !self.announcements_enabled() {
            return;
        }
        let devices: Vec<_> = self.devices.read().values().cloned().collect();
        for device in devices {
            if device.connection_state() != ConnectionState::Discovering {
                self.report_discovered(&device.snapshot());
            }
        }
    }

    fn device(&self, address: &BluetoothAddress) -> Option<Arc<BlueGigaDevice>> {
        self.devices.read().get(address).cloned()
    }

    fn device_or_create(&self, address: BluetoothAddress) -> Arc<BlueGigaDevice> {
        if let Some(device) = self.device(&address) {
            return device;
        }

        let (device, created) = {
            let mut devices = self.devices.write();
            match devices.get(&address) {
                Some(device) => (Arc::clone(device), false),
                None => {
                    let device = BlueGigaDevice::new(
                        address,
                        self.me.clone(),
                        self.scheduler.clone(),
                        self.config.connect_timeout,
                        self.config.procedure_timeout,
                    );
                    devices.insert(address, Arc::clone(&device));
                    (device, true)
                }
            }
        };

        if created {
            tracing::debug!(%address, "Device added");
            self.events.publish(AdapterEvent::DeviceAdded { address });
        }
        device
    }

    // =========================================================================
    // Event dispatch
    // =========================================================================

    /// Handles an event on the serial reader task.
    fn on_event(&self, event: &Event) {
        match event {
            Event::GapScanResponse { sender, .. } => {
                if !self.is_initialized() {
                    tracing::trace!(address = %sender, "Ignoring scan response before initialization");
                    return;
                }
                self.device_or_create(*sender).handle_event(event);
            }
            Event::ConnectionStatus {
                connection,
                flags,
                address,
                ..
            } => {
                if flags.connected() {
                    let mut connections = self.connections.write();
                    let before = connections.len();
                    connections.retain(|slot, a| slot == connection || *a != *address);
                    if connections.len() != before {
                        tracing::debug!(%address, "Dropped stale connection slot");
                    }
                    connections.insert(*connection, *address);
                    tracing::debug!(connection, %address, "Connection slot in use");
                }
                match self.device(address) {
                    Some(device) => device.handle_event(event),
                    None => tracing::debug!(%address, "Connection status for unknown device"),
                }
            }
            Event::ConnectionDisconnected { connection, reason } => {
                let address = self.connections.read().get(connection).copied();
                if let Some(device) = address.and_then(|a| self.device(&a)) {
                    device.handle_event(event);
                }
                self.connections.write().remove(connection);
                tracing::debug!(connection, %reason, "Connection slot released");
            }
            Event::SystemBoot(info) => {
                tracing::warn!(firmware = %info.version(), "Adapter rebooted");
            }
            other => {
                let Some(connection) = other.connection() else {
                    return;
                };
                let address = self.connections.read().get(&connection).copied();
                match address.and_then(|a| self.device(&a)) {
                    Some(device) => device.handle_event(other),
                    None => tracing::trace!(connection, "Event for unknown connection"),
                }
            }
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    fn transactions(&self) -> Result<TransactionManager> {
        self.link
            .read()
            .as_ref()
            .map(|link| link.transactions.clone())
            .ok_or(Error::NotInitialized)
    }

    async fn send_unchecked(&self, command: &Command) -> Result<Response> {
        let transactions = self.transactions()?;
        Ok(transactions
            .send_transaction(command, self.config.command_timeout)
            .await?)
    }

    /// Sends a command once initialized. Commands that interrupt scanning
    /// hold off the passive scan timer while they run and re-arm it after.
    async fn send_command(&self, command: &Command, interrupts_scan: bool) -> Result<Response> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }
        if interrupts_scan {
            self.cancel_passive_scan();
        }
        let result = self.send_unchecked(command).await;
        if interrupts_scan && self.is_initialized() {
            self.schedule_passive_scan();
        }
        result
    }

    async fn execute(&self, command: Command, interrupts_scan: bool) -> bool {
        match self
            .send_command(&command, interrupts_scan)
            .await
            .and_then(check_result)
        {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(command = command.name(), error = %e, "Command failed");
                false
            }
        }
    }

    pub(crate) async fn bg_connect(&self, address: BluetoothAddress, address_type: AddressType) -> bool {
        {
            let connections = self.connections.read();
            if connections.values().any(|a| *a == address) {
                tracing::debug!(%address, "Already connected");
                return false;
            }
            let max = usize::from(self.max_connections.load(Ordering::Acquire));
            if connections.len() >= max {
                tracing::warn!(%address, max_connections = max, "No free connection slot");
                return false;
            }
        }
        if !self.is_initialized() {
            return false;
        }

        // Scanning must stop before a connection can be opened
        self.execute(Command::GapEndProcedure, true).await;
        self.execute(
            Command::GapConnectDirect {
                address,
                address_type,
                interval_min: self.config.connection_interval_min,
                interval_max: self.config.connection_interval_max,
                timeout: self.config.connection_timeout,
                latency: self.config.connection_latency,
            },
            true,
        )
        .await
    }

    pub(crate) async fn bg_disconnect(&self, connection: u8) -> bool {
        self.execute(Command::ConnectionDisconnect { connection }, true)
            .await
    }

    pub(crate) async fn bg_find_primary_services(&self, connection: u8) -> bool {
        self.execute(
            Command::AttClientReadByGroupType {
                connection,
                start: FIRST_HANDLE,
                end: LAST_HANDLE,
                uuid: uuid_from_u16(PRIMARY_SERVICE),
            },
            true,
        )
        .await
    }

    pub(crate) async fn bg_find_characteristics(&self, connection: u8) -> bool {
        self.execute(
            Command::AttClientFindInformation {
                connection,
                start: FIRST_HANDLE,
                end: LAST_HANDLE,
            },
            true,
        )
        .await
    }

    pub(crate) async fn bg_read_characteristic(&self, connection: u8, handle: u16) -> bool {
        self.execute(Command::AttClientReadByHandle { connection, handle }, true)
            .await
    }

    pub(crate) async fn bg_write_characteristic(&self, connection: u8, handle: u16, data: &[u8]) -> bool {
        self.execute(
            Command::AttClientAttributeWrite {
                connection,
                handle,
                data: data.to_vec(),
            },
            true,
        )
        .await
    }

    pub(crate) async fn bg_write_without_response(
        &self,
        connection: u8,
        handle: u16,
        data: &[u8],
    ) -> bool {
        self.execute(
            Command::AttClientWriteCommand {
                connection,
                handle,
                data: data.to_vec(),
            },
            true,
        )
        .await
    }

    pub(crate) async fn bg_get_rssi(&self, connection: u8) -> Option<i8> {
        let command = Command::ConnectionGetRssi { connection };
        match self.send_command(&command, false).await {
            Ok(Response::ConnectionGetRssi { rssi, .. }) => Some(rssi),
            Ok(other) => {
                tracing::warn!(error = %unexpected(&command, &other), "RSSI request failed");
                None
            }
            Err(e) => {
                tracing::warn!(connection, error = %e, "RSSI request failed");
                None
            }
        }
    }

    pub(crate) async fn bg_end_procedure(&self) -> bool {
        self.execute(Command::GapEndProcedure, false).await
    }

    async fn bg_set_mode(&self, discover: GapDiscoverableMode, connect: GapConnectableMode) -> bool {
        self.execute(Command::GapSetMode { discover, connect }, false)
            .await
    }

    async fn bg_start_scanning(&self, active: bool, interval: u16, window: u16) -> bool {
        if !self
            .execute(
                Command::GapSetScanParameters {
                    interval,
                    window,
                    active,
                },
                false,
            )
            .await
        {
            return false;
        }
        let ok = self
            .execute(
                Command::GapDiscover {
                    mode: GapDiscoverMode::Observation,
                },
                false,
            )
            .await;
        if ok {
            tracing::debug!(active, interval, window, "Scanning started");
        }
        ok
    }

    async fn scan_start(&self) -> bool {
        self.active_scan.store(true, Ordering::Release);
        tracing::info!(port = %self.config.port, "Starting active scan");
        self.cancel_passive_scan();
        self.bg_end_procedure().await;
        let ok = self
            .bg_start_scanning(
                true,
                self.config.active_scan_interval,
                self.config.active_scan_window,
            )
            .await;
        self.announce_all();
        ok
    }

    async fn scan_stop(&self) -> bool {
        self.active_scan.store(false, Ordering::Release);
        tracing::info!(port = %self.config.port, "Stopping active scan");
        self.cancel_passive_scan();
        self.bg_end_procedure().await;
        self.bg_start_scanning(
            false,
            self.config.passive_scan_interval,
            self.config.passive_scan_window,
        )
        .await
    }
}

/// A BlueGiga BLED112-style USB dongle speaking BGAPI.
///
/// The adapter owns the serial link, the registry of known devices and the
/// table of connection slots. It switches between passive scanning (the
/// default) and active scanning on request, evicts devices that have not
/// been seen for a while and periodically re-announces known devices to
/// discovery sinks.
///
/// Cloning the adapter is cheap; all clones share the same state.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use bluegiga_lib::adapter::{AdapterConfig, DiscoveredDevice};
/// use bluegiga_lib::protocol::TokioSerialOpener;
/// use bluegiga_lib::{BlueGigaAdapter, Scheduler};
///
/// #[tokio::main]
/// async fn main() -> bluegiga_lib::Result<()> {
///     let adapter = BlueGigaAdapter::new(
///         AdapterConfig::new("/dev/ttyACM0"),
///         Arc::new(TokioSerialOpener),
///         Scheduler::current(),
///     );
///
///     adapter.add_discovery_sink(Arc::new(|device: &DiscoveredDevice| {
///         println!("{} {:?} {:?}", device.address, device.name, device.rssi);
///     }));
///
///     adapter.start().await?;
///     adapter.scan_start().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct BlueGigaAdapter {
    inner: Arc<AdapterInner>,
}

impl BlueGigaAdapter {
    /// Creates an adapter. Nothing is opened until [`initialize`] or
    /// [`start`] is called.
    ///
    /// [`initialize`]: Self::initialize
    /// [`start`]: Self::start
    #[must_use]
    pub fn new(
        config: AdapterConfig,
        opener: Arc<dyn SerialPortOpener>,
        scheduler: Scheduler,
    ) -> Self {
        let inner = Arc::new_cyclic(|me| AdapterInner {
            me: me.clone(),
            config,
            opener,
            scheduler,
            status: RwLock::new(AdapterStatus::Uninitialized),
            events: EventBus::new(),
            link: RwLock::new(None),
            start_lock: tokio::sync::Mutex::new(()),
            init_complete: AtomicBool::new(false),
            active_scan: AtomicBool::new(false),
            max_connections: AtomicU8::new(0),
            address: RwLock::new(None),
            info: RwLock::new(None),
            devices: RwLock::new(HashMap::new()),
            connections: RwLock::new(HashMap::new()),
            discovery_sinks: ListenerRegistry::new(),
            passive_scan: Mutex::new(PassiveScanTimer::default()),
            init_task: Mutex::new(None),
            housekeeping: Mutex::new(Vec::new()),
        });
        Self { inner }
    }

    /// Creates an adapter on a real serial port, scheduling on the current
    /// runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    #[cfg(feature = "serial")]
    #[must_use]
    pub fn with_serial_port(config: AdapterConfig) -> Self {
        Self::new(
            config,
            Arc::new(crate::protocol::TokioSerialOpener),
            Scheduler::current(),
        )
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Starts the periodic initialization task.
    ///
    /// The task runs immediately and then every
    /// [`init_retry_interval`](AdapterConfig::init_retry_interval), calling
    /// [`start`](Self::start) while the adapter is not initialized. This is
    /// how the adapter recovers after the serial link is lost.
    pub fn initialize(&self) {
        let mut slot = self.inner.init_task.lock();
        if slot.is_some() {
            return;
        }
        let me = Arc::downgrade(&self.inner);
        let retry = self.inner.config.init_retry_interval;
        *slot = Some(
            self.inner
                .scheduler
                .schedule_with_fixed_delay(Duration::ZERO, retry, move || {
                    let me = me.clone();
                    async move {
                        if let Some(inner) = me.upgrade()
                            && !inner.is_initialized()
                        {
                            // Failures are logged and reflected in the status
                            let _ = inner.start().await;
                        }
                    }
                }),
        );
    }

    /// Opens the serial port and initializes the adapter.
    ///
    /// Stops any running procedure, makes the adapter non-discoverable and
    /// non-connectable, reads its capabilities, closes every connection
    /// slot and reads the local address. Does nothing if already
    /// initialized.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the port cannot be
    /// opened or a command fails. The adapter is then offline and the link
    /// is released.
    pub async fn start(&self) -> Result<()> {
        self.inner.start().await
    }

    /// Stops every task, disposes every device and closes the link.
    pub async fn dispose(&self) {
        self.inner.dispose().await;
    }

    /// Resets the adapter. The link is usually lost and re-established by
    /// the initialization task.
    pub async fn reset(&self) -> bool {
        let Ok(transactions) = self.inner.transactions() else {
            return false;
        };
        match transactions.send(&Command::SystemReset { boot_in_dfu: false }).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Reset failed");
                false
            }
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AdapterConfig {
        &self.inner.config
    }

    /// Returns the adapter status.
    #[must_use]
    pub fn status(&self) -> AdapterStatus {
        self.inner.status.read().clone()
    }

    /// Returns true once initialization completed and until the link is lost.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.is_initialized()
    }

    /// Returns the local Bluetooth address, known after initialization.
    #[must_use]
    pub fn address(&self) -> Option<BluetoothAddress> {
        *self.inner.address.read()
    }

    /// Returns the number of connection slots, known after initialization.
    #[must_use]
    pub fn max_connections(&self) -> u8 {
        self.inner.max_connections.load(Ordering::Acquire)
    }

    /// Returns the firmware information, known after initialization.
    #[must_use]
    pub fn adapter_info(&self) -> Option<AdapterInfo> {
        *self.inner.info.read()
    }

    /// Returns true while active scanning is requested.
    #[must_use]
    pub fn is_active_scan(&self) -> bool {
        self.inner.active_scan.load(Ordering::Acquire)
    }

    /// Subscribes to adapter events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AdapterEvent> {
        self.inner.events.subscribe()
    }

    /// Adds a discovery sink.
    pub fn add_discovery_sink(&self, sink: Arc<dyn DiscoverySink>) -> ListenerId {
        self.inner.discovery_sinks.add(sink)
    }

    /// Removes a discovery sink.
    pub fn remove_discovery_sink(&self, id: ListenerId) -> bool {
        self.inner.discovery_sinks.remove(id)
    }

    // =========================================================================
    // Devices
    // =========================================================================

    /// Returns the device with `address`, creating it if needed.
    pub fn get_device(&self, address: BluetoothAddress) -> Arc<BlueGigaDevice> {
        self.inner.device_or_create(address)
    }

    /// Returns the device with `address` if it is known.
    #[must_use]
    pub fn device(&self, address: &BluetoothAddress) -> Option<Arc<BlueGigaDevice>> {
        self.inner.device(address)
    }

    /// Returns every known device.
    #[must_use]
    pub fn devices(&self) -> Vec<Arc<BlueGigaDevice>> {
        self.inner.devices.read().values().cloned().collect()
    }

    /// Returns the occupied connection slots as handle and address pairs.
    #[must_use]
    pub fn connections(&self) -> Vec<(u8, BluetoothAddress)> {
        let mut connections: Vec<_> = self
            .inner
            .connections
            .read()
            .iter()
            .map(|(handle, address)| (*handle, *address))
            .collect();
        connections.sort_unstable();
        connections
    }

    /// Returns the number of occupied connection slots.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.inner.connections.read().len()
    }

    /// Evicts devices without listeners that are not connected and were not
    /// seen within [`inactive_device_grace`](AdapterConfig::inactive_device_grace).
    ///
    /// Runs periodically once the adapter is online. Returns the number of
    /// evicted devices.
    pub async fn remove_inactive_devices(&self) -> usize {
        self.inner.remove_inactive_devices().await
    }

    // =========================================================================
    // Scanning
    // =========================================================================

    /// Switches to active scanning and re-announces every known device.
    pub async fn scan_start(&self) -> bool {
        self.inner.scan_start().await
    }

    /// Switches back to passive scanning.
    pub async fn scan_stop(&self) -> bool {
        self.inner.scan_stop().await
    }

    // =========================================================================
    // BGAPI commands
    // =========================================================================

    /// Sends a raw command and waits for its response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before initialization completed, or
    /// the protocol error of the transaction.
    pub async fn send_command(&self, command: &Command) -> Result<Response> {
        self.inner.send_command(command, true).await
    }

    /// Opens a connection. Refused without wire traffic if the address is
    /// already connected or every slot is in use.
    pub async fn bg_connect(&self, address: BluetoothAddress, address_type: AddressType) -> bool {
        self.inner.bg_connect(address, address_type).await
    }

    /// Closes a connection. The slot is released when the adapter reports
    /// the disconnection.
    pub async fn bg_disconnect(&self, connection: u8) -> bool {
        self.inner.bg_disconnect(connection).await
    }

    /// Starts primary service discovery on a connection.
    pub async fn bg_find_primary_services(&self, connection: u8) -> bool {
        self.inner.bg_find_primary_services(connection).await
    }

    /// Starts attribute discovery on a connection.
    pub async fn bg_find_characteristics(&self, connection: u8) -> bool {
        self.inner.bg_find_characteristics(connection).await
    }

    /// Reads an attribute.
    pub async fn bg_read_characteristic(&self, connection: u8, handle: u16) -> bool {
        self.inner.bg_read_characteristic(connection, handle).await
    }

    /// Writes an attribute with acknowledgement.
    pub async fn bg_write_characteristic(&self, connection: u8, handle: u16, data: &[u8]) -> bool {
        self.inner
            .bg_write_characteristic(connection, handle, data)
            .await
    }

    /// Writes an attribute without acknowledgement.
    pub async fn bg_write_without_response(&self, connection: u8, handle: u16, data: &[u8]) -> bool {
        self.inner
            .bg_write_without_response(connection, handle, data)
            .await
    }

    /// Reads the signal strength of a connection.
    pub async fn bg_get_rssi(&self, connection: u8) -> Option<i8> {
        self.inner.bg_get_rssi(connection).await
    }

    /// Ends the running GAP procedure (scanning or connecting).
    pub async fn bg_end_procedure(&self) -> bool {
        self.inner.bg_end_procedure().await
    }

    /// Sets the GAP discoverable and connectable modes.
    pub async fn bg_set_mode(
        &self,
        discover: GapDiscoverableMode,
        connect: GapConnectableMode,
    ) -> bool {
        self.inner.bg_set_mode(discover, connect).await
    }

    /// Configures and starts scanning.
    pub async fn bg_start_scanning(&self, active: bool, interval: u16, window: u16) -> bool {
        self.inner.bg_start_scanning(active, interval, window).await
    }
}

impl std::fmt::Debug for BlueGigaAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlueGigaAdapter")
            .field("port", &self.inner.config.port)
            .field("status", &*self.inner.status.read())
            .field("devices", &self.inner.devices.read().len())
            .field("connections", &self.inner.connections.read().len())
            .finish_non_exhaustive()
    }
}

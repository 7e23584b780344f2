// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device connection and GATT procedure state machine.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::adapter::{AdapterInner, DiscoveredDevice};
use crate::protocol::Event;
use crate::scheduler::{ScheduledTask, Scheduler};
use crate::subscription::{ListenerId, ListenerRegistry};
use crate::types::{AddressType, AdvertisementData, BgApiResult, BluetoothAddress};

use super::gatt::{GattCharacteristic, GattService, GattTable};
use super::listener::DeviceListener;
use super::state::{CompletionStatus, ConnectionState, Procedure, WriteType};

/// Notification collected under the state lock and delivered after it is
/// released.
enum Notification {
    StateChanged(ConnectionState),
    ServicesDiscovered(Vec<GattService>),
    Read(GattCharacteristic, CompletionStatus),
    Write(GattCharacteristic, CompletionStatus),
    Updated(GattCharacteristic),
}

struct DeviceState {
    connection_state: ConnectionState,
    procedure: Procedure,
    /// Incremented whenever a procedure is reserved; stale timers compare
    /// against it.
    procedure_seq: u64,
    connect_seq: u64,
    connection: Option<u8>,
    procedure_handle: Option<u16>,
    pending_write: Option<Vec<u8>>,
    address_type: AddressType,
    name: Option<String>,
    rssi: Option<i8>,
    tx_power: Option<i8>,
    manufacturer_id: Option<u16>,
    manufacturer_data: Option<Vec<u8>>,
    gatt: GattTable,
    last_seen: Instant,
    last_seen_wall: DateTime<Utc>,
    connect_timer: Option<ScheduledTask>,
    procedure_timer: Option<ScheduledTask>,
}

impl DeviceState {
    fn set_connection_state(&mut self, state: ConnectionState, notes: &mut Vec<Notification>) {
        if self.connection_state != state {
            self.connection_state = state;
            notes.push(Notification::StateChanged(state));
        }
    }

    fn finish_procedure(&mut self) {
        self.procedure = Procedure::None;
        self.procedure_handle = None;
        self.pending_write = None;
        if let Some(timer) = self.procedure_timer.take() {
            timer.cancel();
        }
    }

    fn cancel_connect_timer(&mut self) {
        if let Some(timer) = self.connect_timer.take() {
            timer.cancel();
        }
    }

    /// Drops the connection and any procedure on it.
    fn reset_connection(&mut self, notes: &mut Vec<Notification>) {
        self.connection = None;
        self.finish_procedure();
        self.cancel_connect_timer();
        self.set_connection_state(ConnectionState::Disconnected, notes);
    }
}

/// A remote Bluetooth device seen through a BlueGiga adapter.
///
/// Devices are created by the adapter, either when an advertisement from an
/// unseen address arrives or through
/// [`BlueGigaAdapter::get_device`](crate::BlueGigaAdapter::get_device). The
/// operations return once the command has been accepted by the adapter;
/// results are delivered to [`DeviceListener`]s.
pub struct BlueGigaDevice {
    address: BluetoothAddress,
    adapter: Weak<AdapterInner>,
    me: Weak<BlueGigaDevice>,
    scheduler: Scheduler,
    connect_timeout: Duration,
    procedure_timeout: Duration,
    state: Mutex<DeviceState>,
    listeners: ListenerRegistry<dyn DeviceListener>,
}

impl BlueGigaDevice {
    pub(crate) fn new(
        address: BluetoothAddress,
        adapter: Weak<AdapterInner>,
        scheduler: Scheduler,
        connect_timeout: Duration,
        procedure_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            address,
            adapter,
            me: me.clone(),
            scheduler,
            connect_timeout,
            procedure_timeout,
            state: Mutex::new(DeviceState {
                connection_state: ConnectionState::Discovering,
                procedure: Procedure::None,
                procedure_seq: 0,
                connect_seq: 0,
                connection: None,
                procedure_handle: None,
                pending_write: None,
                address_type: AddressType::Unknown,
                name: None,
                rssi: None,
                tx_power: None,
                manufacturer_id: None,
                manufacturer_data: None,
                gatt: GattTable::default(),
                last_seen: Instant::now(),
                last_seen_wall: Utc::now(),
                connect_timer: None,
                procedure_timer: None,
            }),
            listeners: ListenerRegistry::new(),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the device address.
    #[must_use]
    pub fn address(&self) -> BluetoothAddress {
        self.address
    }

    /// Returns the address type reported by the last advertisement.
    #[must_use]
    pub fn address_type(&self) -> AddressType {
        self.state.lock().address_type
    }

    /// Returns the connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.lock().connection_state
    }

    /// Returns the procedure in progress.
    #[must_use]
    pub fn procedure(&self) -> Procedure {
        self.state.lock().procedure
    }

    /// Returns the connection handle while connected.
    #[must_use]
    pub fn connection_handle(&self) -> Option<u8> {
        self.state.lock().connection
    }

    /// Returns the advertised name.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.state.lock().name.clone()
    }

    /// Returns the last received signal strength.
    #[must_use]
    pub fn rssi(&self) -> Option<i8> {
        self.state.lock().rssi
    }

    /// Returns the advertised transmit power.
    #[must_use]
    pub fn tx_power(&self) -> Option<i8> {
        self.state.lock().tx_power
    }

    /// Returns the advertised manufacturer company identifier.
    #[must_use]
    pub fn manufacturer_id(&self) -> Option<u16> {
        self.state.lock().manufacturer_id
    }

    /// Returns the advertised manufacturer specific data.
    #[must_use]
    pub fn manufacturer_data(&self) -> Option<Vec<u8>> {
        self.state.lock().manufacturer_data.clone()
    }

    /// Returns the discovered services.
    #[must_use]
    pub fn services(&self) -> Vec<GattService> {
        self.state.lock().gatt.services().to_vec()
    }

    /// Returns a discovered characteristic by value handle.
    #[must_use]
    pub fn characteristic(&self, handle: u16) -> Option<GattCharacteristic> {
        self.state.lock().gatt.characteristic(handle).cloned()
    }

    /// Returns the wall clock time of the last advertisement.
    #[must_use]
    pub fn last_seen(&self) -> DateTime<Utc> {
        self.state.lock().last_seen_wall
    }

    /// Returns true if no advertisement arrived within `grace`.
    #[must_use]
    pub fn is_inactive(&self, grace: Duration) -> bool {
        self.state.lock().last_seen.elapsed() > grace
    }

    /// Returns a snapshot for discovery sinks.
    #[must_use]
    pub fn snapshot(&self) -> DiscoveredDevice {
        let state = self.state.lock();
        DiscoveredDevice {
            address: self.address,
            address_type: state.address_type,
            name: state.name.clone(),
            rssi: state.rssi,
            tx_power: state.tx_power,
            manufacturer_id: state.manufacturer_id,
            last_seen: state.last_seen_wall,
        }
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Adds a listener.
    pub fn add_listener(&self, listener: Arc<dyn DeviceListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Removes a listener.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Returns true if at least one listener is registered.
    #[must_use]
    pub fn has_listeners(&self) -> bool {
        !self.listeners.is_empty()
    }

    fn notify(&self, notes: Vec<Notification>) {
        for note in notes {
            match note {
                Notification::StateChanged(state) => {
                    tracing::debug!(address = %self.address, %state, "Connection state changed");
                    self.listeners
                        .for_each(|l| l.on_connection_state_changed(self.address, state));
                }
                Notification::ServicesDiscovered(services) => {
                    tracing::debug!(address = %self.address, services = services.len(), "Services discovered");
                    self.listeners
                        .for_each(|l| l.on_services_discovered(self.address, &services));
                }
                Notification::Read(characteristic, status) => {
                    self.listeners
                        .for_each(|l| l.on_characteristic_read(&characteristic, status));
                }
                Notification::Write(characteristic, status) => {
                    self.listeners
                        .for_each(|l| l.on_characteristic_write(&characteristic, status));
                }
                Notification::Updated(characteristic) => {
                    self.listeners
                        .for_each(|l| l.on_characteristic_updated(&characteristic));
                }
            }
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Connects to the device.
    ///
    /// Returns false if the device is already connected or connecting, or
    /// the adapter refused the request. The connection completes when the
    /// adapter reports it; if it does not within the connect timeout the
    /// device falls back to [`ConnectionState::Disconnected`].
    pub async fn connect(&self) -> bool {
        let Some(adapter) = self.adapter.upgrade() else {
            return false;
        };

        let (previous, seq, address_type, notes) = {
            let mut state = self.state.lock();
            if state.connection.is_some()
                || state.connection_state == ConnectionState::Connecting
            {
                return false;
            }
            state.cancel_connect_timer();
            state.connect_seq += 1;
            let previous = state.connection_state;
            let mut notes = Vec::new();
            state.set_connection_state(ConnectionState::Connecting, &mut notes);
            (previous, state.connect_seq, state.address_type, notes)
        };
        self.notify(notes);

        if !adapter.bg_connect(self.address, address_type).await {
            let notes = {
                let mut state = self.state.lock();
                let mut notes = Vec::new();
                if state.connect_seq == seq && state.connection_state == ConnectionState::Connecting {
                    state.set_connection_state(previous, &mut notes);
                }
                notes
            };
            self.notify(notes);
            return false;
        }

        let timer = self.schedule_connect_timeout(seq);
        let mut state = self.state.lock();
        if state.connect_seq == seq && state.connection_state == ConnectionState::Connecting {
            state.connect_timer = Some(timer);
        } else {
            timer.cancel();
        }
        true
    }

    fn schedule_connect_timeout(&self, seq: u64) -> ScheduledTask {
        let me = self.me.clone();
        self.scheduler.schedule(self.connect_timeout, move || async move {
            if let Some(device) = me.upgrade() {
                device.on_connect_timeout(seq).await;
            }
        })
    }

    async fn on_connect_timeout(&self, seq: u64) {
        let notes = {
            let mut state = self.state.lock();
            if state.connect_seq != seq || state.connection_state != ConnectionState::Connecting {
                return;
            }
            tracing::warn!(address = %self.address, "Connect timed out");
            state.connect_timer = None;
            let mut notes = Vec::new();
            state.reset_connection(&mut notes);
            notes
        };
        self.notify(notes);

        if let Some(adapter) = self.adapter.upgrade() {
            adapter.bg_end_procedure().await;
        }
    }

    /// Disconnects from the device.
    ///
    /// Returns false if the device is not connected or the adapter refused
    /// the request. The state changes when the adapter reports the
    /// disconnection.
    pub async fn disconnect(&self) -> bool {
        let Some(connection) = self.connection_handle() else {
            return false;
        };
        let Some(adapter) = self.adapter.upgrade() else {
            return false;
        };
        adapter.bg_disconnect(connection).await
    }

    /// Starts service and characteristic discovery.
    ///
    /// Returns false if the device is not connected, another procedure is in
    /// progress or the adapter refused the request.
    pub async fn discover_services(&self) -> bool {
        let Some((adapter, connection, seq)) =
            self.reserve_procedure(Procedure::GetServices, None, None)
        else {
            return false;
        };
        if adapter.bg_find_primary_services(connection).await {
            return true;
        }
        self.release_procedure(seq);
        false
    }

    /// Reads a characteristic value.
    ///
    /// Returns false for handle 0, if the device is not connected, another
    /// procedure is in progress or the adapter refused the request.
    pub async fn read_characteristic(&self, handle: u16) -> bool {
        if handle == 0 {
            return false;
        }
        let Some((adapter, connection, seq)) =
            self.reserve_procedure(Procedure::CharacteristicRead, Some(handle), None)
        else {
            return false;
        };
        if adapter.bg_read_characteristic(connection, handle).await {
            return true;
        }
        self.release_procedure(seq);
        false
    }

    /// Writes a characteristic value.
    ///
    /// [`WriteType::WithResponse`] occupies the procedure slot until the
    /// adapter confirms the write. [`WriteType::WithoutResponse`] does not;
    /// its completion is reported as soon as the command is answered.
    pub async fn write_characteristic(
        &self,
        handle: u16,
        data: &[u8],
        write_type: WriteType,
    ) -> bool {
        if handle == 0 {
            return false;
        }
        match write_type {
            WriteType::WithResponse => {
                let Some((adapter, connection, seq)) = self.reserve_procedure(
                    Procedure::CharacteristicWrite,
                    Some(handle),
                    Some(data.to_vec()),
                ) else {
                    return false;
                };
                if adapter.bg_write_characteristic(connection, handle, data).await {
                    return true;
                }
                self.release_procedure(seq);
                false
            }
            WriteType::WithoutResponse => self.write_without_response(handle, data).await,
        }
    }

    async fn write_without_response(&self, handle: u16, data: &[u8]) -> bool {
        let Some(connection) = self.connection_handle() else {
            return false;
        };
        let Some(adapter) = self.adapter.upgrade() else {
            return false;
        };

        let ok = adapter.bg_write_without_response(connection, handle, data).await;
        let characteristic = {
            let mut state = self.state.lock();
            if ok {
                state.gatt.update_value(handle, data)
            } else {
                state.gatt.characteristic_or_placeholder(handle)
            }
        };
        let status = if ok {
            CompletionStatus::Success
        } else {
            CompletionStatus::Error
        };
        self.notify(vec![Notification::Write(characteristic, status)]);
        ok
    }

    /// Reads the signal strength of the connection and stores it.
    pub async fn read_rssi(&self) -> Option<i8> {
        let connection = self.connection_handle()?;
        let adapter = self.adapter.upgrade()?;
        let rssi = adapter.bg_get_rssi(connection).await?;
        self.state.lock().rssi = Some(rssi);
        Some(rssi)
    }

    /// Claims the procedure slot and arms the procedure timeout.
    fn reserve_procedure(
        &self,
        procedure: Procedure,
        handle: Option<u16>,
        pending_write: Option<Vec<u8>>,
    ) -> Option<(Arc<AdapterInner>, u8, u64)> {
        let adapter = self.adapter.upgrade()?;
        let mut state = self.state.lock();
        let connection = state.connection?;
        if !state.procedure.is_idle() {
            tracing::debug!(
                address = %self.address,
                current = %state.procedure,
                requested = %procedure,
                "Procedure already in progress"
            );
            return None;
        }

        state.procedure = procedure;
        state.procedure_seq += 1;
        state.procedure_handle = handle;
        state.pending_write = pending_write;
        if procedure == Procedure::GetServices {
            state.gatt.clear();
        }
        let seq = state.procedure_seq;
        state.procedure_timer = Some(self.schedule_procedure_timeout(seq));
        Some((adapter, connection, seq))
    }

    /// Releases the procedure slot after a refused command.
    fn release_procedure(&self, seq: u64) {
        let mut state = self.state.lock();
        if state.procedure_seq == seq && !state.procedure.is_idle() {
            state.finish_procedure();
        }
    }

    fn schedule_procedure_timeout(&self, seq: u64) -> ScheduledTask {
        let me = self.me.clone();
        self.scheduler.schedule(self.procedure_timeout, move || async move {
            if let Some(device) = me.upgrade() {
                device.on_procedure_timeout(seq);
            }
        })
    }

    fn on_procedure_timeout(&self, seq: u64) {
        let mut state = self.state.lock();
        if state.procedure_seq != seq || state.procedure.is_idle() {
            return;
        }
        tracing::warn!(
            address = %self.address,
            procedure = %state.procedure,
            "Procedure timed out"
        );
        state.procedure_timer = None;
        state.finish_procedure();
    }

    // =========================================================================
    // Event handling
    // =========================================================================

    /// Applies an event routed to this device by the adapter.
    pub(crate) fn handle_event(&self, event: &Event) {
        match event {
            Event::GapScanResponse {
                rssi,
                sender,
                address_type,
                data,
                ..
            } if *sender == self.address => {
                self.on_scan_response(*rssi, AddressType::from_wire(*address_type), data);
            }
            Event::ConnectionStatus {
                connection,
                flags,
                address,
                ..
            } if *address == self.address => {
                if flags.connected() {
                    self.on_connected(*connection);
                }
            }
            Event::ConnectionDisconnected { connection, reason } => {
                self.on_disconnected(*connection, *reason);
            }
            Event::AttClientGroupFound {
                connection,
                start,
                end,
                uuid,
            } => {
                let mut state = self.state.lock();
                if state.connection == Some(*connection)
                    && state.procedure == Procedure::GetServices
                {
                    tracing::trace!(address = %self.address, %uuid, start, end, "Service found");
                    state.gatt.add_service(*uuid, *start, *end);
                }
            }
            Event::AttClientFindInformationFound {
                connection,
                handle,
                uuid,
            } => {
                let mut state = self.state.lock();
                if state.connection == Some(*connection)
                    && state.procedure == Procedure::GetCharacteristics
                {
                    state.gatt.add_attribute(*handle, *uuid);
                }
            }
            Event::AttClientProcedureCompleted {
                connection,
                result,
                handle,
            } => self.on_procedure_completed(*connection, result.is_success(), *handle),
            Event::AttClientAttributeValue {
                connection,
                handle,
                value,
                ..
            } => self.on_attribute_value(*connection, *handle, value),
            Event::AttClientIndicated { handle, .. } => {
                tracing::trace!(address = %self.address, handle, "Indication confirmed");
            }
            _ => {}
        }
    }

    fn on_scan_response(&self, rssi: i8, address_type: AddressType, data: &[u8]) {
        let advertisement = AdvertisementData::parse(data);
        let first_sighting = {
            let mut state = self.state.lock();
            state.last_seen = Instant::now();
            state.last_seen_wall = Utc::now();
            state.address_type = address_type;
            if rssi != 0 {
                state.rssi = Some(rssi);
            }
            if advertisement.name.is_some() {
                state.name = advertisement.name;
            }
            if advertisement.tx_power.is_some() {
                state.tx_power = advertisement.tx_power;
            }
            if advertisement.manufacturer_id.is_some() {
                state.manufacturer_id = advertisement.manufacturer_id;
                state.manufacturer_data = advertisement.manufacturer_data;
            }

            if state.connection_state == ConnectionState::Discovering {
                state.connection_state = ConnectionState::Discovered;
                true
            } else {
                false
            }
        };

        if first_sighting {
            self.notify(vec![Notification::StateChanged(ConnectionState::Discovered)]);
            if let Some(adapter) = self.adapter.upgrade() {
                adapter.report_discovered(&self.snapshot());
            }
        }
    }

    fn on_connected(&self, connection: u8) {
        let notes = {
            let mut state = self.state.lock();
            state.connection = Some(connection);
            state.cancel_connect_timer();
            let mut notes = Vec::new();
            state.set_connection_state(ConnectionState::Connected, &mut notes);
            notes
        };
        if !notes.is_empty() {
            tracing::debug!(address = %self.address, connection, "Connected");
        }
        self.notify(notes);
    }

    fn on_disconnected(&self, connection: u8, reason: BgApiResult) {
        let notes = {
            let mut state = self.state.lock();
            if state.connection != Some(connection) {
                return;
            }
            tracing::debug!(address = %self.address, connection, %reason, "Disconnected");
            let mut notes = Vec::new();
            state.reset_connection(&mut notes);
            notes
        };
        self.notify(notes);
    }

    fn on_procedure_completed(&self, connection: u8, success: bool, handle: u16) {
        let mut next_step = None;
        let notes = {
            let mut state = self.state.lock();
            if state.connection != Some(connection) {
                return;
            }
            let mut notes = Vec::new();
            match state.procedure {
                Procedure::None => {
                    tracing::debug!(address = %self.address, handle, "Completion without procedure");
                }
                Procedure::GetServices => {
                    state.procedure = Procedure::GetCharacteristics;
                    state.procedure_seq += 1;
                    if let Some(timer) = state.procedure_timer.take() {
                        timer.cancel();
                    }
                    let seq = state.procedure_seq;
                    state.procedure_timer = Some(self.schedule_procedure_timeout(seq));
                    next_step = Some(seq);
                }
                Procedure::GetCharacteristics => {
                    state.finish_procedure();
                    notes.push(Notification::ServicesDiscovered(state.gatt.services().to_vec()));
                }
                Procedure::CharacteristicRead => {
                    let handle = state.procedure_handle.unwrap_or(handle);
                    state.finish_procedure();
                    notes.push(Notification::Read(
                        state.gatt.characteristic_or_placeholder(handle),
                        CompletionStatus::Error,
                    ));
                }
                Procedure::CharacteristicWrite => {
                    let handle = state.procedure_handle.unwrap_or(handle);
                    let written = state.pending_write.take();
                    state.finish_procedure();
                    let (characteristic, status) = match written {
                        Some(data) if success => {
                            (state.gatt.update_value(handle, &data), CompletionStatus::Success)
                        }
                        _ => (
                            state.gatt.characteristic_or_placeholder(handle),
                            CompletionStatus::Error,
                        ),
                    };
                    notes.push(Notification::Write(characteristic, status));
                }
            }
            notes
        };
        self.notify(notes);

        if let Some(seq) = next_step {
            self.find_characteristics(connection, seq);
        }
    }

    /// Issues the characteristic enumeration from a scheduler task, since
    /// events are handled on the serial reader.
    fn find_characteristics(&self, connection: u8, seq: u64) {
        let me = self.me.clone();
        let adapter = self.adapter.clone();
        self.scheduler.spawn(async move {
            let (Some(device), Some(adapter)) = (me.upgrade(), adapter.upgrade()) else {
                return;
            };
            if !adapter.bg_find_characteristics(connection).await {
                device.release_procedure(seq);
            }
        });
    }

    fn on_attribute_value(&self, connection: u8, handle: u16, value: &[u8]) {
        let notes = {
            let mut state = self.state.lock();
            if state.connection != Some(connection) {
                return;
            }
            let characteristic = state.gatt.update_value(handle, value);
            let mut notes = Vec::new();
            if state.procedure == Procedure::CharacteristicRead
                && state.procedure_handle == Some(handle)
            {
                state.finish_procedure();
                notes.push(Notification::Read(
                    characteristic.clone(),
                    CompletionStatus::Success,
                ));
            }
            notes.push(Notification::Updated(characteristic));
            notes
        };
        self.notify(notes);
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// The serial link was lost; every connection is gone.
    pub(crate) fn link_lost(&self) {
        let notes = {
            let mut state = self.state.lock();
            let mut notes = Vec::new();
            if state.connection.is_some()
                || matches!(
                    state.connection_state,
                    ConnectionState::Connecting | ConnectionState::Connected
                )
            {
                state.reset_connection(&mut notes);
            } else {
                state.finish_procedure();
                state.cancel_connect_timer();
            }
            notes
        };
        self.notify(notes);
    }

    /// Cancels timers, resets state and disconnects if connected.
    pub(crate) async fn dispose(&self) {
        let connection = {
            let mut state = self.state.lock();
            let connection = state.connection;
            if connection.is_some() {
                state.reset_connection(&mut Vec::new());
            } else {
                state.finish_procedure();
                state.cancel_connect_timer();
            }
            connection
        };
        self.listeners.clear();

        if let (Some(connection), Some(adapter)) = (connection, self.adapter.upgrade()) {
            adapter.bg_disconnect(connection).await;
        }
        tracing::debug!(address = %self.address, "Device disposed");
    }
}

impl std::fmt::Debug for BlueGigaDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BlueGigaDevice")
            .field("address", &self.address)
            .field("connection_state", &state.connection_state)
            .field("procedure", &state.procedure)
            .field("connection", &state.connection)
            .finish_non_exhaustive()
    }
}

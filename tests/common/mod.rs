// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A scripted BGAPI adapter on an in-memory stream.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use bluegiga_lib::adapter::{AdapterConfig, AdapterInfo};
use bluegiga_lib::device::{
    CompletionStatus, ConnectionState, DeviceListener, GattCharacteristic, GattService,
};
use bluegiga_lib::protocol::{
    ConnectionStatusFlags, Event, MessageId, Response, SerialPortOpener, SerialStream,
};
use bluegiga_lib::{BgApiResult, BlueGigaAdapter, BluetoothAddress, Scheduler, TransportError};

pub const PORT: &str = "/dev/fake0";

pub const LOCAL_ADDRESS: BluetoothAddress =
    BluetoothAddress::new([0x00, 0x07, 0x80, 0xAA, 0xBB, 0xCC]);

pub const SYSTEM_RESET: MessageId = MessageId::new(0, 0x00);
pub const SYSTEM_ADDRESS_GET: MessageId = MessageId::new(0, 0x02);
pub const SYSTEM_GET_CONNECTIONS: MessageId = MessageId::new(0, 0x06);
pub const SYSTEM_GET_INFO: MessageId = MessageId::new(0, 0x08);
pub const CONNECTION_DISCONNECT: MessageId = MessageId::new(3, 0x00);
pub const CONNECTION_GET_RSSI: MessageId = MessageId::new(3, 0x01);
pub const READ_BY_GROUP_TYPE: MessageId = MessageId::new(4, 0x01);
pub const FIND_INFORMATION: MessageId = MessageId::new(4, 0x03);
pub const READ_BY_HANDLE: MessageId = MessageId::new(4, 0x04);
pub const ATTRIBUTE_WRITE: MessageId = MessageId::new(4, 0x05);
pub const WRITE_COMMAND: MessageId = MessageId::new(4, 0x06);
pub const GAP_SET_MODE: MessageId = MessageId::new(6, 0x01);
pub const GAP_DISCOVER: MessageId = MessageId::new(6, 0x02);
pub const GAP_CONNECT_DIRECT: MessageId = MessageId::new(6, 0x03);
pub const GAP_END_PROCEDURE: MessageId = MessageId::new(6, 0x04);
pub const GAP_SET_SCAN_PARAMETERS: MessageId = MessageId::new(6, 0x07);

struct Session {
    outgoing: mpsc::UnboundedSender<Vec<u8>>,
    tasks: Vec<JoinHandle<()>>,
}

struct DongleState {
    max_connections: u8,
    next_connection: AtomicU8,
    unplugged: AtomicBool,
    opens: AtomicUsize,
    received: Mutex<Vec<(MessageId, Vec<u8>)>>,
    results: Mutex<HashMap<MessageId, BgApiResult>>,
    silent: Mutex<HashSet<MessageId>>,
    hang_up_after: Mutex<Option<MessageId>>,
    session: Mutex<Option<Session>>,
}

impl DongleState {
    fn respond(&self, id: MessageId, payload: &[u8]) -> Option<Response> {
        if self.silent.lock().contains(&id) {
            return None;
        }
        let result = self
            .results
            .lock()
            .get(&id)
            .copied()
            .unwrap_or(BgApiResult::Success);
        let connection = payload.first().copied().unwrap_or(0);

        let response = match (id.class, id.id) {
            (0, 0x01) => Response::SystemHello,
            (0, 0x02) => Response::SystemAddressGet {
                address: LOCAL_ADDRESS,
            },
            (0, 0x06) => Response::SystemGetConnections {
                max_connections: self.max_connections,
            },
            (0, 0x08) => Response::SystemGetInfo(AdapterInfo {
                major: 1,
                minor: 3,
                patch: 2,
                build: 122,
                ll_version: 4,
                protocol_version: 1,
                hardware: 1,
            }),
            (3, 0x00) => Response::ConnectionDisconnect { connection, result },
            (3, 0x01) => Response::ConnectionGetRssi {
                connection,
                rssi: -58,
            },
            (4, 0x01) => Response::AttClientReadByGroupType { connection, result },
            (4, 0x03) => Response::AttClientFindInformation { connection, result },
            (4, 0x04) => Response::AttClientReadByHandle { connection, result },
            (4, 0x05) => Response::AttClientAttributeWrite { connection, result },
            (4, 0x06) => Response::AttClientWriteCommand { connection, result },
            (6, 0x01) => Response::GapSetMode { result },
            (6, 0x02) => Response::GapDiscover { result },
            (6, 0x03) => Response::GapConnectDirect {
                result,
                connection: self.next_connection.fetch_add(1, Ordering::SeqCst),
            },
            (6, 0x04) => Response::GapEndProcedure { result },
            (6, 0x07) => Response::GapSetScanParameters { result },
            _ => return None,
        };
        Some(response)
    }

    async fn serve(&self, mut reader: ReadHalf<DuplexStream>, responses: mpsc::UnboundedSender<Vec<u8>>) {
        let mut header = [0u8; 4];
        loop {
            if reader.read_exact(&mut header).await.is_err() {
                return;
            }
            let length = (usize::from(header[0] & 0x07) << 8) | usize::from(header[1]);
            let mut payload = vec![0; length];
            if reader.read_exact(&mut payload).await.is_err() {
                return;
            }

            let id = MessageId::new(header[2], header[3]);
            self.received.lock().push((id, payload.clone()));
            if let Some(response) = self.respond(id, &payload) {
                let _ = responses.send(response.encode());
            }
            if *self.hang_up_after.lock() == Some(id) {
                // The writer drains the reply, then the stream drops
                self.session.lock().take();
                return;
            }
        }
    }
}

/// A fake dongle answering commands the way a BLED112 does.
#[derive(Clone)]
pub struct FakeDongle {
    state: Arc<DongleState>,
}

impl FakeDongle {
    pub fn new(max_connections: u8) -> Self {
        Self {
            state: Arc::new(DongleState {
                max_connections,
                next_connection: AtomicU8::new(0),
                unplugged: AtomicBool::new(false),
                opens: AtomicUsize::new(0),
                received: Mutex::new(Vec::new()),
                results: Mutex::new(HashMap::new()),
                silent: Mutex::new(HashSet::new()),
                hang_up_after: Mutex::new(None),
                session: Mutex::new(None),
            }),
        }
    }

    pub fn opener(&self) -> Arc<dyn SerialPortOpener> {
        Arc::new(FakeOpener {
            state: Arc::clone(&self.state),
        })
    }

    /// Answers `id` with `result` from now on.
    pub fn set_result(&self, id: MessageId, result: BgApiResult) {
        self.state.results.lock().insert(id, result);
    }

    /// Never answers `id`.
    pub fn set_silent(&self, id: MessageId) {
        self.state.silent.lock().insert(id);
    }

    /// Drops the link right after answering `id`.
    pub fn set_hang_up_after(&self, id: MessageId) {
        *self.state.hang_up_after.lock() = Some(id);
    }

    pub fn received(&self) -> Vec<MessageId> {
        self.state.received.lock().iter().map(|(id, _)| *id).collect()
    }

    pub fn payloads(&self, id: MessageId) -> Vec<Vec<u8>> {
        self.state
            .received
            .lock()
            .iter()
            .filter(|(received, _)| *received == id)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn count(&self, id: MessageId) -> usize {
        self.state
            .received
            .lock()
            .iter()
            .filter(|(received, _)| *received == id)
            .count()
    }

    pub fn clear_received(&self) {
        self.state.received.lock().clear();
    }

    pub fn opens(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    /// Emits an unsolicited event.
    pub fn send_event(&self, event: &Event) {
        if let Some(session) = self.state.session.lock().as_ref() {
            let _ = session.outgoing.send(event.encode());
        }
    }

    /// Drops the link; later opens fail until [`plug`](Self::plug).
    pub fn unplug(&self) {
        self.state.unplugged.store(true, Ordering::SeqCst);
        if let Some(session) = self.state.session.lock().take() {
            for task in session.tasks {
                task.abort();
            }
        }
    }

    pub fn plug(&self) {
        self.state.unplugged.store(false, Ordering::SeqCst);
    }
}

struct FakeOpener {
    state: Arc<DongleState>,
}

impl SerialPortOpener for FakeOpener {
    fn open(&self, port: &str, _baud_rate: u32) -> Result<Box<dyn SerialStream>, TransportError> {
        if self.state.unplugged.load(Ordering::SeqCst) {
            return Err(TransportError::Open {
                port: port.to_string(),
                message: "no such device".to_string(),
            });
        }

        let (local, remote) = tokio::io::duplex(4096);
        let (reader, mut writer) = tokio::io::split(remote);
        let (outgoing, mut pending) = mpsc::unbounded_channel::<Vec<u8>>();

        let writer_task = tokio::spawn(async move {
            while let Some(bytes) = pending.recv().await {
                if writer.write_all(&bytes).await.is_err() {
                    break;
                }
            }
        });
        let state = Arc::clone(&self.state);
        let responses = outgoing.clone();
        let reader_task = tokio::spawn(async move {
            state.serve(reader, responses).await;
        });

        *self.state.session.lock() = Some(Session {
            outgoing,
            tasks: vec![reader_task, writer_task],
        });
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(local))
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn config() -> AdapterConfig {
    AdapterConfig::new(PORT)
}

pub async fn online_adapter(dongle: &FakeDongle, config: AdapterConfig) -> BlueGigaAdapter {
    let adapter = BlueGigaAdapter::new(config, dongle.opener(), Scheduler::current());
    adapter.start().await.unwrap();
    adapter
}

pub fn address(last: u8) -> BluetoothAddress {
    BluetoothAddress::new([0x00, 0x07, 0x80, 0x12, 0x34, last])
}

/// An advertisement carrying a complete local name.
pub fn scan_response(sender: BluetoothAddress, rssi: i8, name: &str) -> Event {
    let mut data = vec![u8::try_from(name.len() + 1).unwrap(), 0x09];
    data.extend_from_slice(name.as_bytes());
    Event::GapScanResponse {
        rssi,
        packet_type: 0,
        sender,
        address_type: 0,
        bond: 0xFF,
        data,
    }
}

pub fn connected(connection: u8, address: BluetoothAddress) -> Event {
    Event::ConnectionStatus {
        connection,
        flags: ConnectionStatusFlags(ConnectionStatusFlags::CONNECTED | ConnectionStatusFlags::COMPLETED),
        address,
        address_type: 0,
        conn_interval: 0x3C,
        timeout: 0x64,
        latency: 0,
        bonding: 0xFF,
    }
}

pub fn disconnected(connection: u8) -> Event {
    Event::ConnectionDisconnected {
        connection,
        reason: BgApiResult::RemoteUserTerminated,
    }
}

pub fn procedure_completed(connection: u8, handle: u16) -> Event {
    Event::AttClientProcedureCompleted {
        connection,
        result: BgApiResult::Success,
        handle,
    }
}

/// Polls `condition` until it holds, failing after a few seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// ============================================================================
// Recording listener
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    State(ConnectionState),
    Services(Vec<GattService>),
    Read(u16, CompletionStatus, Vec<u8>),
    Write(u16, CompletionStatus),
    Updated(u16, Vec<u8>),
}

#[derive(Default)]
pub struct RecordingListener {
    records: Mutex<Vec<Recorded>>,
}

impl RecordingListener {
    pub fn records(&self) -> Vec<Recorded> {
        self.records.lock().clone()
    }

    pub fn states(&self) -> Vec<ConnectionState> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                Recorded::State(state) => Some(*state),
                _ => None,
            })
            .collect()
    }

    pub fn contains(&self, record: &Recorded) -> bool {
        self.records.lock().contains(record)
    }
}

impl DeviceListener for RecordingListener {
    fn on_connection_state_changed(&self, _address: BluetoothAddress, state: ConnectionState) {
        self.records.lock().push(Recorded::State(state));
    }

    fn on_services_discovered(&self, _address: BluetoothAddress, services: &[GattService]) {
        self.records
            .lock()
            .push(Recorded::Services(services.to_vec()));
    }

    fn on_characteristic_read(&self, characteristic: &GattCharacteristic, status: CompletionStatus) {
        self.records.lock().push(Recorded::Read(
            characteristic.handle,
            status,
            characteristic.value.clone(),
        ));
    }

    fn on_characteristic_write(&self, characteristic: &GattCharacteristic, status: CompletionStatus) {
        self.records
            .lock()
            .push(Recorded::Write(characteristic.handle, status));
    }

    fn on_characteristic_updated(&self, characteristic: &GattCharacteristic) {
        self.records.lock().push(Recorded::Updated(
            characteristic.handle,
            characteristic.value.clone(),
        ));
    }
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the device state machine against a scripted dongle.

mod common;

use std::sync::Arc;
use std::time::Duration;

use bluegiga_lib::device::{BlueGigaDevice, CompletionStatus, ConnectionState, Procedure, WriteType};
use bluegiga_lib::protocol::Event;
use bluegiga_lib::types::uuid_from_u16;
use bluegiga_lib::{AdapterConfig, BgApiResult, BlueGigaAdapter};

use common::*;

const BATTERY_LEVEL: u16 = 0x0012;

struct Harness {
    dongle: FakeDongle,
    adapter: BlueGigaAdapter,
    device: Arc<BlueGigaDevice>,
    listener: Arc<RecordingListener>,
}

async fn harness(config: AdapterConfig) -> Harness {
    let dongle = FakeDongle::new(2);
    let adapter = online_adapter(&dongle, config).await;
    dongle.send_event(&scan_response(address(1), -60, "Tag"));
    wait_until(|| adapter.device(&address(1)).is_some()).await;

    let device = adapter.device(&address(1)).unwrap();
    let listener = Arc::new(RecordingListener::default());
    device.add_listener(listener.clone());
    Harness {
        dongle,
        adapter,
        device,
        listener,
    }
}

async fn connected_harness(config: AdapterConfig) -> Harness {
    let h = harness(config).await;
    assert!(h.device.connect().await);
    h.dongle.send_event(&connected(0, address(1)));
    wait_until(|| h.device.connection_state() == ConnectionState::Connected).await;
    h
}

fn attribute_value(handle: u16, value: &[u8]) -> Event {
    Event::AttClientAttributeValue {
        connection: 0,
        handle,
        value_type: 0,
        value: value.to_vec(),
    }
}

// ============================================================================
// Connection
// ============================================================================

mod connection {
    use super::*;

    #[tokio::test]
    async fn connect_reports_connecting_then_connected() {
        let h = connected_harness(common::config()).await;

        assert_eq!(
            h.listener.states(),
            vec![ConnectionState::Connecting, ConnectionState::Connected]
        );
        assert_eq!(h.device.connection_handle(), Some(0));
        assert_eq!(h.dongle.count(GAP_CONNECT_DIRECT), 1);
    }

    #[tokio::test]
    async fn second_connect_is_refused_while_connecting() {
        let h = harness(common::config()).await;

        assert!(h.device.connect().await);
        assert!(!h.device.connect().await);

        assert_eq!(h.dongle.count(GAP_CONNECT_DIRECT), 1);
    }

    #[tokio::test]
    async fn refused_connect_restores_previous_state() {
        let h = harness(common::config()).await;
        h.dongle
            .set_result(GAP_CONNECT_DIRECT, BgApiResult::ConnectionLimitExceeded);

        assert!(!h.device.connect().await);

        assert_eq!(h.device.connection_state(), ConnectionState::Discovered);
        assert_eq!(
            h.listener.states(),
            vec![ConnectionState::Connecting, ConnectionState::Discovered]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn connect_times_out_without_status() {
        let h = harness(common::config().with_connect_timeout(Duration::from_secs(5))).await;
        assert!(h.device.connect().await);
        let end_procedures = h.dongle.count(GAP_END_PROCEDURE);

        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(h.device.connection_state(), ConnectionState::Disconnected);
        assert_eq!(h.dongle.count(GAP_END_PROCEDURE), end_procedures + 1);
    }

    #[tokio::test]
    async fn disconnect_waits_for_the_adapter_event() {
        let h = connected_harness(common::config()).await;

        assert!(h.device.disconnect().await);
        assert_eq!(h.dongle.payloads(CONNECTION_DISCONNECT).last(), Some(&vec![0]));
        assert_eq!(h.device.connection_state(), ConnectionState::Connected);

        h.dongle.send_event(&disconnected(0));
        wait_until(|| h.device.connection_state() == ConnectionState::Disconnected).await;
        assert_eq!(h.adapter.connection_count(), 0);
    }

    #[tokio::test]
    async fn disconnect_without_connection_is_refused() {
        let h = harness(common::config()).await;

        assert!(!h.device.disconnect().await);
    }

    #[tokio::test]
    async fn rssi_is_read_from_the_connection() {
        let h = connected_harness(common::config()).await;

        assert_eq!(h.device.read_rssi().await, Some(-58));
        assert_eq!(h.device.rssi(), Some(-58));
    }
}

// ============================================================================
// Service discovery
// ============================================================================

mod services {
    use super::*;

    #[tokio::test]
    async fn services_and_characteristics_are_discovered() {
        let h = connected_harness(common::config()).await;

        assert!(h.device.discover_services().await);
        assert_eq!(h.device.procedure(), Procedure::GetServices);
        assert_eq!(
            h.dongle.payloads(READ_BY_GROUP_TYPE),
            vec![vec![0x00, 0x01, 0x00, 0xFF, 0xFF, 0x02, 0x00, 0x28]]
        );

        for (start, end, uuid) in [(0x0001, 0x0007, 0x1800), (0x0010, 0x0014, 0x180F)] {
            h.dongle.send_event(&Event::AttClientGroupFound {
                connection: 0,
                start,
                end,
                uuid: uuid_from_u16(uuid),
            });
        }
        h.dongle.send_event(&procedure_completed(0, 0x0014));
        wait_until(|| h.device.procedure() == Procedure::GetCharacteristics).await;
        wait_until(|| h.dongle.count(FIND_INFORMATION) == 1).await;

        for (handle, uuid) in [
            (0x0010, 0x2800),
            (0x0011, 0x2803),
            (BATTERY_LEVEL, 0x2A19),
            (0x0013, 0x2902),
        ] {
            h.dongle.send_event(&Event::AttClientFindInformationFound {
                connection: 0,
                handle,
                uuid: uuid_from_u16(uuid),
            });
        }
        h.dongle.send_event(&procedure_completed(0, 0x0014));
        wait_until(|| h.device.procedure() == Procedure::None).await;

        let services = h.device.services();
        assert_eq!(services.len(), 2);
        assert_eq!(services[1].uuid, uuid_from_u16(0x180F));
        let battery = h.device.characteristic(BATTERY_LEVEL).unwrap();
        assert_eq!(battery.uuid, uuid_from_u16(0x2A19));
        assert_eq!(battery.descriptors.len(), 1);

        assert!(h.listener.contains(&Recorded::Services(services)));
    }

    #[tokio::test]
    async fn discovery_events_outside_a_procedure_are_ignored() {
        let h = connected_harness(common::config()).await;

        h.dongle.send_event(&Event::AttClientGroupFound {
            connection: 0,
            start: 0x0001,
            end: 0x0007,
            uuid: uuid_from_u16(0x1800),
        });
        h.dongle.send_event(&attribute_value(0x0003, b"x"));
        wait_until(|| h.listener.contains(&Recorded::Updated(0x0003, b"x".to_vec()))).await;

        assert!(h.device.services().is_empty());
    }

    #[tokio::test]
    async fn discovery_requires_a_connection() {
        let h = harness(common::config()).await;

        assert!(!h.device.discover_services().await);
        assert_eq!(h.dongle.count(READ_BY_GROUP_TYPE), 0);
    }
}

// ============================================================================
// Reads and writes
// ============================================================================

mod attributes {
    use super::*;

    #[tokio::test]
    async fn read_completes_with_the_attribute_value() {
        let h = connected_harness(common::config()).await;

        assert!(h.device.read_characteristic(BATTERY_LEVEL).await);
        assert_eq!(h.device.procedure(), Procedure::CharacteristicRead);
        assert_eq!(h.dongle.payloads(READ_BY_HANDLE), vec![vec![0x00, 0x12, 0x00]]);

        h.dongle.send_event(&attribute_value(BATTERY_LEVEL, &[0x64]));
        wait_until(|| h.device.procedure() == Procedure::None).await;

        assert!(h.listener.contains(&Recorded::Read(
            BATTERY_LEVEL,
            CompletionStatus::Success,
            vec![0x64]
        )));
        assert!(h.listener.contains(&Recorded::Updated(BATTERY_LEVEL, vec![0x64])));
    }

    #[tokio::test]
    async fn read_of_handle_zero_is_refused() {
        let h = connected_harness(common::config()).await;

        assert!(!h.device.read_characteristic(0).await);

        assert_eq!(h.dongle.count(READ_BY_HANDLE), 0);
        assert_eq!(h.device.procedure(), Procedure::None);
    }

    #[tokio::test]
    async fn failed_read_reports_an_error() {
        let h = connected_harness(common::config()).await;
        assert!(h.device.read_characteristic(BATTERY_LEVEL).await);

        h.dongle.send_event(&Event::AttClientProcedureCompleted {
            connection: 0,
            result: BgApiResult::ReadNotPermitted,
            handle: BATTERY_LEVEL,
        });
        wait_until(|| h.device.procedure() == Procedure::None).await;

        assert!(h.listener.contains(&Recorded::Read(
            BATTERY_LEVEL,
            CompletionStatus::Error,
            Vec::new()
        )));
    }

    #[tokio::test]
    async fn refused_read_releases_the_procedure() {
        let h = connected_harness(common::config()).await;
        h.dongle
            .set_result(READ_BY_HANDLE, BgApiResult::InvalidHandle);

        assert!(!h.device.read_characteristic(BATTERY_LEVEL).await);
        assert_eq!(h.device.procedure(), Procedure::None);
    }

    #[tokio::test]
    async fn second_procedure_is_refused_while_one_runs() {
        let h = connected_harness(common::config()).await;
        assert!(h.device.read_characteristic(BATTERY_LEVEL).await);

        assert!(!h.device.read_characteristic(0x0020).await);
        assert!(
            !h.device
                .write_characteristic(0x0020, &[1], WriteType::WithResponse)
                .await
        );
        assert!(!h.device.discover_services().await);

        assert_eq!(h.dongle.count(READ_BY_HANDLE), 1);
        assert_eq!(h.dongle.count(ATTRIBUTE_WRITE), 0);
    }

    #[tokio::test]
    async fn write_with_response_completes_on_procedure_completed() {
        let h = connected_harness(common::config()).await;

        assert!(
            h.device
                .write_characteristic(BATTERY_LEVEL, &[0x01, 0x02], WriteType::WithResponse)
                .await
        );
        assert_eq!(h.device.procedure(), Procedure::CharacteristicWrite);
        assert_eq!(
            h.dongle.payloads(ATTRIBUTE_WRITE),
            vec![vec![0x00, 0x12, 0x00, 0x02, 0x01, 0x02]]
        );

        h.dongle.send_event(&procedure_completed(0, BATTERY_LEVEL));
        wait_until(|| h.device.procedure() == Procedure::None).await;

        assert!(h.listener.contains(&Recorded::Write(BATTERY_LEVEL, CompletionStatus::Success)));
    }

    #[tokio::test]
    async fn write_without_response_completes_immediately() {
        let h = connected_harness(common::config()).await;

        assert!(
            h.device
                .write_characteristic(BATTERY_LEVEL, &[0x07], WriteType::WithoutResponse)
                .await
        );

        assert_eq!(h.device.procedure(), Procedure::None);
        assert_eq!(h.dongle.count(WRITE_COMMAND), 1);
        assert!(h.listener.contains(&Recorded::Write(BATTERY_LEVEL, CompletionStatus::Success)));
    }

    #[tokio::test]
    async fn notifications_update_the_value_without_a_procedure() {
        let h = connected_harness(common::config()).await;

        h.dongle.send_event(&attribute_value(BATTERY_LEVEL, &[0x42]));
        wait_until(|| h.listener.contains(&Recorded::Updated(BATTERY_LEVEL, vec![0x42]))).await;

        assert!(
            !h.listener
                .records()
                .iter()
                .any(|r| matches!(r, Recorded::Read(..)))
        );
    }
}

// ============================================================================
// Interruptions
// ============================================================================

mod interruptions {
    use super::*;

    #[tokio::test]
    async fn disconnect_during_read_abandons_it() {
        let h = connected_harness(common::config()).await;
        assert!(h.device.read_characteristic(BATTERY_LEVEL).await);

        h.dongle.send_event(&disconnected(0));
        wait_until(|| h.device.connection_state() == ConnectionState::Disconnected).await;

        assert_eq!(h.device.procedure(), Procedure::None);
        assert_eq!(h.device.connection_handle(), None);
        assert!(
            !h.listener
                .records()
                .iter()
                .any(|r| matches!(r, Recorded::Read(..)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn procedure_timeout_is_silent() {
        let h = connected_harness(common::config()).await;
        assert!(h.device.read_characteristic(BATTERY_LEVEL).await);

        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(h.device.procedure(), Procedure::None);
        assert_eq!(h.device.connection_state(), ConnectionState::Connected);
        assert!(
            !h.listener
                .records()
                .iter()
                .any(|r| matches!(r, Recorded::Read(..)))
        );

        // The slot is free again
        assert!(h.device.read_characteristic(BATTERY_LEVEL).await);
    }

    #[tokio::test(start_paused = true)]
    async fn late_completion_after_timeout_is_ignored() {
        let h = connected_harness(
            common::config().with_procedure_timeout(Duration::from_secs(2)),
        )
        .await;
        assert!(
            h.device
                .write_characteristic(BATTERY_LEVEL, &[1], WriteType::WithResponse)
                .await
        );
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(h.device.procedure(), Procedure::None);

        h.dongle.send_event(&procedure_completed(0, BATTERY_LEVEL));
        h.dongle.send_event(&attribute_value(0x0030, &[9]));
        wait_until(|| h.listener.contains(&Recorded::Updated(0x0030, vec![9]))).await;

        assert!(
            !h.listener
                .records()
                .iter()
                .any(|r| matches!(r, Recorded::Write(..)))
        );
    }

    #[tokio::test]
    async fn removed_listener_is_not_notified() {
        let h = connected_harness(common::config()).await;
        let quiet = Arc::new(RecordingListener::default());
        let id = h.device.add_listener(quiet.clone());
        assert!(h.device.remove_listener(id));

        h.dongle.send_event(&attribute_value(BATTERY_LEVEL, &[1]));
        wait_until(|| h.listener.contains(&Recorded::Updated(BATTERY_LEVEL, vec![1]))).await;

        assert!(quiet.records().is_empty());
    }
}

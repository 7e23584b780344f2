// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GATT services, characteristics and descriptors discovered on a device.

use uuid::Uuid;

use crate::types::{CHARACTERISTIC, PRIMARY_SERVICE, short_uuid};

/// A primary service and the attributes it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattService {
    /// Service UUID.
    pub uuid: Uuid,
    /// First attribute handle of the service.
    pub start_handle: u16,
    /// Last attribute handle of the service.
    pub end_handle: u16,
    /// Characteristics in handle order.
    pub characteristics: Vec<GattCharacteristic>,
}

impl GattService {
    /// Returns true if `handle` lies within the service.
    #[must_use]
    pub fn contains(&self, handle: u16) -> bool {
        (self.start_handle..=self.end_handle).contains(&handle)
    }

    /// Returns the characteristic with the given handle.
    #[must_use]
    pub fn characteristic(&self, handle: u16) -> Option<&GattCharacteristic> {
        self.characteristics.iter().find(|c| c.handle == handle)
    }
}

/// A characteristic value attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattCharacteristic {
    /// Characteristic UUID; nil when the handle was never discovered.
    pub uuid: Uuid,
    /// Attribute handle of the value.
    pub handle: u16,
    /// Last known value.
    pub value: Vec<u8>,
    /// Descriptors following the value attribute.
    pub descriptors: Vec<GattDescriptor>,
}

impl GattCharacteristic {
    /// Creates a characteristic with an empty value.
    #[must_use]
    pub fn new(uuid: Uuid, handle: u16) -> Self {
        Self {
            uuid,
            handle,
            value: Vec::new(),
            descriptors: Vec::new(),
        }
    }
}

/// A characteristic descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GattDescriptor {
    /// Descriptor UUID.
    pub uuid: Uuid,
    /// Attribute handle.
    pub handle: u16,
}

/// Service table built from discovery events.
#[derive(Debug, Clone, Default)]
pub(crate) struct GattTable {
    services: Vec<GattService>,
}

impl GattTable {
    pub(crate) fn clear(&mut self) {
        self.services.clear();
    }

    pub(crate) fn services(&self) -> &[GattService] {
        &self.services
    }

    /// Adds a service found by `read_by_group_type`. A service with the same
    /// start handle is replaced.
    pub(crate) fn add_service(&mut self, uuid: Uuid, start_handle: u16, end_handle: u16) {
        self.services.retain(|s| s.start_handle != start_handle);
        let position = self
            .services
            .iter()
            .position(|s| s.start_handle > start_handle)
            .unwrap_or(self.services.len());
        self.services.insert(
            position,
            GattService {
                uuid,
                start_handle,
                end_handle,
                characteristics: Vec::new(),
            },
        );
    }

    /// Adds an attribute found by `find_information`.
    ///
    /// Declarations (0x2800..=0x2803) are skipped, 0x29xx types become
    /// descriptors of the preceding characteristic, anything else becomes a
    /// characteristic of the containing service. Returns false if the
    /// attribute was not stored.
    pub(crate) fn add_attribute(&mut self, handle: u16, uuid: Uuid) -> bool {
        let short = short_uuid(&uuid);
        if short.is_some_and(|s| (PRIMARY_SERVICE..=CHARACTERISTIC).contains(&s)) {
            return false;
        }

        let Some(service) = self.services.iter_mut().find(|s| s.contains(handle)) else {
            tracing::debug!(handle, %uuid, "Attribute outside of any known service");
            return false;
        };

        if short.is_some_and(|s| s >> 8 == 0x29) {
            let Some(characteristic) = service
                .characteristics
                .iter_mut()
                .rev()
                .find(|c| c.handle < handle)
            else {
                return false;
            };
            characteristic.descriptors.push(GattDescriptor { uuid, handle });
            return true;
        }

        if service.characteristic(handle).is_none() {
            service
                .characteristics
                .push(GattCharacteristic::new(uuid, handle));
        }
        true
    }

    pub(crate) fn characteristic(&self, handle: u16) -> Option<&GattCharacteristic> {
        self.services.iter().find_map(|s| s.characteristic(handle))
    }

    /// Stores `value` and returns the updated characteristic. Unknown handles
    /// yield a characteristic with a nil UUID that is not stored.
    pub(crate) fn update_value(&mut self, handle: u16, value: &[u8]) -> GattCharacteristic {
        let stored = self
            .services
            .iter_mut()
            .flat_map(|s| s.characteristics.iter_mut())
            .find(|c| c.handle == handle);

        match stored {
            Some(characteristic) => {
                characteristic.value = value.to_vec();
                characteristic.clone()
            }
            None => {
                let mut characteristic = GattCharacteristic::new(Uuid::nil(), handle);
                characteristic.value = value.to_vec();
                characteristic
            }
        }
    }

    /// Returns the stored characteristic, or an undiscovered placeholder.
    pub(crate) fn characteristic_or_placeholder(&self, handle: u16) -> GattCharacteristic {
        self.characteristic(handle)
            .cloned()
            .unwrap_or_else(|| GattCharacteristic::new(Uuid::nil(), handle))
    }
}

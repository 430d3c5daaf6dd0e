//! Process Data Channel.
//!
//! Two fixed-size records exchanged once per fieldbus cycle. Buffers are
//! allocated once at startup and overwritten in place; the layout never
//! changes after construction. Single writer and single reader per
//! direction, so no locking.

use medulla_common::consts::PDO_MAX_BYTES;
use medulla_common::error::ErrorFlags;
use medulla_common::hal::FieldbusPort;
use medulla_common::identity::DeviceId;
use medulla_common::pdo::{
    PdoLayout, PdoValue, RX_COMMAND_STATE, RX_MASTER_COUNTER, RxField, TX_DEVICE_COUNTER,
    TX_DEVICE_ID, TX_DEVICE_STATE, TX_ERROR_FLAGS, TxField,
};
use medulla_common::state::{CommandedState, DeviceState};
use thiserror::Error;

/// Layout errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PdoError {
    /// Record sizes do not hold the header or exceed the fixed capacity.
    #[error("layout {name}: rx {rx_size} / tx {tx_size} bytes outside header..capacity")]
    InvalidLayout {
        /// Layout name.
        name: &'static str,
        /// Inbound size [bytes].
        rx_size: usize,
        /// Outbound size [bytes].
        tx_size: usize,
    },
}

/// Inbound and outbound process-data records of one device.
#[derive(Debug, Clone)]
pub struct ProcessData {
    layout: PdoLayout,
    rx: [u8; PDO_MAX_BYTES],
    tx: [u8; PDO_MAX_BYTES],
    publish_count: u64,
    ingest_count: u64,
}

impl ProcessData {
    /// Allocate both records for `layout`.
    pub fn new(layout: PdoLayout) -> Result<Self, PdoError> {
        if !layout.is_valid() {
            return Err(PdoError::InvalidLayout {
                name: layout.name,
                rx_size: layout.rx_size,
                tx_size: layout.tx_size,
            });
        }
        Ok(Self {
            layout,
            rx: [0; PDO_MAX_BYTES],
            tx: [0; PDO_MAX_BYTES],
            publish_count: 0,
            ingest_count: 0,
        })
    }

    /// Record layout.
    #[inline]
    pub fn layout(&self) -> &PdoLayout {
        &self.layout
    }

    // ─── Inbound ────────────────────────────────────────────────────

    /// State requested by the master, `None` for an unknown raw value.
    #[inline]
    pub fn command(&self) -> CommandedState {
        DeviceState::from_u8(self.rx[RX_COMMAND_STATE.offset])
    }

    /// Master cycle counter.
    #[inline]
    pub fn master_counter(&self) -> u16 {
        self.rx(RX_MASTER_COUNTER)
    }

    /// Read a device-specific inbound field.
    #[inline]
    pub fn rx<T: PdoValue>(&self, field: RxField) -> T {
        debug_assert!(field.end() <= self.layout.rx_size);
        T::read_le(&self.rx[field.range()])
    }

    /// Overwrite the inbound header as the master would.
    pub fn load_rx_header(&mut self, command: u8, master_counter: u16) {
        self.rx[RX_COMMAND_STATE.offset] = command;
        master_counter.write_le(&mut self.rx[RX_MASTER_COUNTER.range()]);
    }

    /// Overwrite a device-specific inbound field as the master would.
    pub fn load_rx<T: PdoValue>(&mut self, field: RxField, value: T) {
        value.write_le(&mut self.rx[field.range()]);
    }

    /// Copy the inbound record out of the transport.
    pub fn ingest<P: FieldbusPort + ?Sized>(&mut self, port: &mut P) {
        port.read_rx(&mut self.rx[..self.layout.rx_size]);
        self.ingest_count += 1;
    }

    // ─── Outbound ───────────────────────────────────────────────────

    /// Fill the common outbound header.
    pub fn write_header(
        &mut self,
        id: DeviceId,
        state: DeviceState,
        counter: u8,
        flags: ErrorFlags,
    ) {
        self.tx[TX_DEVICE_ID.offset] = id.0;
        self.tx[TX_DEVICE_STATE.offset] = state as u8;
        self.tx[TX_DEVICE_COUNTER.offset] = counter;
        self.tx[TX_ERROR_FLAGS.offset] = flags.bits();
    }

    /// Write a telemetry field.
    #[inline]
    pub fn set_tx<T: PdoValue>(&mut self, field: TxField, value: T) {
        debug_assert!(field.end() <= self.layout.tx_size);
        value.write_le(&mut self.tx[field.range()]);
    }

    /// Read back a telemetry field.
    #[inline]
    pub fn tx<T: PdoValue>(&self, field: TxField) -> T {
        T::read_le(&self.tx[field.range()])
    }

    /// The outbound record as it goes on the wire.
    #[inline]
    pub fn tx_bytes(&self) -> &[u8] {
        &self.tx[..self.layout.tx_size]
    }

    /// Copy the outbound record into the transport.
    pub fn publish<P: FieldbusPort + ?Sized>(&mut self, port: &mut P) {
        port.write_tx(&self.tx[..self.layout.tx_size]);
        self.publish_count += 1;
    }

    // ─── Freshness ──────────────────────────────────────────────────

    /// Number of outbound publications.
    pub fn publish_count(&self) -> u64 {
        self.publish_count
    }

    /// Number of inbound reads.
    pub fn ingest_count(&self) -> u64 {
        self.ingest_count
    }
}

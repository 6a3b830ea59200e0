use crate::advertisement::{BleAdvertisement, Format5Sample, PowerWord};
use crate::mac_address::MacAddress;

/// BLE flags of a connectable LE general discoverable device.
pub const TEST_FLAGS: [u8; 3] = [0x02, 0x01, 0x06];

/// A stable device address for unit tests.
pub const TEST_ADDRESS: &str = "AA:BB:CC:DD:EE:FF";

/// The "valid data" vector of the RuuviTag format 5 documentation.
pub fn vendor_sample() -> Format5Sample {
    Format5Sample {
        temperature: 4860,
        humidity: 21396,
        pressure: 50044,
        acceleration_x: 4,
        acceleration_y: -4,
        acceleration_z: 1036,
        power: PowerWord(0xAC36),
        movement_counter: 66,
        measurement_sequence: 205,
        mac: MacAddress([0xCB, 0xB8, 0x33, 0x4C, 0x88, 0x4F]),
    }
}

/// Wrap a sample into a full advertisement frame.
pub fn sample_advertisement(sample: Format5Sample) -> BleAdvertisement {
    BleAdvertisement::new(TEST_FLAGS, sample)
}

/// Hex encoding of the vendor sample as a gateway would relay it.
pub fn vendor_hex() -> String {
    sample_advertisement(vendor_sample()).to_hex()
}

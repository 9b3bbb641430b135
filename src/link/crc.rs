//! # Link CRC
//!
//! CRC-8/DVB-S2 (poly 0xD5, init 0x00, no reflection, no final xor), table
//! driven. The table is built at compile time.

/// CRC-8/DVB-S2 polynomial
const POLY: u8 = 0xD5;

const TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut n = 0;
    while n < 256 {
        let mut crc = n as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ POLY } else { crc << 1 };
            bit += 1;
        }
        table[n] = crc;
        n += 1;
    }
    table
}

/// Checksum of `data` (the frame's length, type and payload bytes).
///
/// # Examples
///
/// ```
/// use gyro_steer::link::crc::crc8;
///
/// assert_eq!(crc8(&[]), 0x00);
/// assert_eq!(crc8(b"123456789"), 0xBC);
/// ```
#[must_use]
pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |crc, &byte| TABLE[(crc ^ byte) as usize])
}

//! Wire formats for delivering the capture log to the collector.
//!
//! Two framings exist; a deployment uses exactly one.
//!
//! **Binary**: an `i32` record count, followed by the records back to back.
//! Every field is encoded explicitly in little-endian order, so the layout
//! does not depend on the host's struct padding:
//!
//! ```text
//! offset  size  field
//!      0     4  timestamp      u32
//!      4     2  frame_control  u16
//!      6     1  rssi           i8
//!      7     6  sender         [u8; 6]
//!     13     1  channel        u8
//! ```
//!
//! **JSON**: a single array,
//! `[{"time":1234,"mac":"AA:BB:CC:DD:EE:01","rssi":-40,"ch":6},...]`,
//! no whitespace and no trailing separator.
use heapless::String;
use serde::Serialize;

use crate::record::Observation;

/// Firmware version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Size of the record-count prefix in the binary framing
pub const COUNT_LEN: usize = 4;

/// Size of one encoded record in the binary framing
pub const RECORD_LEN: usize = 14;

/// Upper bound on one JSON array element including its separator.
/// Widest case: `{"time":4294967295,"mac":"XX:XX:XX:XX:XX:XX","rssi":-128,"ch":255},`
pub const JSON_RECORD_MAX: usize = 72;

/// Maximum length for MAC address strings ("AA:BB:CC:DD:EE:FF")
pub type MacString = String<18>;

/// Payload framing used for delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Binary,
    Json,
}

impl Framing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framing::Binary => "binary",
            Framing::Json => "json",
        }
    }
}

/// Scratch buffer size needed to encode `records` records.
///
/// For the binary framing this covers the record body only; the count
/// prefix is sent from its own 4-byte buffer.
pub const fn payload_capacity(framing: Framing, records: usize) -> usize {
    match framing {
        Framing::Binary => records * RECORD_LEN,
        Framing::Json => 2 + records * JSON_RECORD_MAX,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("payload buffer too small ({capacity} bytes)")]
    BufferTooSmall { capacity: usize },
}

/// One element of the JSON array
#[derive(Serialize)]
struct JsonRecord<'a> {
    time: u32,
    mac: &'a str,
    rssi: i8,
    ch: u8,
}

/// Encode the binary record-count prefix.
pub fn encode_count(count: usize) -> [u8; COUNT_LEN] {
    (count as i32).to_le_bytes()
}

/// Encode one record into its fixed 14-byte wire form.
pub fn encode_record(record: &Observation) -> [u8; RECORD_LEN] {
    let mut out = [0u8; RECORD_LEN];
    out[0..4].copy_from_slice(&record.timestamp.to_le_bytes());
    out[4..6].copy_from_slice(&record.frame_control.to_le_bytes());
    out[6] = record.rssi as u8;
    out[7..13].copy_from_slice(&record.sender);
    out[13] = record.channel;
    out
}

/// Encode records back to back into `buf`. Returns the number of bytes written.
pub fn encode_records<I>(records: I, buf: &mut [u8]) -> Result<usize, EncodeError>
where
    I: IntoIterator<Item = Observation>,
{
    let capacity = buf.len();
    let mut pos = 0;
    for record in records {
        let end = pos + RECORD_LEN;
        if end > capacity {
            return Err(EncodeError::BufferTooSmall { capacity });
        }
        buf[pos..end].copy_from_slice(&encode_record(&record));
        pos = end;
    }
    Ok(pos)
}

/// Encode records as a JSON array into `buf`. Returns the number of bytes written.
pub fn encode_json<I>(records: I, buf: &mut [u8]) -> Result<usize, EncodeError>
where
    I: IntoIterator<Item = Observation>,
{
    let capacity = buf.len();
    let mut pos = 0;

    push(buf, &mut pos, b"[")?;
    for (i, record) in records.into_iter().enumerate() {
        if i > 0 {
            push(buf, &mut pos, b",")?;
        }
        let mut mac = MacString::new();
        format_mac(&record.sender, &mut mac);
        let element = JsonRecord {
            time: record.timestamp,
            mac: &mac,
            rssi: record.rssi,
            ch: record.channel,
        };
        pos += serde_json_core::to_slice(&element, &mut buf[pos..])
            .map_err(|_| EncodeError::BufferTooSmall { capacity })?;
    }
    push(buf, &mut pos, b"]")?;

    Ok(pos)
}

fn push(buf: &mut [u8], pos: &mut usize, bytes: &[u8]) -> Result<(), EncodeError> {
    let end = *pos + bytes.len();
    if end > buf.len() {
        return Err(EncodeError::BufferTooSmall {
            capacity: buf.len(),
        });
    }
    buf[*pos..end].copy_from_slice(bytes);
    *pos = end;
    Ok(())
}

/// Decode the binary record-count prefix.
pub fn decode_count(bytes: &[u8]) -> Option<i32> {
    let prefix: [u8; COUNT_LEN] = bytes.get(..COUNT_LEN)?.try_into().ok()?;
    Some(i32::from_le_bytes(prefix))
}

/// Decode one binary record. Returns `None` if fewer than 14 bytes are given.
pub fn decode_record(bytes: &[u8]) -> Option<Observation> {
    let b = bytes.get(..RECORD_LEN)?;
    Some(Observation {
        timestamp: u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        frame_control: u16::from_le_bytes([b[4], b[5]]),
        rssi: b[6] as i8,
        sender: b[7..13].try_into().ok()?,
        channel: b[13],
    })
}

/// Decode a binary record body. A trailing partial record is ignored.
pub fn decode_records(bytes: &[u8]) -> impl Iterator<Item = Observation> + '_ {
    bytes.chunks_exact(RECORD_LEN).filter_map(decode_record)
}

/// Format a 6-byte MAC address into "AA:BB:CC:DD:EE:FF" string
pub fn format_mac(mac: &[u8; 6], buf: &mut MacString) {
    use core::fmt::Write;
    let _ = write!(
        buf,
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    );
}

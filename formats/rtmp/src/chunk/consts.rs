/// Largest timestamp the 24-bit header field can carry; the sentinel that
/// switches a chunk to the extended 32-bit field.
pub const MAX_TIMESTAMP: u32 = 0xFFFFFF;

pub const DEFAULT_CHUNK_SIZE: usize = 128;
pub const MAX_CHUNK_SIZE: u32 = 0xFFFFFF;

/// Declared message sizes above this are rejected before any allocation.
pub const DEFAULT_MAX_PACKET_SIZE: usize = 3 * 1024 * 1024;

/// Chunk stream ids run 2..=65599 once the 2- and 3-byte encodings are
/// resolved; 0 and 1 are the encoding sentinels themselves.
pub const MIN_CSID: u32 = 2;
pub const MAX_CSID: u32 = 65599;

pub mod csid {
    pub const PROTOCOL_CONTROL: u8 = 0x02;
    pub const NET_CONNECTION_COMMAND: u8 = 0x03;
    pub const NET_STREAM_COMMAND: u8 = 0x05;
    pub const VIDEO: u8 = 0x06;
    pub const AUDIO: u8 = 0x07;
}

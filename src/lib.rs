//! Decode and encode SCTE-35 cue messages and extract them from MPEG
//! transport streams.
//!
//! The crate has two halves that share one data model:
//!
//! - a bit-exact codec for the SCTE-35 splice info section: header, splice
//!   commands, splice descriptors (including segmentation UPIDs) and the
//!   trailing CRC-32 ([`Cue`]);
//! - a transport-stream demultiplexer that walks PAT/PMT tables, tracks the
//!   signaling PIDs, reassembles sections split across 188-byte packets and
//!   hands every completed section to the codec ([`TsDemuxer`]).
//!
//! ```no_run
//! use cuestream::Cue;
//!
//! let cue = Cue::decode_base64("/DAWAAAAAAAAAP/wBQb+AKmKxwAACzuu2Q==").unwrap();
//! assert_eq!(cue.info_section.command_type, 0x06);
//! ```

use thiserror::Error;

mod bit_reader;
mod bit_writer;
mod commands;
mod crc;
mod cue;
mod demux;
mod descriptors;
mod info;
mod upid;


pub use commands::{
    BreakDuration, PrivateCommand, SpliceCommand, SpliceInsert, SpliceTime, TimeSignal,
};
pub use crc::crc32;
pub use cue::Cue;
pub use demux::{PacketContext, TsDemuxer};
pub use descriptors::{
    AudioComponent, AudioDescriptor, AvailDescriptor, DeviceRestrictions, DtmfDescriptor,
    SegmentationComponent, SegmentationDescriptor, SpliceDescriptor, TimeDescriptor,
    segmentation_message,
};
pub use info::InfoSection;
pub use upid::Upid;

/// Errors produced while decoding or encoding SCTE-35 data.
#[derive(Error, Debug)]
pub enum CueError {
    /// The buffer does not carry a splice info section: wrong table id,
    /// section syntax indicator set, or a non-zero protocol version.
    /// Callers probing arbitrary byte blobs should treat this as "no cue
    /// present" rather than a hard failure.
    #[error("not a splice info section")]
    NotSpliceInfo,

    /// A read ran past the end of the section data.
    #[error("unexpected end of section data at bit {offset}")]
    UnexpectedEnd {
        /// Bit offset at which the read was attempted.
        offset: usize,
    },

    /// The splice command type is not one of the five defined values.
    #[error("unsupported splice command type 0x{0:02x}")]
    UnsupportedCommand(u8),

    /// A hex-string field could not be parsed back into bits.
    #[error("invalid hex value {0:?}")]
    InvalidHex(String),

    /// The EIDR UPID value does not follow the `10<head>/<tail>` form.
    #[error("malformed EIDR value {0:?}")]
    MalformedEidr(String),

    #[cfg(feature = "base64")]
    #[error("invalid encoded input")]
    Encoding(#[from] data_encoding::DecodeError),

    #[cfg(feature = "serde")]
    #[error("invalid cue JSON")]
    Json(#[from] serde_json::Error),
}

/// The number of 90 kHz clock ticks per second.
pub const TICKS_PER_SECOND: f64 = 90_000.0;

/// Converts a 90 kHz tick count to seconds, truncated to six decimal
/// places. Truncation (not rounding) is part of the wire-compatibility
/// contract: 11111111 ticks is 123.456788 seconds, never 123.456789.
pub fn ticks_to_secs(ticks: u64) -> f64 {
    let secs = ticks as f64 / TICKS_PER_SECOND;
    (secs * 1_000_000.0) as u64 as f64 / 1_000_000.0
}

/// Converts seconds to 90 kHz ticks, rounded to the nearest tick.
///
/// Rounding here is deliberate and asymmetric with [`ticks_to_secs`]: it
/// makes `secs_to_ticks(ticks_to_secs(t)) == t` for every 33-bit tick value.
pub fn secs_to_ticks(secs: f64) -> u64 {
    (secs * TICKS_PER_SECOND).round() as u64
}

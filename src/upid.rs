//! Segmentation UPIDs.
//!
//! The "unique program identifier" carried by a segmentation descriptor is
//! a tagged sub-format of its own: one byte of type, one byte of length,
//! then a payload whose shape depends on the type. Most types are plain
//! ASCII or hex values; a handful have structure, and the MID type nests a
//! whole list of further UPIDs.

use crate::bit_reader::BitReader;
use crate::bit_writer::BitWriter;
use crate::CueError;

/// A decoded segmentation UPID.
///
/// `Mid` is recursive: its payload is a concatenation of type/length/value
/// entries parsed with the same dispatcher as the outer UPID.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Upid {
    /// The generic handler: the payload read as ASCII. Covers AdID, TID,
    /// ADI, UUID, ACR, ADS Info, URI, ISAN and any unrecognized type.
    Text { upid_type: u8, value: String },
    /// Airing ID (0x08), kept as a hex string.
    AiringId { value: String },
    /// EIDR (0x0a): `"10<head>/<tail>"`, a decimal 16-bit head after the
    /// fixed `10` sub-prefix and an 80-bit tail as a hex string.
    Eidr { value: String },
    /// ATSC content identifier (0x0b).
    Atsc {
        tsid: u16,
        reserved: u8,
        end_of_day: u8,
        unique_for: u16,
        content_id: String,
    },
    /// Managed Private UPID (0x0c): a format identifier plus private bytes.
    Mpu {
        format_identifier: String,
        private_data: Vec<u8>,
    },
    /// Multiple UPID (0x0d): a nested list of UPIDs.
    Mid { upids: Vec<Upid> },
}

impl Upid {
    /// The wire `upid_type` for this value.
    pub fn upid_type(&self) -> u8 {
        match self {
            Upid::Text { upid_type, .. } => *upid_type,
            Upid::AiringId { .. } => 0x08,
            Upid::Eidr { .. } => 0x0A,
            Upid::Atsc { .. } => 0x0B,
            Upid::Mpu { .. } => 0x0C,
            Upid::Mid { .. } => 0x0D,
        }
    }

    /// Human-readable name for the UPID type.
    pub fn name(&self) -> &'static str {
        upid_type_name(self.upid_type())
    }

    /// Decodes `upid_len` bytes of payload according to `upid_type`.
    pub(crate) fn decode(
        reader: &mut BitReader,
        upid_type: u8,
        upid_len: u8,
    ) -> Result<Upid, CueError> {
        match upid_type {
            0x08 => Ok(Upid::AiringId {
                value: reader.read_hex(upid_len as usize * 8)?,
            }),
            // An EIDR is only well-formed at twelve bytes; anything else is
            // treated as an opaque value.
            0x0A if upid_len == 12 => {
                let head = reader.read_uint(16)?;
                let tail = reader.read_hex(80)?;
                Ok(Upid::Eidr {
                    value: format!("10{head}/{tail}"),
                })
            }
            0x0B if upid_len >= 4 => {
                let tsid = reader.read_uint(16)? as u16;
                let reserved = reader.read_uint(2)? as u8;
                let end_of_day = reader.read_uint(5)? as u8;
                let unique_for = reader.read_uint(9)? as u16;
                let content_id = reader.read_ascii((upid_len as usize - 4) * 8)?;
                Ok(Upid::Atsc {
                    tsid,
                    reserved,
                    end_of_day,
                    unique_for,
                    content_id,
                })
            }
            0x0C if upid_len >= 4 => {
                let format_identifier = reader.read_hex(32)?;
                let private_data = reader.read_bytes(upid_len as usize - 4)?;
                Ok(Upid::Mpu {
                    format_identifier,
                    private_data,
                })
            }
            0x0D => {
                let mut upids = Vec::new();
                let mut consumed: usize = 0;
                while consumed < upid_len as usize {
                    let sub_type = reader.read_uint(8)? as u8;
                    let sub_len = reader.read_uint(8)? as u8;
                    consumed += 2 + sub_len as usize;
                    upids.push(Upid::decode(reader, sub_type, sub_len)?);
                }
                Ok(Upid::Mid { upids })
            }
            _ => Ok(Upid::Text {
                upid_type,
                value: reader.read_ascii(upid_len as usize * 8)?,
            }),
        }
    }

    /// Encodes the payload into `upid_len` bytes.
    ///
    /// Only the value-bearing variants have an encoder: `Text`, `AiringId`
    /// and `Eidr`. The structured `Atsc`/`Mpu`/`Mid` payloads are written
    /// as reserved (all-one) filler of the declared length, a known
    /// limitation of the encode path, kept so the surrounding descriptor
    /// stays byte-aligned.
    pub(crate) fn encode(&self, writer: &mut BitWriter, upid_len: u8) -> Result<(), CueError> {
        match self {
            Upid::Text { value, .. } => {
                writer.write_bytes(value.as_bytes());
                Ok(())
            }
            Upid::AiringId { value } => writer.write_hex(value, upid_len as usize * 8),
            Upid::Eidr { value } => {
                let rest = value
                    .strip_prefix("10")
                    .ok_or_else(|| CueError::MalformedEidr(value.clone()))?;
                let (head, tail) = rest
                    .split_once('/')
                    .ok_or_else(|| CueError::MalformedEidr(value.clone()))?;
                let head: u64 = head
                    .parse()
                    .map_err(|_| CueError::MalformedEidr(value.clone()))?;
                writer.write_uint(head, 16);
                writer.write_hex(tail, 80)
            }
            Upid::Atsc { .. } | Upid::Mpu { .. } | Upid::Mid { .. } => {
                writer.reserve(upid_len as usize * 8);
                Ok(())
            }
        }
    }

    /// Payload length in bytes when this value is encoded. For variants
    /// without a real encoder this is the length the reserved filler will
    /// occupy, so callers pass the previously decoded length through.
    pub(crate) fn encoded_len(&self, declared: u8) -> u8 {
        match self {
            Upid::Text { value, .. } => value.len() as u8,
            Upid::Eidr { .. } => 12,
            _ => declared,
        }
    }
}

/// Names for the recognized `upid_type` values.
pub(crate) fn upid_type_name(upid_type: u8) -> &'static str {
    match upid_type {
        0x01 | 0x02 => "Deprecated",
        0x03 => "AdID",
        0x05 | 0x06 => "ISAN",
        0x07 => "TID",
        0x08 => "AiringID",
        0x09 => "ADI",
        0x0A => "EIDR",
        0x0B => "ATSC",
        0x0C => "MPU",
        0x0D => "MID",
        0x0E => "ADS Info",
        0x0F => "URI",
        0x10 => "UUID",
        0x11 => "ACR",
        _ => "UPID",
    }
}

//! The complete SCTE-35 cue: info section, splice command, descriptor
//! loop and CRC-32, plus the conveniences for string and JSON forms.

use crate::bit_reader::BitReader;
use crate::bit_writer::BitWriter;
#[cfg(feature = "base64")]
use crate::commands::{BreakDuration, SpliceInsert, SpliceTime};
use crate::commands::SpliceCommand;
use crate::crc::crc32;
use crate::demux::PacketContext;
use crate::descriptors::SpliceDescriptor;
use crate::info::InfoSection;
use crate::CueError;

#[cfg(feature = "base64")]
use data_encoding::{BASE64, HEXLOWER_PERMISSIVE};

/// One complete SCTE-35 signaling message.
///
/// Decoding fills every field from the wire; encoding recomputes the
/// derived fields (`section_length`, `command_length`, `command_type`,
/// `descriptor_loop_length`, `crc32`) from the current values, so a cue can
/// be freely edited between a decode and a re-encode.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Cue {
    pub info_section: InfoSection,
    pub command: SpliceCommand,
    pub descriptor_loop_length: u16,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Vec::is_empty"))]
    pub descriptors: Vec<SpliceDescriptor>,
    pub crc32: u32,
    /// Transport-stream context, present only on cues produced by
    /// [`crate::TsDemuxer`].
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub packet: Option<PacketContext>,
}

impl Cue {
    /// Decodes a cue from raw section bytes.
    ///
    /// Returns [`CueError::NotSpliceInfo`] when the bytes do not start a
    /// splice info section; callers scanning arbitrary payloads treat that
    /// as "no cue here". Trailing bytes beyond the section length (transport
    /// padding) are ignored.
    pub fn decode(data: &[u8]) -> Result<Cue, CueError> {
        if data.len() < 3 {
            return Err(CueError::NotSpliceInfo);
        }
        // The section length field lives in the first three bytes; cap the
        // reader just past the section end so transport padding after it
        // falls away.
        let section_length = ((data[1] & 0x0F) as usize) << 8 | data[2] as usize;
        let end = data.len().min(section_length + 4);
        let mut reader = BitReader::new(&data[..end]);

        let info_section = InfoSection::decode(&mut reader)?;
        let command_start = reader.offset();
        let command = SpliceCommand::decode(info_section.command_type, &mut reader)?;
        let command_read = reader.offset() - command_start;
        let command_expected = info_section.command_length as usize * 8;
        // A 0xFFF command length means "unknown" and is not checked.
        if info_section.command_length != 0xFFF && command_read < command_expected {
            log::warn!(
                "splice command under-read: expected {command_expected} bits, read {command_read}"
            );
            reader.skip(command_expected - command_read)?;
        }

        let descriptor_loop_length = reader.read_uint(16)? as u16;
        let mut descriptors = Vec::new();
        let mut consumed: usize = 0;
        while consumed < descriptor_loop_length as usize {
            let tag = reader.read_uint(8)? as u8;
            let length = reader.read_uint(8)? as u8;
            let body_start = reader.offset();
            descriptors.push(SpliceDescriptor::decode(&mut reader, tag, length)?);
            let body_read = reader.offset() - body_start;
            let body_expected = length as usize * 8;
            if body_read < body_expected {
                log::warn!(
                    "descriptor 0x{tag:02x} under-read: expected {body_expected} bits, read {body_read}"
                );
                reader.skip(body_expected - body_read)?;
            } else if body_read > body_expected {
                return Err(CueError::UnexpectedEnd {
                    offset: reader.offset(),
                });
            }
            consumed += 2 + length as usize;
        }

        let crc32 = reader.read_uint(32)? as u32;

        Ok(Cue {
            info_section,
            command,
            descriptor_loop_length,
            descriptors,
            crc32,
            packet: None,
        })
    }

    /// Encodes the cue to section bytes, backfilling the derived length
    /// fields and the CRC-32 in place.
    pub fn encode(&mut self) -> Result<Vec<u8>, CueError> {
        let command_bytes = self.command.encode();
        self.info_section.command_length = command_bytes.len() as u16;
        self.info_section.command_type = self.command.kind();

        let loop_bytes = self.roll_descriptor_loop()?;
        self.descriptor_loop_length = loop_bytes.len() as u16;

        // 11 header bytes after the length field, the command, 2 bytes of
        // descriptor loop length, the loop, and 4 bytes of CRC.
        self.info_section.section_length =
            11 + command_bytes.len() as u16 + 2 + self.descriptor_loop_length + 4;

        let mut writer = BitWriter::new();
        writer.write_bytes(&self.info_section.encode()?);
        writer.write_bytes(&command_bytes);
        writer.write_uint(self.descriptor_loop_length as u64, 16);
        writer.write_bytes(&loop_bytes);

        let mut bytes = writer.finish();
        self.crc32 = crc32(&bytes);
        bytes.extend_from_slice(&self.crc32.to_be_bytes());
        Ok(bytes)
    }

    /// Re-encodes every descriptor into one loop. Descriptors without an
    /// encoder produce an empty body and are dropped from the loop.
    fn roll_descriptor_loop(&self) -> Result<Vec<u8>, CueError> {
        let mut out = Vec::new();
        for descriptor in &self.descriptors {
            let body = descriptor.encode_body()?;
            if body.is_empty() {
                log::debug!("dropping {} from the loop: no encoder", descriptor.name());
                continue;
            }
            out.push(descriptor.tag());
            out.push(body.len() as u8);
            out.extend_from_slice(&body);
        }
        Ok(out)
    }

    /// Adds `seconds` to the PTS adjustment and re-encodes.
    pub fn adjust_pts(&mut self, seconds: f64) -> Result<Vec<u8>, CueError> {
        self.info_section.pts_adjustment += seconds;
        self.encode()
    }

    /// Converts a time signal carrying CUE-OUT/CUE-IN segmentation into
    /// the equivalent splice insert and returns the re-encoded base64.
    ///
    /// CUE-OUT type ids (break/advertisement/placement/ad-block starts,
    /// when a duration is present) become an out-of-network insert with an
    /// auto-return break; CUE-IN type ids become a return-to-network
    /// insert. Anything else re-encodes unchanged.
    #[cfg(feature = "base64")]
    pub fn six_to_five(&mut self) -> Result<String, CueError> {
        // CUE-OUT and CUE-IN segmentation type ids, respectively.
        const CUE_OUT_TYPE_IDS: [u8; 7] = [0x22, 0x30, 0x32, 0x34, 0x36, 0x44, 0x46];
        const CUE_IN_TYPE_IDS: [u8; 7] = [0x23, 0x31, 0x33, 0x35, 0x37, 0x45, 0x47];

        if self.info_section.command_type == 0x06 {
            let pts = match &self.command {
                SpliceCommand::TimeSignal(signal) => signal.splice_time.pts,
                _ => None,
            };
            let mut replacement = None;
            for descriptor in &self.descriptors {
                let SpliceDescriptor::Segmentation(seg) = descriptor else {
                    continue;
                };
                let digits = seg.event_id.strip_prefix("0x").unwrap_or(&seg.event_id);
                let event_id = u32::from_str_radix(digits, 16)
                    .map_err(|_| CueError::InvalidHex(seg.event_id.clone()))?;
                let base = SpliceInsert {
                    event_id,
                    program_splice: true,
                    splice_time: pts.map(|pts| SpliceTime { pts: Some(pts) }),
                    ..SpliceInsert::default()
                };
                if CUE_OUT_TYPE_IDS.contains(&seg.segmentation_type_id) {
                    if seg.duration_flag {
                        replacement = Some(SpliceInsert {
                            out_of_network: true,
                            duration_flag: true,
                            break_duration: Some(BreakDuration {
                                auto_return: true,
                                duration: seg.duration.unwrap_or(0.0),
                            }),
                            ..base
                        });
                    }
                } else if CUE_IN_TYPE_IDS.contains(&seg.segmentation_type_id) {
                    replacement = Some(base);
                }
            }
            if let Some(insert) = replacement {
                self.command = SpliceCommand::SpliceInsert(insert);
                self.info_section.command_type = 0x05;
            }
        }
        self.encode_base64()
    }

    /// Decodes a cue from a base64 string.
    #[cfg(feature = "base64")]
    pub fn decode_base64(data: &str) -> Result<Cue, CueError> {
        Cue::decode(&BASE64.decode(data.as_bytes())?)
    }

    /// Decodes a cue from a hex string, with or without a `0x` prefix.
    #[cfg(feature = "base64")]
    pub fn decode_hex(data: &str) -> Result<Cue, CueError> {
        let digits = data
            .strip_prefix("0x")
            .or_else(|| data.strip_prefix("0X"))
            .unwrap_or(data);
        let padded = if digits.len() % 2 == 1 {
            format!("0{digits}")
        } else {
            digits.to_string()
        };
        Cue::decode(&HEXLOWER_PERMISSIVE.decode(padded.to_ascii_lowercase().as_bytes())?)
    }

    /// Encodes and returns the cue as base64.
    #[cfg(feature = "base64")]
    pub fn encode_base64(&mut self) -> Result<String, CueError> {
        Ok(BASE64.encode(&self.encode()?))
    }

    /// Encodes and returns the cue as a `0x`-prefixed hex string.
    #[cfg(feature = "base64")]
    pub fn encode_hex(&mut self) -> Result<String, CueError> {
        let bytes = self.encode()?;
        let mut out = String::with_capacity(2 + bytes.len() * 2);
        out.push_str("0x");
        for byte in bytes {
            out.push_str(&format!("{byte:02x}"));
        }
        Ok(out)
    }

    /// Renders the cue as pretty-printed JSON.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, CueError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builds a cue from its JSON form. Derived fields are recomputed on
    /// the next [`Cue::encode`], so partial JSON with defaults is fine.
    #[cfg(feature = "serde")]
    pub fn from_json(data: &str) -> Result<Cue, CueError> {
        Ok(serde_json::from_str(data)?)
    }
}

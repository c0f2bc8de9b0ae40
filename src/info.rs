//! The splice info section header.

use crate::bit_reader::BitReader;
use crate::bit_writer::BitWriter;
use crate::CueError;

/// Fixed-layout header preceding the splice command in every cue.
///
/// `section_length`, `command_length` and `command_type` are derived
/// fields: [`crate::Cue::encode`] recomputes them from the command and
/// descriptor loop before this header is written out.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InfoSection {
    /// Always `"0xfc"` on the wire.
    pub table_id: String,
    pub section_syntax_indicator: bool,
    pub private_indicator: bool,
    pub reserved: String,
    pub section_length: u16,
    pub protocol_version: u8,
    pub encrypted_packet: bool,
    pub encryption_algorithm: u8,
    /// Offset applied to every PTS in the message, in seconds.
    pub pts_adjustment: f64,
    pub cw_index: String,
    pub tier: String,
    pub command_length: u16,
    pub command_type: u8,
}

impl Default for InfoSection {
    fn default() -> Self {
        InfoSection {
            table_id: "0xfc".to_string(),
            section_syntax_indicator: false,
            private_indicator: false,
            reserved: "0x3".to_string(),
            section_length: 0,
            protocol_version: 0,
            encrypted_packet: false,
            encryption_algorithm: 0,
            pts_adjustment: 0.0,
            cw_index: "0xff".to_string(),
            tier: "0xfff".to_string(),
            command_length: 0,
            command_type: 0,
        }
    }
}

impl InfoSection {
    /// Decodes the header. Fails with [`CueError::NotSpliceInfo`] when the
    /// table id is not `0xfc`, the section syntax indicator is set, or the
    /// protocol version is non-zero; callers probing arbitrary sections
    /// treat that as "no cue present".
    pub(crate) fn decode(reader: &mut BitReader) -> Result<InfoSection, CueError> {
        let table_id = reader.read_hex(8)?;
        if table_id != "0xfc" {
            return Err(CueError::NotSpliceInfo);
        }
        let section_syntax_indicator = reader.read_flag()?;
        if section_syntax_indicator {
            return Err(CueError::NotSpliceInfo);
        }
        let private_indicator = reader.read_flag()?;
        let reserved = reader.read_hex(2)?;
        let section_length = reader.read_uint(12)? as u16;
        let protocol_version = reader.read_uint(8)? as u8;
        if protocol_version != 0 {
            return Err(CueError::NotSpliceInfo);
        }
        let encrypted_packet = reader.read_flag()?;
        let encryption_algorithm = reader.read_uint(6)? as u8;
        let pts_adjustment = reader.read_ticks_as_seconds(33)?;
        let cw_index = reader.read_hex(8)?;
        let tier = reader.read_hex(12)?;
        let command_length = reader.read_uint(12)? as u16;
        let command_type = reader.read_uint(8)? as u8;

        Ok(InfoSection {
            table_id,
            section_syntax_indicator,
            private_indicator,
            reserved,
            section_length,
            protocol_version,
            encrypted_packet,
            encryption_algorithm,
            pts_adjustment,
            cw_index,
            tier,
            command_length,
            command_type,
        })
    }

    /// Encodes the header in wire order. The table id is always written as
    /// the literal `0xfc` and the reserved bits as ones.
    pub(crate) fn encode(&self) -> Result<Vec<u8>, CueError> {
        let mut writer = BitWriter::new();
        writer.write_hex("0xfc", 8)?;
        writer.write_flag(self.section_syntax_indicator);
        writer.write_flag(self.private_indicator);
        writer.reserve(2);
        writer.write_uint(self.section_length as u64, 12);
        writer.write_uint(self.protocol_version as u64, 8);
        writer.write_flag(self.encrypted_packet);
        writer.write_uint(self.encryption_algorithm as u64, 6);
        writer.write_seconds_as_ticks(self.pts_adjustment, 33);
        writer.write_hex(&self.cw_index, 8)?;
        writer.write_hex(&self.tier, 12)?;
        writer.write_uint(self.command_length as u64, 12);
        writer.write_uint(self.command_type as u64, 8);
        Ok(writer.finish())
    }
}

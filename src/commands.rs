//! Splice commands.
//!
//! The operative instruction inside a cue: five command variants selected
//! by the `command_type` byte in the info section.

use crate::bit_reader::BitReader;
use crate::bit_writer::BitWriter;
use crate::CueError;

/// A splice time: an optional 33-bit PTS in seconds.
///
/// `pts` is `None` exactly when the wire `time_specified_flag` is zero, so
/// an unspecified time can never carry a stale value.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpliceTime {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub pts: Option<f64>,
}

impl SpliceTime {
    pub(crate) fn decode(reader: &mut BitReader) -> Result<SpliceTime, CueError> {
        let time_specified = reader.read_flag()?;
        let pts = if time_specified {
            reader.skip(6)?;
            Some(reader.read_ticks_as_seconds(33)?)
        } else {
            reader.skip(7)?;
            None
        };
        Ok(SpliceTime { pts })
    }

    pub(crate) fn encode(&self, writer: &mut BitWriter) {
        match self.pts {
            Some(pts) => {
                writer.write_flag(true);
                writer.reserve(6);
                writer.write_seconds_as_ticks(pts, 33);
            }
            None => {
                writer.write_flag(false);
                writer.reserve(7);
            }
        }
    }
}

/// Commercial break duration attached to a splice insert.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BreakDuration {
    /// When set, the break ends on its own after `duration` and no
    /// explicit CUE-IN is required.
    pub auto_return: bool,
    /// Break length in seconds.
    pub duration: f64,
}

impl BreakDuration {
    fn decode(reader: &mut BitReader) -> Result<BreakDuration, CueError> {
        let auto_return = reader.read_flag()?;
        reader.skip(6)?;
        let duration = reader.read_ticks_as_seconds(33)?;
        Ok(BreakDuration {
            auto_return,
            duration,
        })
    }

    fn encode(&self, writer: &mut BitWriter) {
        writer.write_flag(self.auto_return);
        writer.reserve(6);
        writer.write_seconds_as_ticks(self.duration, 33);
    }
}

/// Splice insert command (0x05): signals the start or end of an ad break.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpliceInsert {
    pub event_id: u32,
    pub cancel_indicator: bool,
    pub out_of_network: bool,
    pub program_splice: bool,
    pub duration_flag: bool,
    pub immediate_flag: bool,
    /// Present when the splice is program-level and not immediate.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub splice_time: Option<SpliceTime>,
    /// Present when `duration_flag` is set.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub break_duration: Option<BreakDuration>,
    pub unique_program_id: u16,
    pub avail_num: u8,
    pub avail_expected: u8,
}

/// Time signal command (0x06): a bare splice time, usually qualified by
/// segmentation descriptors.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TimeSignal {
    pub splice_time: SpliceTime,
}

/// Private command (0xff): an opaque payload behind a 32-bit identifier.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PrivateCommand {
    pub identifier: u32,
    pub payload: Vec<u8>,
}

/// The five splice command variants, keyed by `command_type`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpliceCommand {
    SpliceNull,
    SpliceInsert(SpliceInsert),
    TimeSignal(TimeSignal),
    BandwidthReservation,
    Private(PrivateCommand),
}

impl Default for SpliceCommand {
    fn default() -> Self {
        SpliceCommand::SpliceNull
    }
}

impl SpliceCommand {
    /// The wire `command_type` value for this variant.
    pub fn kind(&self) -> u8 {
        match self {
            SpliceCommand::SpliceNull => 0x00,
            SpliceCommand::SpliceInsert(_) => 0x05,
            SpliceCommand::TimeSignal(_) => 0x06,
            SpliceCommand::BandwidthReservation => 0x07,
            SpliceCommand::Private(_) => 0xFF,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SpliceCommand::SpliceNull => "Splice Null",
            SpliceCommand::SpliceInsert(_) => "Splice Insert",
            SpliceCommand::TimeSignal(_) => "Time Signal",
            SpliceCommand::BandwidthReservation => "Bandwidth Reservation",
            SpliceCommand::Private(_) => "Private Command",
        }
    }

    pub(crate) fn decode(
        command_type: u8,
        reader: &mut BitReader,
    ) -> Result<SpliceCommand, CueError> {
        match command_type {
            0x00 => Ok(SpliceCommand::SpliceNull),
            0x05 => Ok(SpliceCommand::SpliceInsert(decode_splice_insert(reader)?)),
            0x06 => Ok(SpliceCommand::TimeSignal(TimeSignal {
                splice_time: SpliceTime::decode(reader)?,
            })),
            0x07 => Ok(SpliceCommand::BandwidthReservation),
            0xFF => {
                let identifier = reader.read_uint(32)? as u32;
                let payload = reader.read_bytes(24)?;
                Ok(SpliceCommand::Private(PrivateCommand {
                    identifier,
                    payload,
                }))
            }
            other => Err(CueError::UnsupportedCommand(other)),
        }
    }

    /// Encodes the command payload.
    ///
    /// Only splice inserts and time signals have an encoder; every other
    /// variant yields an empty byte sequence. This is a documented
    /// limitation of the format support, not silent data loss: the cue
    /// encoder records the resulting zero command length in the header.
    pub(crate) fn encode(&self) -> Vec<u8> {
        match self {
            SpliceCommand::SpliceInsert(insert) => encode_splice_insert(insert),
            SpliceCommand::TimeSignal(signal) => {
                let mut writer = BitWriter::new();
                signal.splice_time.encode(&mut writer);
                writer.finish()
            }
            _ => Vec::new(),
        }
    }
}

fn decode_splice_insert(reader: &mut BitReader) -> Result<SpliceInsert, CueError> {
    let mut insert = SpliceInsert {
        event_id: reader.read_uint(32)? as u32,
        cancel_indicator: reader.read_flag()?,
        ..SpliceInsert::default()
    };
    reader.skip(7)?;
    if insert.cancel_indicator {
        return Ok(insert);
    }

    insert.out_of_network = reader.read_flag()?;
    insert.program_splice = reader.read_flag()?;
    insert.duration_flag = reader.read_flag()?;
    insert.immediate_flag = reader.read_flag()?;
    reader.skip(4)?;

    if insert.program_splice && !insert.immediate_flag {
        insert.splice_time = Some(SpliceTime::decode(reader)?);
    }
    if insert.duration_flag {
        insert.break_duration = Some(BreakDuration::decode(reader)?);
    }
    insert.unique_program_id = reader.read_uint(16)? as u16;
    insert.avail_num = reader.read_uint(8)? as u8;
    insert.avail_expected = reader.read_uint(8)? as u8;
    Ok(insert)
}

fn encode_splice_insert(insert: &SpliceInsert) -> Vec<u8> {
    let mut writer = BitWriter::new();
    writer.write_uint(insert.event_id as u64, 32);
    writer.write_flag(insert.cancel_indicator);
    writer.reserve(7);
    if insert.cancel_indicator {
        return writer.finish();
    }

    writer.write_flag(insert.out_of_network);
    writer.write_flag(insert.program_splice);
    writer.write_flag(insert.duration_flag);
    writer.write_flag(insert.immediate_flag);
    writer.reserve(4);

    if insert.program_splice && !insert.immediate_flag {
        insert.splice_time.clone().unwrap_or_default().encode(&mut writer);
    }
    if insert.duration_flag {
        if let Some(brk) = &insert.break_duration {
            brk.encode(&mut writer);
        }
    }
    writer.write_uint(insert.unique_program_id as u64, 16);
    writer.write_uint(insert.avail_num as u64, 8);
    writer.write_uint(insert.avail_expected as u64, 8);
    writer.finish()
}

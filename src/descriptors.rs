//! Splice descriptors.
//!
//! Optional, tagged extension blocks attached to a cue after the splice
//! command. Five tags are defined; anything else is carried through as raw
//! bytes. Every defined descriptor opens with the 4-byte ASCII identifier
//! `"CUEI"`.

use crate::bit_reader::BitReader;
use crate::bit_writer::BitWriter;
use crate::upid::Upid;
use crate::CueError;

/// Avail descriptor (tag 0x00).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AvailDescriptor {
    pub identifier: String,
    pub provider_avail_id: u32,
}

impl Default for AvailDescriptor {
    fn default() -> Self {
        AvailDescriptor {
            identifier: "CUEI".to_string(),
            provider_avail_id: 0,
        }
    }
}

/// DTMF descriptor (tag 0x01).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DtmfDescriptor {
    pub identifier: String,
    /// Seconds of pre-roll, in tenths.
    pub pre_roll: u8,
    pub dtmf_count: u8,
    pub dtmf_chars: String,
}

impl Default for DtmfDescriptor {
    fn default() -> Self {
        DtmfDescriptor {
            identifier: "CUEI".to_string(),
            pre_roll: 0,
            dtmf_count: 0,
            dtmf_chars: String::new(),
        }
    }
}

/// Time descriptor (tag 0x03): a TAI wall-clock stamp.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TimeDescriptor {
    pub identifier: String,
    pub tai_seconds: u64,
    pub tai_nanoseconds: u32,
    pub utc_offset: u16,
}

impl Default for TimeDescriptor {
    fn default() -> Self {
        TimeDescriptor {
            identifier: "CUEI".to_string(),
            tai_seconds: 0,
            tai_nanoseconds: 0,
            utc_offset: 0,
        }
    }
}

/// One audio service entry in an audio descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AudioComponent {
    pub component_tag: u8,
    /// ISO 639 language code packed into 24 bits.
    pub iso_code: u32,
    pub bitstream_mode: u8,
    pub channel_count: u8,
    pub full_service: bool,
}

/// Audio descriptor (tag 0x04).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AudioDescriptor {
    pub identifier: String,
    pub components: Vec<AudioComponent>,
}

impl Default for AudioDescriptor {
    fn default() -> Self {
        AudioDescriptor {
            identifier: "CUEI".to_string(),
            components: Vec::new(),
        }
    }
}

/// Per-component entry in a component-level segmentation descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SegmentationComponent {
    pub component_tag: u8,
    /// Offset from the splice point, in seconds.
    pub pts_offset: f64,
}

/// The 2-bit device restriction field of a delivery-restricted
/// segmentation descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceRestrictions {
    RestrictGroup0,
    RestrictGroup1,
    RestrictGroup2,
    None,
}

impl DeviceRestrictions {
    pub(crate) fn from_bits(bits: u8) -> DeviceRestrictions {
        match bits & 0x3 {
            0b00 => DeviceRestrictions::RestrictGroup0,
            0b01 => DeviceRestrictions::RestrictGroup1,
            0b10 => DeviceRestrictions::RestrictGroup2,
            _ => DeviceRestrictions::None,
        }
    }

    pub(crate) fn bits(self) -> u8 {
        match self {
            DeviceRestrictions::RestrictGroup0 => 0b00,
            DeviceRestrictions::RestrictGroup1 => 0b01,
            DeviceRestrictions::RestrictGroup2 => 0b10,
            DeviceRestrictions::None => 0b11,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            DeviceRestrictions::RestrictGroup0 => "Restrict Group 0",
            DeviceRestrictions::RestrictGroup1 => "Restrict Group 1",
            DeviceRestrictions::RestrictGroup2 => "Restrict Group 2",
            DeviceRestrictions::None => "No Restrictions",
        }
    }
}

/// Segmentation type ids that carry sub-segment numbering: the provider
/// and distributor placement / overlay placement opportunity starts.
const SUB_SEGMENT_TYPE_IDS: [u8; 4] = [0x34, 0x36, 0x38, 0x3A];

/// Segmentation descriptor (tag 0x02): the workhorse descriptor marking
/// content boundaries and ad opportunities.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SegmentationDescriptor {
    pub identifier: String,
    /// 32-bit event id as a hex string.
    pub event_id: String,
    pub cancel_indicator: bool,
    pub event_id_compliance: bool,
    pub program_segmentation: bool,
    pub duration_flag: bool,
    pub delivery_not_restricted: bool,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub web_delivery_allowed: Option<bool>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub no_regional_blackout: Option<bool>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub archive_allowed: Option<bool>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub device_restrictions: Option<DeviceRestrictions>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Vec::is_empty"))]
    pub components: Vec<SegmentationComponent>,
    /// Segment length in seconds, present when `duration_flag` is set.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub duration: Option<f64>,
    pub upid_type: u8,
    pub upid_length: u8,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub upid: Option<Upid>,
    pub segmentation_type_id: u8,
    /// Descriptive name for `segmentation_type_id`; informational only.
    pub segmentation_message: String,
    pub segment_num: u8,
    pub segments_expected: u8,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub sub_segment_num: Option<u8>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub sub_segments_expected: Option<u8>,
}

impl Default for SegmentationDescriptor {
    fn default() -> Self {
        SegmentationDescriptor {
            identifier: "CUEI".to_string(),
            event_id: "0x0".to_string(),
            cancel_indicator: false,
            event_id_compliance: true,
            program_segmentation: true,
            duration_flag: false,
            delivery_not_restricted: true,
            web_delivery_allowed: None,
            no_regional_blackout: None,
            archive_allowed: None,
            device_restrictions: None,
            components: Vec::new(),
            duration: None,
            upid_type: 0,
            upid_length: 0,
            upid: None,
            segmentation_type_id: 0,
            segmentation_message: String::new(),
            segment_num: 0,
            segments_expected: 0,
            sub_segment_num: None,
            sub_segments_expected: None,
        }
    }
}

impl SegmentationDescriptor {
    fn decode(reader: &mut BitReader) -> Result<SegmentationDescriptor, CueError> {
        let mut descriptor = SegmentationDescriptor {
            identifier: reader.read_ascii(32)?,
            event_id: reader.read_hex(32)?,
            cancel_indicator: reader.read_flag()?,
            event_id_compliance: reader.read_flag()?,
            ..SegmentationDescriptor::default()
        };
        reader.skip(6)?;
        if descriptor.cancel_indicator {
            return Ok(descriptor);
        }

        descriptor.program_segmentation = reader.read_flag()?;
        descriptor.duration_flag = reader.read_flag()?;
        descriptor.delivery_not_restricted = reader.read_flag()?;
        if !descriptor.delivery_not_restricted {
            descriptor.web_delivery_allowed = Some(reader.read_flag()?);
            descriptor.no_regional_blackout = Some(reader.read_flag()?);
            descriptor.archive_allowed = Some(reader.read_flag()?);
            descriptor.device_restrictions =
                Some(DeviceRestrictions::from_bits(reader.read_uint(2)? as u8));
        } else {
            reader.skip(5)?;
        }

        if !descriptor.program_segmentation {
            let component_count = reader.read_uint(8)?;
            for _ in 0..component_count {
                let component_tag = reader.read_uint(8)? as u8;
                reader.skip(7)?;
                let pts_offset = reader.read_ticks_as_seconds(33)?;
                descriptor.components.push(SegmentationComponent {
                    component_tag,
                    pts_offset,
                });
            }
        }

        if descriptor.duration_flag {
            descriptor.duration = Some(reader.read_ticks_as_seconds(40)?);
        }

        descriptor.upid_type = reader.read_uint(8)? as u8;
        descriptor.upid_length = reader.read_uint(8)? as u8;
        if descriptor.upid_length > 0 {
            descriptor.upid = Some(Upid::decode(
                reader,
                descriptor.upid_type,
                descriptor.upid_length,
            )?);
        }

        descriptor.segmentation_type_id = reader.read_uint(8)? as u8;
        descriptor.segmentation_message =
            segmentation_message(descriptor.segmentation_type_id).to_string();
        descriptor.segment_num = reader.read_uint(8)? as u8;
        descriptor.segments_expected = reader.read_uint(8)? as u8;
        if SUB_SEGMENT_TYPE_IDS.contains(&descriptor.segmentation_type_id) {
            descriptor.sub_segment_num = Some(reader.read_uint(8)? as u8);
            descriptor.sub_segments_expected = Some(reader.read_uint(8)? as u8);
        }
        Ok(descriptor)
    }

    fn encode(&self, writer: &mut BitWriter) -> Result<(), CueError> {
        writer.write_bytes(self.identifier.as_bytes());
        writer.write_hex(&self.event_id, 32)?;
        writer.write_flag(self.cancel_indicator);
        writer.write_flag(self.event_id_compliance);
        writer.reserve(6);
        if self.cancel_indicator {
            return Ok(());
        }

        writer.write_flag(self.program_segmentation);
        writer.write_flag(self.duration_flag);
        writer.write_flag(self.delivery_not_restricted);
        if !self.delivery_not_restricted {
            writer.write_flag(self.web_delivery_allowed.unwrap_or(true));
            writer.write_flag(self.no_regional_blackout.unwrap_or(true));
            writer.write_flag(self.archive_allowed.unwrap_or(true));
            let restrictions = self
                .device_restrictions
                .unwrap_or(DeviceRestrictions::None);
            writer.write_uint(restrictions.bits() as u64, 2);
        } else {
            writer.reserve(5);
        }

        if !self.program_segmentation {
            writer.write_uint(self.components.len() as u64, 8);
            for component in &self.components {
                writer.write_uint(component.component_tag as u64, 8);
                writer.reserve(7);
                writer.write_seconds_as_ticks(component.pts_offset, 33);
            }
        }

        if self.duration_flag {
            writer.write_seconds_as_ticks(self.duration.unwrap_or(0.0), 40);
        }

        writer.write_uint(self.upid_type as u64, 8);
        match &self.upid {
            Some(upid) => {
                let upid_len = upid.encoded_len(self.upid_length);
                writer.write_uint(upid_len as u64, 8);
                upid.encode(writer, upid_len)?;
            }
            None => writer.write_uint(0, 8),
        }

        writer.write_uint(self.segmentation_type_id as u64, 8);
        writer.write_uint(self.segment_num as u64, 8);
        writer.write_uint(self.segments_expected as u64, 8);
        if SUB_SEGMENT_TYPE_IDS.contains(&self.segmentation_type_id) {
            writer.write_uint(self.sub_segment_num.unwrap_or(0) as u64, 8);
            writer.write_uint(self.sub_segments_expected.unwrap_or(0) as u64, 8);
        }
        Ok(())
    }
}

/// A splice descriptor, keyed by its 1-byte tag.
///
/// Tags outside 0x00-0x04 are preserved verbatim in `Unknown` so they
/// survive a decode/encode round trip untouched.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpliceDescriptor {
    Avail(AvailDescriptor),
    Dtmf(DtmfDescriptor),
    Segmentation(SegmentationDescriptor),
    Time(TimeDescriptor),
    Audio(AudioDescriptor),
    Unknown { tag: u8, length: u8, data: Vec<u8> },
}

impl SpliceDescriptor {
    /// The wire tag for this descriptor.
    pub fn tag(&self) -> u8 {
        match self {
            SpliceDescriptor::Avail(_) => 0x00,
            SpliceDescriptor::Dtmf(_) => 0x01,
            SpliceDescriptor::Segmentation(_) => 0x02,
            SpliceDescriptor::Time(_) => 0x03,
            SpliceDescriptor::Audio(_) => 0x04,
            SpliceDescriptor::Unknown { tag, .. } => *tag,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SpliceDescriptor::Avail(_) => "Avail Descriptor",
            SpliceDescriptor::Dtmf(_) => "DTMF Descriptor",
            SpliceDescriptor::Segmentation(_) => "Segmentation Descriptor",
            SpliceDescriptor::Time(_) => "Time Descriptor",
            SpliceDescriptor::Audio(_) => "Audio Descriptor",
            SpliceDescriptor::Unknown { .. } => "Unknown Descriptor",
        }
    }

    /// Decodes one descriptor payload of exactly `length` bytes; the tag
    /// and length bytes themselves have already been consumed by the
    /// descriptor loop.
    pub(crate) fn decode(
        reader: &mut BitReader,
        tag: u8,
        length: u8,
    ) -> Result<SpliceDescriptor, CueError> {
        match tag {
            0x00 => Ok(SpliceDescriptor::Avail(AvailDescriptor {
                identifier: reader.read_ascii(32)?,
                provider_avail_id: reader.read_uint(32)? as u32,
            })),
            0x01 => {
                let identifier = reader.read_ascii(32)?;
                let pre_roll = reader.read_uint(8)? as u8;
                let dtmf_count = reader.read_uint(3)? as u8;
                let chars = reader.read_bytes(dtmf_count as usize)?;
                Ok(SpliceDescriptor::Dtmf(DtmfDescriptor {
                    identifier,
                    pre_roll,
                    dtmf_count,
                    dtmf_chars: String::from_utf8_lossy(&chars).into_owned(),
                }))
            }
            0x02 => Ok(SpliceDescriptor::Segmentation(
                SegmentationDescriptor::decode(reader)?,
            )),
            0x03 => Ok(SpliceDescriptor::Time(TimeDescriptor {
                identifier: reader.read_ascii(32)?,
                tai_seconds: reader.read_uint(48)?,
                tai_nanoseconds: reader.read_uint(32)? as u32,
                utc_offset: reader.read_uint(16)? as u16,
            })),
            0x04 => {
                let identifier = reader.read_ascii(32)?;
                let component_count = reader.read_uint(4)?;
                reader.skip(4)?;
                let mut components = Vec::new();
                for _ in 0..component_count {
                    components.push(AudioComponent {
                        component_tag: reader.read_uint(8)? as u8,
                        iso_code: reader.read_uint(24)? as u32,
                        bitstream_mode: reader.read_uint(3)? as u8,
                        channel_count: reader.read_uint(4)? as u8,
                        full_service: reader.read_flag()?,
                    });
                }
                Ok(SpliceDescriptor::Audio(AudioDescriptor {
                    identifier,
                    components,
                }))
            }
            _ => Ok(SpliceDescriptor::Unknown {
                tag,
                length,
                data: reader.read_bytes(length as usize)?,
            }),
        }
    }

    /// Encodes the descriptor payload, identifier included; the descriptor
    /// loop writes the tag and length bytes from the payload size.
    ///
    /// Avail, Segmentation and Unknown encode fully; DTMF, Time and Audio
    /// have no encoder and yield an empty payload, which the loop drops.
    /// A documented gap in format support, not silent corruption.
    pub(crate) fn encode_body(&self) -> Result<Vec<u8>, CueError> {
        match self {
            SpliceDescriptor::Avail(avail) => {
                let mut writer = BitWriter::new();
                writer.write_bytes(avail.identifier.as_bytes());
                writer.write_uint(avail.provider_avail_id as u64, 32);
                Ok(writer.finish())
            }
            SpliceDescriptor::Segmentation(segmentation) => {
                let mut writer = BitWriter::new();
                segmentation.encode(&mut writer)?;
                Ok(writer.finish())
            }
            SpliceDescriptor::Unknown { data, .. } => Ok(data.clone()),
            _ => Ok(Vec::new()),
        }
    }
}

/// Descriptive name for a segmentation type id. Informational only; the
/// numeric id is authoritative on the wire.
pub fn segmentation_message(type_id: u8) -> &'static str {
    match type_id {
        0x00 => "Not Indicated",
        0x01 => "Content Identification",
        0x10 => "Program Start",
        0x11 => "Program End",
        0x12 => "Program Early Termination",
        0x13 => "Program Breakaway",
        0x14 => "Program Resumption",
        0x15 => "Program Runover Planned",
        0x16 => "Program Runover Unplanned",
        0x17 => "Program Overlap Start",
        0x18 => "Program Blackout Override",
        0x19 => "Program Join",
        0x20 => "Chapter Start",
        0x21 => "Chapter End",
        0x22 => "Break Start",
        0x23 => "Break End",
        0x24 => "Opening Credit Start",
        0x25 => "Opening Credit End",
        0x26 => "Closing Credit Start",
        0x27 => "Closing Credit End",
        0x30 => "Provider Advertisement Start",
        0x31 => "Provider Advertisement End",
        0x32 => "Distributor Advertisement Start",
        0x33 => "Distributor Advertisement End",
        0x34 => "Provider Placement Opportunity Start",
        0x35 => "Provider Placement Opportunity End",
        0x36 => "Distributor Placement Opportunity Start",
        0x37 => "Distributor Placement Opportunity End",
        0x38 => "Provider Overlay Placement Opportunity Start",
        0x39 => "Provider Overlay Placement Opportunity End",
        0x3A => "Distributor Overlay Placement Opportunity Start",
        0x3B => "Distributor Overlay Placement Opportunity End",
        0x3C => "Provider Promo Start",
        0x3D => "Provider Promo End",
        0x3E => "Distributor Promo Start",
        0x3F => "Distributor Promo End",
        0x40 => "Unscheduled Event Start",
        0x41 => "Unscheduled Event End",
        0x42 => "Alternate Content Opportunity Start",
        0x43 => "Alternate Content Opportunity End",
        0x44 => "Provider Ad Block Start",
        0x45 => "Provider Ad Block End",
        0x46 => "Distributor Ad Block Start",
        0x47 => "Distributor Ad Block End",
        0x50 => "Network Start",
        0x51 => "Network End",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8], tag: u8) -> (SpliceDescriptor, usize) {
        let mut reader = BitReader::new(bytes);
        let descriptor = SpliceDescriptor::decode(&mut reader, tag, bytes.len() as u8).unwrap();
        (descriptor, reader.offset() / 8)
    }

    #[test]
    fn avail_round_trips() {
        let bytes = [
            0x43, 0x55, 0x45, 0x49, 0x00, 0x00, 0x01, 0x35,
        ];
        let (descriptor, _) = decode(&bytes, 0x00);
        let SpliceDescriptor::Avail(avail) = &descriptor else {
            panic!("expected an avail descriptor");
        };
        assert_eq!(avail.identifier, "CUEI");
        assert_eq!(avail.provider_avail_id, 309);
        assert_eq!(descriptor.encode_body().unwrap(), bytes);
    }

    #[test]
    fn dtmf_chars_follow_the_count() {
        // pre_roll 177, count 4, chars packed directly after the count bits.
        let mut bytes = vec![0x43, 0x55, 0x45, 0x49, 0xB1];
        // count in the top 3 bits, then four 8-bit chars, 5 bits of slack.
        let tail: u64 = ((4u64) << 37)
            | ((b'1' as u64) << 29)
            | ((b'2' as u64) << 21)
            | ((b'3' as u64) << 13)
            | ((b'4' as u64) << 5);
        bytes.extend_from_slice(&tail.to_be_bytes()[3..]);
        let (descriptor, _) = decode(&bytes, 0x01);
        let SpliceDescriptor::Dtmf(dtmf) = &descriptor else {
            panic!("expected a DTMF descriptor");
        };
        assert_eq!(dtmf.pre_roll, 177);
        assert_eq!(dtmf.dtmf_count, 4);
        assert_eq!(dtmf.dtmf_chars, "1234");
        // No DTMF encoder.
        assert!(descriptor.encode_body().unwrap().is_empty());
    }

    #[test]
    fn time_descriptor_fields() {
        let mut bytes = b"CUEI".to_vec();
        bytes.extend_from_slice(&[0x00, 0x00, 0x6B, 0x2E, 0x95, 0x81]); // tai seconds
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x2A]); // tai nanoseconds
        bytes.extend_from_slice(&[0x00, 0x25]); // utc offset
        let (descriptor, _) = decode(&bytes, 0x03);
        let SpliceDescriptor::Time(time) = &descriptor else {
            panic!("expected a time descriptor");
        };
        assert_eq!(time.tai_seconds, 0x6B2E_9581);
        assert_eq!(time.tai_nanoseconds, 42);
        assert_eq!(time.utc_offset, 37);
    }

    #[test]
    fn audio_components_unpack() {
        let mut bytes = b"CUEI".to_vec();
        bytes.push(0x1F); // one component + 4 reserved bits
        bytes.push(0x02); // component tag
        bytes.extend_from_slice(b"eng"); // iso code
        bytes.push(0b0100_1101); // bitstream mode 2, channels 6, full service
        let (descriptor, _) = decode(&bytes, 0x04);
        let SpliceDescriptor::Audio(audio) = &descriptor else {
            panic!("expected an audio descriptor");
        };
        assert_eq!(audio.components.len(), 1);
        let component = &audio.components[0];
        assert_eq!(component.component_tag, 2);
        assert_eq!(component.iso_code, 0x656E67);
        assert_eq!(component.bitstream_mode, 2);
        assert_eq!(component.channel_count, 6);
        assert!(component.full_service);
    }

    #[test]
    fn unknown_tags_pass_through() {
        let bytes = [0xDE, 0xAD, 0xBE, 0xEF, 0x01];
        let (descriptor, _) = decode(&bytes, 0xF0);
        assert_eq!(
            descriptor,
            SpliceDescriptor::Unknown {
                tag: 0xF0,
                length: 5,
                data: bytes.to_vec()
            }
        );
        assert_eq!(descriptor.encode_body().unwrap(), bytes);
    }

    // Synthetic segmentation descriptor with a MID UPID; type id 0x34 is in
    // the sub-segment set, 0x35 is not.
    const SEG_WITH_SUB: &[u8] = &[
        0x43, 0x55, 0x45, 0x49, 0x00, 0x00, 0x00, 0x01, 0x7F, 0x9F, 0x0D, 0x0F, 0x08, 0x08, 0x00,
        0x00, 0x00, 0x00, 0x2C, 0xB2, 0xD7, 0x9D, 0x0F, 0x03, 0x61, 0x62, 0x63, 0x34, 0x01, 0x02,
        0x03, 0x04,
    ];
    const SEG_WITHOUT_SUB: &[u8] = &[
        0x43, 0x55, 0x45, 0x49, 0x00, 0x00, 0x00, 0x01, 0x7F, 0x9F, 0x0D, 0x0F, 0x08, 0x08, 0x00,
        0x00, 0x00, 0x00, 0x2C, 0xB2, 0xD7, 0x9D, 0x0F, 0x03, 0x61, 0x62, 0x63, 0x35, 0x01, 0x02,
    ];

    #[test]
    fn segmentation_with_sub_segments() {
        let (descriptor, consumed) = decode(SEG_WITH_SUB, 0x02);
        assert_eq!(consumed, SEG_WITH_SUB.len());
        let SpliceDescriptor::Segmentation(seg) = &descriptor else {
            panic!("expected a segmentation descriptor");
        };
        assert_eq!(seg.event_id, "0x1");
        assert!(!seg.cancel_indicator);
        assert!(seg.program_segmentation);
        assert!(!seg.duration_flag);
        assert!(!seg.delivery_not_restricted);
        assert_eq!(seg.web_delivery_allowed, Some(true));
        assert_eq!(seg.no_regional_blackout, Some(true));
        assert_eq!(seg.archive_allowed, Some(true));
        assert_eq!(seg.device_restrictions, Some(DeviceRestrictions::None));
        assert_eq!(seg.upid_type, 0x0D);
        assert_eq!(seg.upid_length, 15);
        assert!(matches!(seg.upid, Some(Upid::Mid { .. })));
        assert_eq!(seg.segmentation_type_id, 0x34);
        assert_eq!(
            seg.segmentation_message,
            "Provider Placement Opportunity Start"
        );
        assert_eq!((seg.segment_num, seg.segments_expected), (1, 2));
        assert_eq!(seg.sub_segment_num, Some(3));
        assert_eq!(seg.sub_segments_expected, Some(4));
    }

    #[test]
    fn sub_segment_bytes_are_gated_by_type_id() {
        // Same descriptor with type id 0x35 consumes two fewer bytes and
        // leaves the sub-segment fields unset.
        let (descriptor, consumed) = decode(SEG_WITHOUT_SUB, 0x02);
        assert_eq!(consumed, SEG_WITH_SUB.len() - 2);
        let SpliceDescriptor::Segmentation(seg) = &descriptor else {
            panic!("expected a segmentation descriptor");
        };
        assert_eq!(seg.segmentation_type_id, 0x35);
        assert_eq!(seg.sub_segment_num, None);
        assert_eq!(seg.sub_segments_expected, None);
    }

    #[test]
    fn cancelled_segmentation_stops_after_the_event_id() {
        let bytes = [
            0x43, 0x55, 0x45, 0x49, 0x00, 0x00, 0x00, 0x09, 0xFF,
        ];
        let (descriptor, consumed) = decode(&bytes, 0x02);
        assert_eq!(consumed, bytes.len());
        let SpliceDescriptor::Segmentation(seg) = &descriptor else {
            panic!("expected a segmentation descriptor");
        };
        assert!(seg.cancel_indicator);
        assert_eq!(descriptor.encode_body().unwrap(), bytes);
    }

    #[test]
    fn restricted_segmentation_round_trips() {
        let (descriptor, _) = decode(SEG_WITH_SUB, 0x02);
        // MID payloads re-encode as reserved filler, so compare around it.
        let encoded = descriptor.encode_body().unwrap();
        assert_eq!(encoded.len(), SEG_WITH_SUB.len());
        assert_eq!(&encoded[..12], &SEG_WITH_SUB[..12]);
        assert_eq!(&encoded[27..], &SEG_WITH_SUB[27..]);
    }
}

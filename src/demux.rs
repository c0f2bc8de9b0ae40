//! MPEG transport-stream demultiplexing for SCTE-35.
//!
//! Walks 188-byte transport packets, learns the program layout from the
//! PAT and PMTs, tracks which PIDs carry signaling (stream types 0x06 and
//! 0x86), keeps per-program PCR/PTS, reassembles sections that span
//! packets, and decodes every completed section into a [`Cue`].

use std::collections::{HashMap, HashSet};

use crate::cue::Cue;
use crate::ticks_to_secs;

/// Size of one transport packet in bytes.
pub const PACKET_SIZE: usize = 188;

/// Stream types that carry SCTE-35 sections.
const SIGNALING_STREAM_TYPES: [u8; 2] = [0x06, 0x86];

/// Transport-stream context attached to a cue found by the demuxer:
/// where it came from and what the clocks read at that point.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PacketContext {
    /// Ordinal of the packet that completed the section.
    pub packet_number: usize,
    pub pid: u16,
    pub program: u16,
    /// Program clock reference, in seconds.
    pub pcr: f64,
    /// Latest presentation timestamp seen for the program, in seconds.
    pub pts: f64,
}

/// A single-stream demultiplexer.
///
/// All state is confined to one instance and mutated only through the feed
/// methods; parallel ingestion of several streams takes one demuxer each.
#[derive(Debug, Default)]
pub struct TsDemuxer {
    programs: Vec<u16>,
    pmt_pids: HashSet<u16>,
    pcr_pids: HashSet<u16>,
    signaling_pids: HashSet<u16>,
    pid_to_program: HashMap<u16, u16>,
    pid_to_stream_type: HashMap<u16, u8>,
    program_pcr: HashMap<u16, u64>,
    program_pts: HashMap<u16, u64>,
    /// Last payload seen per PID, for duplicate suppression on tables.
    last_payload: HashMap<u16, Vec<u8>>,
    /// Partially accumulated sections per PID.
    partial: HashMap<u16, Vec<u8>>,
    packet_count: usize,
}

impl TsDemuxer {
    pub fn new() -> TsDemuxer {
        TsDemuxer::default()
    }

    /// Feeds an arbitrary run of bytes, sliced into 188-byte packets.
    /// A trailing partial packet is discarded.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Cue> {
        let mut cues = Vec::new();
        for packet in data.chunks_exact(PACKET_SIZE) {
            if let Some(cue) = self.feed_packet(packet) {
                cues.push(cue);
            }
        }
        cues
    }

    /// Feeds one 188-byte packet; returns a cue when this packet completes
    /// a signaling section that decodes.
    pub fn feed_packet(&mut self, packet: &[u8]) -> Option<Cue> {
        if packet.len() != PACKET_SIZE || packet[0] != 0x47 {
            log::debug!("dropping malformed packet ({} bytes)", packet.len());
            return None;
        }
        self.packet_count += 1;

        let pid = parse_pid(packet[1], packet[2]);
        let payload = payload_of(packet).to_vec();

        if pid == 0 {
            self.parse_pat(&payload, pid);
        }
        if self.pmt_pids.contains(&pid) {
            self.parse_pmt(&payload, pid);
        }
        if self.pcr_pids.contains(&pid) {
            self.parse_pcr(packet, pid);
        }
        if pusi(packet) {
            self.parse_pts(&payload, pid);
        }
        if self.signaling_pids.contains(&pid) {
            return self.parse_signaling(&payload, pid);
        }
        None
    }

    /// Program numbers discovered so far.
    pub fn programs(&self) -> &[u16] {
        &self.programs
    }

    /// PIDs currently tracked as SCTE-35 carriers.
    pub fn signaling_pids(&self) -> impl Iterator<Item = u16> + '_ {
        self.signaling_pids.iter().copied()
    }

    /// Stream type recorded for an elementary PID, if any.
    pub fn stream_type(&self, pid: u16) -> Option<u8> {
        self.pid_to_stream_type.get(&pid).copied()
    }

    /// Current PCR for a program, in seconds.
    pub fn pcr(&self, program: u16) -> f64 {
        ticks_to_secs(self.program_pcr.get(&program).copied().unwrap_or(0))
    }

    /// Latest PTS for a program, in seconds.
    pub fn pts(&self, program: u16) -> f64 {
        ticks_to_secs(self.program_pts.get(&program).copied().unwrap_or(0))
    }

    fn parse_pat(&mut self, payload: &[u8], pid: u16) {
        if self.same_as_last(payload, pid) {
            return;
        }
        // Pointer byte and table id are both zero for the PAT.
        let section = self.assemble(payload, pid, &[0x00, 0x00]);
        if section.len() < 4 {
            return;
        }
        let section_length = parse_len(section[2], section[3]);
        if !self.section_done(&section, pid, section_length) {
            return;
        }

        // Program loop: 4-byte entries from byte 9 up to the CRC.
        let entries = section_length.saturating_sub(5);
        let mut idx = 9usize;
        let end = idx + entries.saturating_sub(4) as usize;
        while idx + 4 <= end && idx + 4 <= section.len() {
            let program = parse_program(section[idx], section[idx + 1]);
            if program > 0 {
                if !self.programs.contains(&program) {
                    self.programs.push(program);
                }
                self.pmt_pids
                    .insert(parse_pid(section[idx + 2], section[idx + 3]));
            }
            idx += 4;
        }
    }

    fn parse_pmt(&mut self, payload: &[u8], pid: u16) {
        if self.same_as_last(payload, pid) {
            return;
        }
        let section = self.assemble(payload, pid, &[0x02]);
        if section.len() < 3 {
            return;
        }
        let section_length = parse_len(section[1], section[2]);
        if !self.section_done(&section, pid, section_length) {
            return;
        }
        if section.len() < 12 {
            return;
        }

        let program = parse_program(section[3], section[4]);
        self.pcr_pids.insert(parse_pid(section[8], section[9]));
        let program_info_length = parse_len(section[10], section[11]) as usize;
        let idx = 12 + program_info_length;
        let stream_loop_length = (section_length as usize)
            .saturating_sub(9)
            .saturating_sub(program_info_length);
        self.parse_streams(&section, idx, stream_loop_length, program);
    }

    fn parse_streams(&mut self, section: &[u8], mut idx: usize, loop_length: usize, program: u16) {
        // 5 fixed bytes per entry plus that entry's descriptor loop.
        let end = (idx + loop_length).saturating_sub(5);
        while idx < end && idx + 5 <= section.len() {
            let stream_type = section[idx];
            let elementary_pid = parse_pid(section[idx + 1], section[idx + 2]);
            let es_info_length = parse_len(section[idx + 3], section[idx + 4]) as usize;
            idx += 5 + es_info_length;

            self.pid_to_program.insert(elementary_pid, program);
            self.pid_to_stream_type.insert(elementary_pid, stream_type);
            if SIGNALING_STREAM_TYPES.contains(&stream_type) {
                self.signaling_pids.insert(elementary_pid);
            }
        }
    }

    fn parse_pcr(&mut self, packet: &[u8], pid: u16) {
        // PCR lives in the adaptation field: flag byte, then a 33-bit base.
        let has_adaptation = packet[3] & 0x20 == 0x20;
        if !has_adaptation || packet[4] < 7 || packet[5] & 0x10 != 0x10 {
            return;
        }
        let pcr_base = (packet[6] as u64) << 25
            | (packet[7] as u64) << 17
            | (packet[8] as u64) << 9
            | (packet[9] as u64) << 1
            | (packet[10] as u64) >> 7;
        if let Some(&program) = self.pid_to_program.get(&pid) {
            self.program_pcr.insert(program, pcr_base);
        }
    }

    fn parse_pts(&mut self, payload: &[u8], pid: u16) {
        // Only PES payloads carry a PTS; table sections also arrive with
        // the PUSI bit set, so require the PES start code.
        if payload.len() < 14 || !payload.starts_with(&[0x00, 0x00, 0x01]) {
            return;
        }
        if payload[7] & 0x80 != 0x80 {
            return;
        }
        let Some(&program) = self.pid_to_program.get(&pid) else {
            return;
        };
        let pts = ((payload[9] & 0x0E) as u64) << 29
            | (payload[10] as u64) << 22
            | ((payload[11] >> 1) as u64) << 15
            | (payload[12] as u64) << 7
            | (payload[13] as u64) >> 1;
        self.program_pts.insert(program, pts);
    }

    fn parse_signaling(&mut self, payload: &[u8], pid: u16) -> Option<Cue> {
        // Strip any PES wrapper ahead of the section: sections start at the
        // 0xFC table id, and the byte after it is 0x30 for every section
        // short enough to matter here.
        let section = self.assemble(payload, pid, &[0xFC, 0x30]);
        if section.is_empty() {
            self.signaling_pids.remove(&pid);
            return None;
        }
        if section.len() < 3 {
            self.partial.insert(pid, section);
            return None;
        }
        let section_length = parse_len(section[1], section[2]);
        if !self.section_done(&section, pid, section_length) {
            return None;
        }

        match Cue::decode(&section) {
            Ok(mut cue) => {
                cue.packet = Some(self.context(pid));
                Some(cue)
            }
            Err(err) => {
                log::warn!("failed to decode section on pid {pid}: {err}");
                self.signaling_pids.remove(&pid);
                None
            }
        }
    }

    /// Prepends any pending partial payload for this PID and aligns the
    /// result to `marker`, discarding whatever precedes it.
    fn assemble(&mut self, payload: &[u8], pid: u16, marker: &[u8]) -> Vec<u8> {
        let mut combined = self.partial.remove(&pid).unwrap_or_default();
        combined.extend_from_slice(payload);
        match combined
            .windows(marker.len())
            .position(|window| window == marker)
        {
            Some(idx) => combined.split_off(idx),
            None => Vec::new(),
        }
    }

    /// True once `section` holds all `section_length + 3` bytes; otherwise
    /// the bytes are parked for the next packet on this PID.
    fn section_done(&mut self, section: &[u8], pid: u16, section_length: u16) -> bool {
        if section_length as usize + 3 > section.len() {
            self.partial.insert(pid, section.to_vec());
            return false;
        }
        self.partial.remove(&pid);
        true
    }

    /// True when this payload is byte-identical to the previous one on the
    /// same PID. Purely a coalescing optimization for repeated tables.
    fn same_as_last(&mut self, payload: &[u8], pid: u16) -> bool {
        if self
            .last_payload
            .get(&pid)
            .is_some_and(|last| last == payload)
        {
            return true;
        }
        self.last_payload.insert(pid, payload.to_vec());
        false
    }

    fn context(&self, pid: u16) -> PacketContext {
        let program = self.pid_to_program.get(&pid).copied().unwrap_or(0);
        PacketContext {
            packet_number: self.packet_count,
            pid,
            program,
            pcr: self.pcr(program),
            pts: self.pts(program),
        }
    }
}

/// 13-bit PID from the two header bytes that carry it.
fn parse_pid(byte1: u8, byte2: u8) -> u16 {
    (byte1 as u16 & 0x1F) << 8 | byte2 as u16
}

/// 12-bit section length from its two bytes.
fn parse_len(byte1: u8, byte2: u8) -> u16 {
    (byte1 as u16 & 0x0F) << 8 | byte2 as u16
}

fn parse_program(byte1: u8, byte2: u8) -> u16 {
    (byte1 as u16) << 8 | byte2 as u16
}

fn pusi(packet: &[u8]) -> bool {
    packet[1] & 0x40 == 0x40
}

/// Payload starts after the 4-byte header and the adaptation field when
/// one is present.
fn payload_of(packet: &[u8]) -> &[u8] {
    let mut head = 4;
    if packet[3] & 0x20 == 0x20 {
        head += 1 + packet[4] as usize;
    }
    &packet[head.min(PACKET_SIZE)..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{BreakDuration, SpliceCommand, SpliceInsert, SpliceTime};

    const SIGNALING_PID: u16 = 0x21;
    const VIDEO_PID: u16 = 0x22;
    const PMT_PID: u16 = 0x20;

    fn packet(pid: u16, pusi: bool, payload: &[u8]) -> Vec<u8> {
        let mut pkt = vec![0xFF; PACKET_SIZE];
        pkt[0] = 0x47;
        pkt[1] = (pid >> 8) as u8 | if pusi { 0x40 } else { 0x00 };
        pkt[2] = pid as u8;
        pkt[3] = 0x10;
        pkt[4..4 + payload.len()].copy_from_slice(payload);
        pkt
    }

    fn pat_packet() -> Vec<u8> {
        // One program (1) mapped to the PMT PID.
        let payload = [
            0x00, // pointer
            0x00, 0xB0, 0x0D, // table id + section length 13
            0x00, 0x01, 0xC1, 0x00, 0x00, // tsid, version, section numbers
            0x00, 0x01, 0xE0, PMT_PID as u8, // program 1 -> PMT PID
            0x00, 0x00, 0x00, 0x00, // crc (not checked)
        ];
        packet(0, true, &payload)
    }

    fn pmt_packet() -> Vec<u8> {
        // PCR on the video PID; one video stream and one 0x86 signaling
        // stream.
        let payload = [
            0x00, // pointer
            0x02, 0xB0, 0x17, // table id + section length 23
            0x00, 0x01, 0xC1, 0x00, 0x00, // program 1, version, sections
            0xE0, VIDEO_PID as u8, // pcr pid
            0xF0, 0x00, // program info length 0
            0x1B, 0xE0, VIDEO_PID as u8, 0xF0, 0x00, // H.264 on video pid
            0x86, 0xE0, SIGNALING_PID as u8, 0xF0, 0x00, // SCTE-35
            0x00, 0x00, 0x00, 0x00, // crc (not checked)
        ];
        packet(PMT_PID, true, &payload)
    }

    /// A packet whose adaptation field is stuffed so the payload holds
    /// exactly `payload`, the way a section fragment shorter than 184
    /// bytes shows up in a real stream.
    fn stuffed_packet(pid: u16, pusi: bool, payload: &[u8]) -> Vec<u8> {
        let adaptation_length = (PACKET_SIZE - 5 - payload.len()) as u8;
        let mut pkt = vec![0xFF; PACKET_SIZE];
        pkt[0] = 0x47;
        pkt[1] = (pid >> 8) as u8 | if pusi { 0x40 } else { 0x00 };
        pkt[2] = pid as u8;
        pkt[3] = 0x30; // adaptation field + payload
        pkt[4] = adaptation_length;
        pkt[5] = 0x00; // no adaptation flags, rest is stuffing
        let start = PACKET_SIZE - payload.len();
        pkt[start..].copy_from_slice(payload);
        pkt
    }

    fn pcr_packet(base: u64) -> Vec<u8> {
        let mut pkt = vec![0xFF; PACKET_SIZE];
        pkt[0] = 0x47;
        pkt[1] = (VIDEO_PID >> 8) as u8;
        pkt[2] = VIDEO_PID as u8;
        pkt[3] = 0x20; // adaptation field only
        pkt[4] = 183;
        pkt[5] = 0x10; // PCR flag
        pkt[6] = (base >> 25) as u8;
        pkt[7] = (base >> 17) as u8;
        pkt[8] = (base >> 9) as u8;
        pkt[9] = (base >> 1) as u8;
        pkt[10] = ((base & 1) as u8) << 7;
        pkt
    }

    fn pes_packet(pts: u64) -> Vec<u8> {
        let mut payload = vec![0x00, 0x00, 0x01, 0xE0, 0x00, 0x00, 0x80, 0x80, 0x05];
        payload.push(0x21 | (((pts >> 29) as u8) & 0x0E));
        payload.push((pts >> 22) as u8);
        payload.push((((pts >> 15) as u8) << 1) | 0x01);
        payload.push((pts >> 7) as u8);
        payload.push(((pts as u8) << 1) | 0x01);
        packet(VIDEO_PID, true, &payload)
    }

    fn forty_byte_section() -> Vec<u8> {
        let mut cue = Cue {
            command: SpliceCommand::SpliceInsert(SpliceInsert {
                event_id: 5690,
                out_of_network: true,
                program_splice: true,
                duration_flag: true,
                splice_time: Some(SpliceTime {
                    pts: Some(21514.559088),
                }),
                break_duration: Some(BreakDuration {
                    auto_return: true,
                    duration: 60.293566,
                }),
                unique_program_id: 1,
                ..SpliceInsert::default()
            }),
            ..Cue::default()
        };
        let section = cue.encode().unwrap();
        assert_eq!(section.len(), 40);
        section
    }

    fn primed_demuxer() -> TsDemuxer {
        let mut demuxer = TsDemuxer::new();
        assert!(demuxer.feed_packet(&pat_packet()).is_none());
        assert!(demuxer.feed_packet(&pmt_packet()).is_none());
        demuxer
    }

    #[test]
    fn pat_and_pmt_register_the_signaling_pid() {
        let demuxer = primed_demuxer();
        assert_eq!(demuxer.programs(), &[1]);
        assert_eq!(demuxer.stream_type(SIGNALING_PID), Some(0x86));
        assert_eq!(demuxer.stream_type(VIDEO_PID), Some(0x1B));
        assert!(demuxer.signaling_pids().any(|pid| pid == SIGNALING_PID));
        assert!(!demuxer.signaling_pids().any(|pid| pid == VIDEO_PID));
    }

    #[test]
    fn split_section_yields_one_cue_after_the_second_packet() {
        let mut demuxer = primed_demuxer();
        let section = forty_byte_section();

        let mut first = vec![0x00]; // pointer byte
        first.extend_from_slice(&section[..20]);
        assert!(
            demuxer
                .feed_packet(&stuffed_packet(SIGNALING_PID, true, &first))
                .is_none()
        );

        let cue = demuxer
            .feed_packet(&packet(SIGNALING_PID, false, &section[20..]))
            .expect("second packet completes the section");
        let SpliceCommand::SpliceInsert(insert) = &cue.command else {
            panic!("expected a splice insert");
        };
        assert_eq!(insert.event_id, 5690);
        let context = cue.packet.as_ref().unwrap();
        assert_eq!(context.pid, SIGNALING_PID);
        assert_eq!(context.program, 1);
        assert_eq!(context.packet_number, 4);
    }

    #[test]
    fn whole_section_in_one_packet_decodes_immediately() {
        let mut demuxer = primed_demuxer();
        let section = forty_byte_section();
        let mut payload = vec![0x00];
        payload.extend_from_slice(&section);
        let cues = demuxer.feed(&packet(SIGNALING_PID, true, &payload));
        assert_eq!(cues.len(), 1);
    }

    #[test]
    fn non_signaling_pids_produce_no_cues() {
        let mut demuxer = primed_demuxer();
        let section = forty_byte_section();
        let mut payload = vec![0x00];
        payload.extend_from_slice(&section);
        // Same bytes, but on a PID the PMT never flagged.
        assert!(demuxer.feed_packet(&packet(0x23, true, &payload)).is_none());
    }

    #[test]
    fn clocks_flow_into_the_packet_context() {
        let mut demuxer = primed_demuxer();
        assert!(demuxer.feed_packet(&pcr_packet(2_700_000)).is_none());
        assert!(demuxer.feed_packet(&pes_packet(90_000 * 45)).is_none());
        assert_eq!(demuxer.pcr(1), 30.0);
        assert_eq!(demuxer.pts(1), 45.0);

        let section = forty_byte_section();
        let mut payload = vec![0x00];
        payload.extend_from_slice(&section);
        let cue = demuxer
            .feed_packet(&packet(SIGNALING_PID, true, &payload))
            .unwrap();
        let context = cue.packet.as_ref().unwrap();
        assert_eq!(context.pcr, 30.0);
        assert_eq!(context.pts, 45.0);
    }

    #[test]
    fn duplicate_tables_are_coalesced() {
        let mut demuxer = primed_demuxer();
        // Feeding identical PAT/PMT packets again is a no-op.
        assert!(demuxer.feed_packet(&pat_packet()).is_none());
        assert!(demuxer.feed_packet(&pmt_packet()).is_none());
        assert_eq!(demuxer.programs(), &[1]);
    }

    #[test]
    fn undecodable_section_reports_and_deregisters() {
        let mut demuxer = primed_demuxer();
        // A section-shaped payload that is not a splice info section:
        // correct marker, but the protocol version byte is wrong.
        let mut bogus = vec![0x00, 0xFC, 0x30, 0x0B, 0x07];
        bogus.extend_from_slice(&[0x00; 10]);
        assert!(demuxer.feed_packet(&packet(SIGNALING_PID, true, &bogus)).is_none());
        assert!(!demuxer.signaling_pids().any(|pid| pid == SIGNALING_PID));
    }

    #[test]
    fn short_and_unsynced_packets_are_dropped() {
        let mut demuxer = TsDemuxer::new();
        assert!(demuxer.feed_packet(&[0x47, 0x00]).is_none());
        let mut pkt = packet(0, true, &[0x00]);
        pkt[0] = 0x00;
        assert!(demuxer.feed_packet(&pkt).is_none());
        assert!(demuxer.feed(&[0xAB; 100]).is_empty());
    }
}

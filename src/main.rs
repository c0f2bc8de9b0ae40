use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use cuestream::{Cue, TsDemuxer};

/// Decode SCTE-35 cues from an encoded string or an MPEG-TS capture and
/// print them as JSON.
#[derive(Parser)]
#[command(name = "cuestream", version)]
struct Args {
    /// A base64 or 0x-prefixed hex encoded cue
    cue: Option<String>,

    /// Demux a transport-stream file and print every cue found
    #[arg(long, value_name = "FILE", conflicts_with = "cue")]
    ts: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    match (args.cue, args.ts) {
        (Some(cue), None) => decode_one(&cue),
        (None, Some(path)) => demux_file(&path),
        _ => {
            eprintln!("provide an encoded cue or --ts <FILE>; see --help");
            process::exit(2);
        }
    }
}

fn decode_one(encoded: &str) {
    let decoded = if encoded.starts_with("0x") || encoded.starts_with("0X") {
        Cue::decode_hex(encoded)
    } else {
        Cue::decode_base64(encoded)
    };

    match decoded.and_then(|cue| cue.to_json()) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("error decoding cue: {err}");
            process::exit(1);
        }
    }
}

fn demux_file(path: &PathBuf) {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("error opening {}: {err}", path.display());
            process::exit(1);
        }
    };

    let mut demuxer = TsDemuxer::new();
    // Read in packet-aligned chunks so no packet straddles two reads.
    let mut buffer = vec![0u8; 188 * 16384];
    loop {
        let read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) => {
                eprintln!("error reading {}: {err}", path.display());
                process::exit(1);
            }
        };
        for cue in demuxer.feed(&buffer[..read]) {
            match cue.to_json() {
                Ok(json) => println!("{json}"),
                Err(err) => eprintln!("error rendering cue: {err}"),
            }
        }
    }
}

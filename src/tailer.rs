//! EVE log tailing: the event record shape the engine consumes, and a reader
//! that starts at the current end of the log and surfaces complete lines as
//! the sensor appends them.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::categories::TcpFlags;
use crate::error::Result;

/// Flow-level counters and termination context from the EVE `flow` object.
/// Absent counters parse as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowInfo {
    #[serde(default)]
    pub bytes_toserver: u64,
    #[serde(default)]
    pub bytes_toclient: u64,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// One decoded EVE record. Only the fields the deriver consumes are kept;
/// anything else on the line is ignored. A line without `event_type` does
/// not decode and is treated as malformed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowEvent {
    pub event_type: String,
    #[serde(default)]
    pub src_ip: Option<String>,
    #[serde(default)]
    pub dest_port: Option<u16>,
    #[serde(default)]
    pub proto: Option<String>,
    #[serde(default)]
    pub flow: FlowInfo,
    #[serde(default)]
    pub tcp: TcpFlags,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl FlowEvent {
    /// Decode one log line.
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

/// Tails the append-only EVE log. History written before open is skipped; a
/// line is surfaced only once its trailing newline has been written, so a
/// record mid-append is never parsed.
//
// TODO: detect truncation and reopen once sensor-side log rotation is in the
// deployment picture.
pub struct EveTailer {
    reader: BufReader<File>,
    path: PathBuf,
    pending: String,
}

impl EveTailer {
    /// Open the log and seek to its current end. A missing file is a fatal
    /// startup error, not something to wait out.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        file.seek(SeekFrom::End(0))?;
        Ok(Self {
            reader: BufReader::new(file),
            path,
            pending: String::new(),
        })
    }

    /// Path this tailer reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next complete appended line, without its newline. `Ok(None)` means no
    /// complete line is available yet; partial data stays buffered until its
    /// newline arrives.
    pub fn poll_line(&mut self) -> io::Result<Option<String>> {
        let read = self.reader.read_line(&mut self.pending)?;
        if read == 0 || !self.pending.ends_with('\n') {
            return Ok(None);
        }
        let mut line = std::mem::take(&mut self.pending);
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_flow_record() {
        let line = r#"{"event_type":"flow","src_ip":"10.0.0.1","dest_port":80,"proto":"TCP","flow":{"bytes_toserver":120,"state":"established"},"tcp":{"syn":true,"ack":true}}"#;
        let event = FlowEvent::parse(line).unwrap();
        assert_eq!(event.event_type, "flow");
        assert_eq!(event.src_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(event.dest_port, Some(80));
        assert_eq!(event.flow.bytes_toserver, 120);
        assert_eq!(event.flow.bytes_toclient, 0);
        assert_eq!(event.flow.state.as_deref(), Some("established"));
        assert!(event.tcp.syn && event.tcp.ack);
        assert!(!event.tcp.rst);
    }

    #[test]
    fn absent_objects_default() {
        let event = FlowEvent::parse(r#"{"event_type":"flow"}"#).unwrap();
        assert!(event.src_ip.is_none());
        assert!(event.dest_port.is_none());
        assert_eq!(event.flow, FlowInfo::default());
        assert!(event.tcp.none_set());
    }

    #[test]
    fn missing_event_type_is_malformed() {
        assert!(FlowEvent::parse(r#"{"src_ip":"10.0.0.1"}"#).is_err());
        assert!(FlowEvent::parse("not json").is_err());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let line = r#"{"event_type":"flow","src_ip":"10.0.0.1","app_proto":"http","flow_id":123456}"#;
        assert!(FlowEvent::parse(line).is_ok());
    }
}

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::unbounded_channel;
use tokio::task;

use super::{CapEvent, CapEventReceiver, CapEventSender};
use crate::traffic::protocols::ProtocolNames;
use crate::traffic::{NodeId, PacketEvent};

/// One packet as written by the decoder.
#[derive(Deserialize, Debug)]
struct PacketLine {
    src: NodeId,
    dst: NodeId,
    size: u32,
    #[serde(default)]
    timestamp_us: Option<u64>,
    #[serde(default)]
    protocols: Vec<String>,
}

/// A resolver reporting a name for a node.
#[derive(Deserialize, Debug)]
struct NameLine {
    node: NodeId,
    name: String,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum FeedLine {
    Packet(PacketLine),
    Name(NameLine),
}

/// Parses one feed line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<CapEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let parsed: FeedLine =
        serde_json::from_str(line).with_context(|| format!("Malformed feed line: {}", line))?;
    let event = match parsed {
        FeedLine::Packet(p) => {
            let timestamp = match p.timestamp_us {
                Some(us) => UNIX_EPOCH + Duration::from_micros(us),
                None => SystemTime::now(),
            };
            CapEvent::Packet(PacketEvent::new(
                p.src,
                p.dst,
                p.size,
                timestamp,
                ProtocolNames::from_stack(p.protocols.as_slice()),
            ))
        }
        FeedLine::Name(n) => CapEvent::NameResolved(n.node, n.name),
    };
    Ok(Some(event))
}

/// Reads classified packet events, one JSON object per line, from a file or
/// stdin and forwards them to the aggregation loop.
pub struct PacketSource {
    input: Option<PathBuf>,
    sender: CapEventSender,
}

impl PacketSource {
    pub fn new(input: Option<PathBuf>) -> (Self, CapEventReceiver) {
        let (sender, receiver) = unbounded_channel();
        (PacketSource { input, sender }, receiver)
    }

    /// Spawns the reading task. `EndOfFeed` is sent when input runs out.
    pub fn start_capture_loop(self) -> task::JoinHandle<()> {
        tokio::spawn(async move {
            let result = match &self.input {
                Some(path) => {
                    info!("Reading packet events from {}", path.display());
                    match tokio::fs::File::open(path).await {
                        Ok(file) => forward_lines(BufReader::new(file), &self.sender).await,
                        Err(e) => Err(e).with_context(|| format!("Failed to open {}", path.display())),
                    }
                }
                None => {
                    info!("Reading packet events from stdin");
                    forward_lines(BufReader::new(tokio::io::stdin()), &self.sender).await
                }
            };
            match result {
                Ok(count) => info!("Event feed finished after {} events", count),
                Err(e) => error!("Event feed failed: {:#}", e),
            }
            let _ = self.sender.send(CapEvent::EndOfFeed);
        })
    }
}

/// Forwards every parseable line; malformed lines are logged and skipped.
/// Returns the number of events forwarded.
pub async fn forward_lines<R>(reader: R, sender: &CapEventSender) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut count = 0;
    let mut line_no = 0;
    while let Some(line) = lines.next_line().await.context("Failed to read event feed")? {
        line_no += 1;
        match parse_line(&line) {
            Ok(Some(event)) => {
                if sender.send(event).is_err() {
                    // Receiver has been dropped
                    warn!("Aggregator gone, stopping event feed");
                    break;
                }
                count += 1;
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping line {}: {:#}", line_no, e),
        }
    }
    Ok(count)
}

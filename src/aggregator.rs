use std::fs;
use std::time::SystemTime;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use tokio::time;

use crate::capture::{CapEvent, CapEventReceiver};
use crate::config::ReportConfig;
use crate::traffic::{EngineState, EvictionReport, PacketEvent, TrafficSnapshot};

/// Where eviction passes take their notion of "now" from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// Wall clock, never behind the newest packet.
    Wall,
    /// Timestamp of the newest packet. Used when replaying a recorded feed.
    Packets,
}

/// Owns the engine and drives it from the event feed and the refresh timer.
pub struct Aggregator {
    receiver: CapEventReceiver,
    engine: EngineState,
    report: ReportConfig,
    clock: Clock,
    mismatched: u64,
}

impl Aggregator {
    pub fn new(
        receiver: CapEventReceiver,
        engine: EngineState,
        report: ReportConfig,
        clock: Clock,
    ) -> Self {
        Aggregator {
            receiver,
            engine,
            report,
            clock,
            mismatched: 0,
        }
    }

    pub fn engine(&self) -> &EngineState {
        &self.engine
    }

    /// Returns false once the feed has signalled its end.
    pub fn handle_event(&mut self, event: CapEvent) -> bool {
        match event {
            CapEvent::Packet(packet) => {
                self.handle_packet(packet);
                true
            }
            CapEvent::NameResolved(id, name) => {
                if !self.engine.update_display_name(&id, &name) {
                    debug!("Name {} for unknown node {}", name, id);
                }
                true
            }
            CapEvent::EndOfFeed => false,
        }
    }

    fn handle_packet(&mut self, packet: PacketEvent) {
        let mode = self.engine.config().mode;
        if packet.src.mode() != mode || packet.dst.mode() != mode {
            if self.mismatched == 0 {
                warn!(
                    "Dropping packets whose addresses do not match capture mode {}: {} -> {}",
                    mode, packet.src, packet.dst
                );
            }
            self.mismatched += 1;
            return;
        }
        self.engine.ingest(packet);
    }

    fn tick_time(&self) -> SystemTime {
        match self.clock {
            Clock::Wall => SystemTime::now().max(self.engine.now()),
            Clock::Packets => self.engine.now(),
        }
    }

    pub fn evict(&mut self) -> EvictionReport {
        let now = self.tick_time();
        self.engine.run_eviction(now)
    }

    /// Writes the current catalogs to the export path, or stdout.
    pub fn write_snapshot(&self) -> Result<()> {
        let json = TrafficSnapshot::capture(&self.engine)
            .to_json()
            .context("Failed to serialize snapshot")?;
        match &self.report.export {
            Some(path) => fs::write(path, json)
                .with_context(|| format!("Failed to write snapshot to {}", path.display()))?,
            None => println!("{}", json),
        }
        Ok(())
    }

    pub async fn run(mut self) -> Result<EngineState> {
        self.process().await;
        self.shutdown()
    }

    /// Serves events and timers until the feed ends or Ctrl-C. Periodic
    /// snapshot failures are logged and the loop carries on.
    pub async fn process(&mut self) {
        let refresh_period = self.engine.config().refresh_period;
        let report_enabled = !self.report.interval.is_zero();
        let mut refresh = time::interval(refresh_period);
        let mut report = time::interval(if report_enabled {
            self.report.interval
        } else {
            refresh_period
        });

        loop {
            tokio::select! {
                event = self.receiver.recv() => match event {
                    Some(event) => {
                        if !self.handle_event(event) {
                            info!("End of event feed");
                            break;
                        }
                    }
                    None => {
                        info!("Event channel closed");
                        break;
                    }
                },
                _ = refresh.tick() => {
                    self.evict();
                },
                _ = report.tick(), if report_enabled => {
                    if let Err(e) = self.write_snapshot() {
                        error!("Periodic snapshot failed: {:#}", e);
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl-C");
                    break;
                },
            }
        }
    }

    /// Final pass and snapshot, then a stop pass that releases every entity.
    pub fn shutdown(mut self) -> Result<EngineState> {
        let report = self.evict();
        info!(
            "Ingested {} packets: {} nodes, {} links",
            self.engine.ingested(),
            report.nodes_left,
            report.links_left
        );
        if self.mismatched > 0 {
            warn!("{} packets dropped for capture mode mismatch", self.mismatched);
        }
        self.write_snapshot()?;

        self.engine.stop();
        let report = self.evict();
        debug!("Released everything: {:?}", report);
        Ok(self.engine)
    }
}

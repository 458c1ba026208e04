//! Cycle-log download sequencer.
//!
//! The charger stores one log per (battery, cycle) on its SD card. A download
//! is a request/response exchange: send the query command, then collect the
//! `DataFrame1`/`DataFrame2` pairs it streams back until the device signals
//! end-of-data. Telemetry unrelated to the download keeps flowing during the
//! exchange and is forwarded to the sink as usual.

use std::time::{Duration, Instant, SystemTime};

use crate::command::Command;
use crate::connection::Charger;
use crate::error::Error;
use crate::frame::Frame;
use crate::protocol::MessageKind;
use crate::record::{ChargeFaults, Record, Telemetry};
use crate::sink::Sink;
use crate::transport::Transport;

/// Interval between read polls while waiting for download frames.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Safety cap on rows per download; a device that never sends the end-of-data
/// marker cannot grow the buffer without bound.
pub const MAX_DOWNLOAD_ROWS: usize = 8192;

/// One row of a downloaded cycle log.
///
/// `DataFrame1` opens the row; the matching `DataFrame2` fills in the second
/// half. Rows whose second half never arrived carry `None` there, matching
/// the `--` placeholders in the legacy exports.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleRow {
    pub timestamp: SystemTime,
    pub charge_voltage: f64,
    pub charge_current: f64,
    pub rel_time: u16,
    pub faults: ChargeFaults,
    pub set_c_rate1: Option<f64>,
    pub set_c_rate2: Option<f64>,
    pub max_volta_temp: Option<f64>,
    pub avg_volta_temp: Option<f64>,
}

/// A finished (battery, cycle) download.
///
/// Owned by the sequencer while it accumulates; handed to the sink and the
/// caller only once complete. A failed download is discarded, never delivered
/// partially.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleDownload {
    pub battery_id: u16,
    pub cycle_number: u16,
    pub rows: Vec<CycleRow>,
}

/// End-of-data marker: a DataFrame1 whose four payload words are all 0xFFFF.
fn is_end_of_data(frame: &Frame) -> bool {
    [4usize, 6, 8, 10]
        .iter()
        .all(|&off| frame.u16_le_at(off) == 0xFFFF)
}

impl<T: Transport> Charger<T> {
    /// Download the log of one charge cycle.
    ///
    /// Blocking-style: owns the transport exclusively and loops
    /// read-poll until the end-of-data marker, the row cap, or `timeout`
    /// without any frame at all (surfaced as [`Error::Timeout`]; the
    /// connection stays up). Transport failure aborts immediately, discards
    /// the partial buffer and runs the normal disconnect path. A transport
    /// closed out from under the query aborts within one poll interval.
    ///
    /// Callers must pause any passive polling of the same connection for the
    /// duration.
    pub fn query_cycle(
        &mut self,
        battery_id: u16,
        cycle_number: u16,
        timeout: Duration,
        sink: &mut dyn Sink,
    ) -> Result<CycleDownload, Error<T::Error>> {
        self.send(
            Command::QueryCycle {
                battery_id: battery_id as u32,
                cycle_number: cycle_number as u32,
            },
            sink,
        )?;

        let mut download = CycleDownload {
            battery_id,
            cycle_number,
            rows: Vec::new(),
        };
        let mut last_frame = Instant::now();

        loop {
            let frames = self.read_frames(sink)?;
            if !frames.is_empty() {
                last_frame = Instant::now();
            }

            let mut frames = frames.into_iter();
            while let Some(frame) = frames.next() {
                match self.classify(&frame) {
                    MessageKind::DataFrame1 if is_end_of_data(&frame) => {
                        tracing::debug!(
                            battery_id,
                            cycle_number,
                            rows = download.rows.len(),
                            "cycle download complete"
                        );
                        self.forward_batch(frames, sink);
                        sink.on_cycle_download_complete(&download);
                        return Ok(download);
                    }
                    MessageKind::DataFrame1 => {
                        let config = *self.config();
                        if let Some(Telemetry::DataFrame1 {
                            charge_voltage,
                            charge_current,
                            rel_time,
                            faults,
                        }) = Telemetry::decode(MessageKind::DataFrame1, &frame, &config)
                        {
                            download.rows.push(CycleRow {
                                timestamp: SystemTime::now(),
                                charge_voltage,
                                charge_current,
                                rel_time,
                                faults,
                                set_c_rate1: None,
                                set_c_rate2: None,
                                max_volta_temp: None,
                                avg_volta_temp: None,
                            });
                        }
                    }
                    MessageKind::DataFrame2 => {
                        let config = *self.config();
                        if let Some(Telemetry::DataFrame2 {
                            set_c_rate1,
                            set_c_rate2,
                            max_volta_temp,
                            avg_volta_temp,
                        }) = Telemetry::decode(MessageKind::DataFrame2, &frame, &config)
                        {
                            match download.rows.last_mut() {
                                Some(row) if row.set_c_rate1.is_none() => {
                                    row.set_c_rate1 = Some(set_c_rate1);
                                    row.set_c_rate2 = Some(set_c_rate2);
                                    row.max_volta_temp = Some(max_volta_temp);
                                    row.avg_volta_temp = Some(avg_volta_temp);
                                }
                                // A DataFrame2 with no open row is out of
                                // sequence; drop it rather than corrupt the
                                // previous row.
                                _ => tracing::debug!("out-of-sequence DataFrame2 dropped"),
                            }
                        }
                    }
                    // Unrelated telemetry keeps flowing during a download:
                    // forward it, but it never counts toward termination.
                    kind => {
                        let config = *self.config();
                        if let Some(telemetry) = Telemetry::decode(kind, &frame, &config) {
                            sink.on_record(&Record::new(telemetry));
                        }
                    }
                }

                if download.rows.len() >= MAX_DOWNLOAD_ROWS {
                    tracing::warn!(
                        battery_id,
                        cycle_number,
                        "cycle download hit the row cap without an end marker"
                    );
                    self.forward_batch(frames, sink);
                    sink.on_cycle_download_complete(&download);
                    return Ok(download);
                }
            }

            let elapsed = last_frame.elapsed();
            if elapsed >= timeout {
                tracing::debug!(battery_id, cycle_number, "cycle download timed out");
                return Err(Error::Timeout);
            }
            std::thread::sleep(POLL_INTERVAL.min(timeout - elapsed));
        }
    }

    /// Decode and forward frames extracted in the same read batch as a
    /// terminating condition. They have already been consumed from the
    /// reader's buffer, so no later poll would see them.
    fn forward_batch(&self, frames: impl Iterator<Item = Frame>, sink: &mut dyn Sink) {
        let config = *self.config();
        for frame in frames {
            if let Some(telemetry) = Telemetry::decode(self.classify(&frame), &frame, &config) {
                sink.on_record(&Record::new(telemetry));
            }
        }
    }
}

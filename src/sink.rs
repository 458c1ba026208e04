//! Downstream consumer interface.

use crate::query::CycleDownload;
use crate::record::Record;

/// Receives everything the protocol core produces.
///
/// Implemented by the GUI, loggers or exporters on top of this crate. All
/// callbacks are invoked synchronously from the connection's poll path and
/// default to no-ops, so an implementation only handles what it cares about.
pub trait Sink {
    /// One decoded, non-Unknown frame.
    fn on_record(&mut self, _record: &Record) {}

    /// A cycle download finished. Only complete buffers are ever delivered;
    /// aborted downloads are discarded, not forwarded.
    fn on_cycle_download_complete(&mut self, _download: &CycleDownload) {}

    /// The connection dropped. Sent exactly once per disconnect, with a
    /// human-readable reason.
    fn on_disconnected(&mut self, _reason: &str) {}
}

/// Sink that ignores everything, for callers only interested in return
/// values.
#[derive(Debug, Default)]
pub struct NullSink;

impl Sink for NullSink {}

//! Our error types for the charger link.

use thiserror::Error;

pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Custom error type for Volta charger communications.
///
/// Generic over the error type of the [`Transport`](crate::transport::Transport)
/// carrying the link.
#[derive(Error, Debug)]
pub enum Error<E: core::fmt::Debug> {
    /// The underlying transport failed during a read or write. The connection
    /// is torn down; the caller must reconnect explicitly.
    #[error("transport error")]
    Transport(E),
    /// A command could not be encoded. See [`EncodeError`].
    #[error("command encoding error: {0}")]
    Encoding(#[from] EncodeError),
    /// No terminating frame arrived within the configured window. The
    /// connection itself is still up.
    #[error("query timed out waiting for data")]
    Timeout,
    /// The operation requires an open connection.
    #[error("not connected")]
    NotConnected,
    /// The connection was closed while the operation was in progress.
    #[error("operation aborted by connection close")]
    Aborted,
}

/// Errors raised by the command encoder. These indicate a caller contract
/// violation, not a device fault.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EncodeError {
    /// A query parameter does not fit in the 16-bit wire field.
    #[error("{field} value {value} exceeds the 16-bit wire field")]
    ValueOutOfRange {
        field: &'static str,
        value: u32,
    },
}

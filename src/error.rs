//! Error kinds returned by submission functions and latched by the worker.
//!
//! `ok = 0` from the system specification has no variant here: a successful
//! outcome is `Result::Ok(())`. The error latch on [`crate::driver::CbFlash`]
//! is `Option<Error>`; `isero()` is `self.error.is_some()`.

/// Error kinds returned by `norcb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Flash device parameters have not been configured (`init` not called,
    /// or called with no geometry).
    #[error("flash parameters not configured")]
    NoFlash,
    /// No free queue slot at `new_cb`, or a record does not fit the queue's
    /// configured payload size.
    #[error("out of queue slots, or record too large for the queue")]
    Memory,
    /// The requested queue does not fit on the device.
    #[error("requested queue does not fit on the device")]
    FlashFull,
    /// A command is already in flight; submission functions other than the
    /// status accessors refuse new work while busy.
    #[error("a command is already in flight")]
    WorkerBusy,
    /// `cbID` is out of range, or names a slot that is not in use.
    #[error("queue id out of range or slot unused")]
    NoQueue,
    /// The queue is not in a state that accepts this request — typically a
    /// missing `mkcb` rescan after a prior append.
    #[error("queue not ready for this request; rescan with mkcb first")]
    WorkerRequest,
    /// `get_last` was called on a queue with no complete records.
    #[error("queue has no complete records")]
    QueueEmpty,
    /// `flash_read`'s caller-supplied buffer slot cannot hold
    /// `len + address_bytes + 1` bytes.
    #[error("caller buffer too small for this request")]
    BufferSize,
}

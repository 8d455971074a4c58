#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A cooperative, `no_std` driver that turns one or more NOR SPI flash
//! devices into append-only record queues.
//!
//! The driver never blocks and never allocates: every high-level operation
//! (scan, append, read-last, raw-read) is driven to completion by polling
//! [`CbFlash::worker`], which performs at most one SPI packet exchange per
//! call. The caller owns the transport — `norcb` only builds requests into
//! and parses responses from a shared, fixed-size buffer; see
//! [`CbFlash::spi_buf`] and [`CbFlash::spi_len`].
//!
//! ```ignore
//! use norcb::CbFlash;
//! use norcb_device::{FlashParams, W25Q16JV};
//!
//! let mut cb = CbFlash::<5, 266>::new();
//! cb.init(W25Q16JV::GEOMETRY)?;
//! let q = cb.new_cb(0x4711_4711, 244, 32)?;
//! cb.mkcb()?;
//! while cb.busy() {
//!     cb.worker();
//!     if cb.spi_len() > 0 {
//!         transport.exchange(cb.spi_buf());
//!     }
//! }
//! # Ok::<(), norcb::Error>(())
//! ```

mod fmt;

mod address;
mod driver;
mod error;
mod queue;
mod record;
mod worker;

pub use driver::CbFlash;
pub use error::Error;
pub use queue::QueueInfo;
pub use record::{RecordHeader, HEADER_SIZE};

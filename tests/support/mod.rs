//! Shared harness for driving a [`norcb::CbFlash`] handle against a
//! [`norcb_sim::SimFlash`] to completion, used by every integration test.

use norcb::CbFlash;
use norcb_sim::{SimFlash, SimTransport};

pub const TOTAL_SIZE: usize = 2 * 1024 * 1024;
pub const BUF_SIZE: usize = 266;

pub struct Harness {
    pub flash: SimFlash<TOTAL_SIZE>,
    pub transport: SimTransport,
}

impl Harness {
    pub fn new() -> (CbFlash<5, BUF_SIZE>, Self) {
        use norcb_device::{FlashParams, W25Q16JV};
        let mut cb = CbFlash::<5, BUF_SIZE>::new();
        cb.init(W25Q16JV::GEOMETRY).expect("init");
        (
            cb,
            Harness {
                flash: SimFlash::new(),
                transport: SimTransport::new(W25Q16JV::GEOMETRY),
            },
        )
    }

    /// Polls `cb.worker()` until idle, exchanging the shared buffer against
    /// the simulated flash whenever a packet is pending.
    pub fn drive(&mut self, cb: &mut CbFlash<5, BUF_SIZE>) {
        let mut guard = 0;
        while cb.busy() {
            cb.worker();
            if cb.spi_len() > 0 {
                self.transport.exchange(&mut self.flash, cb.spi_buf());
            }
            guard += 1;
            assert!(guard < 1_000_000, "worker did not converge");
        }
    }
}

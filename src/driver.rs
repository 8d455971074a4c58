//! The top-level driver handle and its command API surface.

use crate::error::Error;
use crate::fmt::{debug, trace, warn};
use crate::queue::{self, QueueInfo, QueueMgmt};
use crate::record::HEADER_SIZE;
use crate::worker::append::AppendState;
use crate::worker::raw_read::RawReadState;
use crate::worker::read_last::ReadLastState;
use crate::worker::scan::ScanState;
use crate::worker::{self, Command, Ctx};
use norcb_device::FlashGeometry;

/// A driver handle for up to `NQ` queues sharing a `BUF`-byte SPI buffer.
///
/// `NQ` and `BUF` are fixed at compile time so the handle holds no heap
/// allocation; `BUF` must be at least `page_size + address_bytes + 1`
/// (`init` checks this once the geometry is known).
pub struct CbFlash<const NQ: usize, const BUF: usize> {
    geometry: Option<FlashGeometry>,
    queues: [QueueMgmt; NQ],
    buf: [u8; BUF],
    spi_len: usize,
    command: Command,
    error: Option<Error>,
}

impl<const NQ: usize, const BUF: usize> Default for CbFlash<NQ, BUF> {
    fn default() -> Self {
        CbFlash {
            geometry: None,
            queues: [QueueMgmt::default(); NQ],
            buf: [0xFFu8; BUF],
            spi_len: 0,
            command: Command::Idle,
            error: None,
        }
    }
}

impl<const NQ: usize, const BUF: usize> CbFlash<NQ, BUF> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the flash parameters, clears every queue slot, and resets
    /// iterators and the error latch. `geometry.page_size + address_bytes +
    /// 1` must fit in the shared buffer.
    pub fn init(&mut self, geometry: FlashGeometry) -> Result<(), Error> {
        let required = geometry.page_size as usize + geometry.address_bytes as usize + 1;
        if required > BUF {
            warn!(
                "init: buffer too small ({} < {} required)",
                BUF, required
            );
            return Err(Error::Memory);
        }
        self.geometry = Some(geometry);
        self.queues = [QueueMgmt::default(); NQ];
        self.buf = [0xFFu8; BUF];
        self.spi_len = 0;
        self.command = Command::Idle;
        self.error = None;
        debug!("init: {} queue slots, {}-byte buffer", NQ, BUF);
        Ok(())
    }

    fn geometry(&self) -> Result<&FlashGeometry, Error> {
        self.geometry.as_ref().ok_or(Error::NoFlash)
    }

    fn check_not_busy(&self) -> Result<(), Error> {
        if self.command.is_idle() {
            Ok(())
        } else {
            Err(Error::WorkerBusy)
        }
    }

    fn queue(&self, cb_id: u8) -> Result<&QueueMgmt, Error> {
        let q = self.queues.get(cb_id as usize).ok_or(Error::NoQueue)?;
        if !q.used {
            return Err(Error::NoQueue);
        }
        Ok(q)
    }

    fn queue_mut(&mut self, cb_id: u8) -> Result<&mut QueueMgmt, Error> {
        let q = self.queues.get_mut(cb_id as usize).ok_or(Error::NoQueue)?;
        if !q.used {
            return Err(Error::NoQueue);
        }
        Ok(q)
    }

    /// Allocates a new queue of `num_elems` records, each holding up to
    /// `pl_size` payload bytes, returning its id.
    pub fn new_cb(&mut self, magic: u32, pl_size: u32, num_elems: u32) -> Result<u8, Error> {
        let geometry = *self.geometry()?;
        let id = queue::allocate(&mut self.queues, &geometry, magic, pl_size, num_elems)?;
        debug!("new_cb: queue {} magic {:#x} pl_size {}", id, magic, pl_size);
        Ok(id)
    }

    /// Rebuilds `mgmt_valid` for every used, dirty queue by scanning its
    /// records from flash. A no-op (stays idle) if every used queue is
    /// already valid.
    pub fn mkcb(&mut self) -> Result<(), Error> {
        self.check_not_busy()?;
        self.geometry()?;
        for q in self.queues.iter_mut() {
            if q.used && !q.mgmt_valid {
                q.reset_for_scan();
            }
        }
        if let Some(first) = self.queues.iter().position(|q| q.used && !q.mgmt_valid) {
            trace!("mkcb: starting scan at queue {}", first);
            self.command = Command::Scan(ScanState::new(first as u8));
        }
        Ok(())
    }

    fn submit_append(&mut self, cb_id: u8, data: *const u8, len: u32) -> Result<(), Error> {
        self.check_not_busy()?;
        self.geometry()?;
        let q = self.queue_mut(cb_id)?;
        // Starting a fresh record requires a rescan since the last append
        // (mgmt_valid); a continuation chunk of a record already in
        // progress does not, since the header was already committed and
        // `pl_flash_ofs` alone tracks where the next chunk resumes.
        let starting_new_record = q.pl_flash_ofs == 0;
        if (starting_new_record && !q.mgmt_valid) || q.pl_flash_ofs >= q.pl_size + HEADER_SIZE {
            return Err(Error::WorkerRequest);
        }
        if len + q.pl_flash_ofs > q.pl_size + HEADER_SIZE {
            return Err(Error::Memory);
        }
        let iter_adr = q.next_write_addr + q.pl_flash_ofs;
        if starting_new_record {
            q.invalidate();
        }
        trace!("add: queue {} len {} at {:#x}", cb_id, len, iter_adr);
        self.command = Command::Append(AppendState::new(cb_id, iter_adr, data, len as u16));
        Ok(())
    }

    /// Writes `data` as (the start of) a new record's payload.
    pub fn add(&mut self, cb_id: u8, data: &[u8]) -> Result<(), Error> {
        self.submit_append(cb_id, data.as_ptr(), data.len() as u32)
    }

    /// Appends `data` to the record already in progress on this queue.
    pub fn add_append(&mut self, cb_id: u8, data: &[u8]) -> Result<(), Error> {
        self.submit_append(cb_id, data.as_ptr(), data.len() as u32)
    }

    /// Forces the footer write for a record the caller stopped filling
    /// early. Preconditions are checked before any state is mutated.
    pub fn add_done(&mut self, cb_id: u8) -> Result<(), Error> {
        self.check_not_busy()?;
        self.geometry()?;
        let q = self.queue_mut(cb_id)?;
        let iter_adr = q.next_write_addr + q.pl_flash_ofs;
        q.pl_flash_ofs = q.pl_size + HEADER_SIZE;
        trace!("add_done: queue {}", cb_id);
        self.command = Command::Append(AppendState::new(cb_id, iter_adr, core::ptr::null(), 0));
        Ok(())
    }

    /// Copies up to `out.len()` payload bytes of the last complete record
    /// into `out`, returning its id. Requires `mgmt_valid`.
    pub fn get_last(&mut self, cb_id: u8, out: &mut [u8]) -> Result<u32, Error> {
        self.check_not_busy()?;
        self.geometry()?;
        let q = self.queue(cb_id)?;
        if !q.mgmt_valid {
            return Err(Error::WorkerRequest);
        }
        if !q.has_complete {
            return Err(Error::QueueEmpty);
        }
        let elem_pl_size = core::cmp::min(out.len() as u32, q.pl_size) as u16;
        let iter_adr = q.start_page_idmax_complete + HEADER_SIZE;
        let id = q.id_last_complete;
        self.command = Command::ReadLast(ReadLastState::new(iter_adr, out.as_mut_ptr(), elem_pl_size));
        Ok(id)
    }

    /// Reads `out.len()` bytes from an arbitrary flash address into `out`.
    /// If the shared buffer cannot hold `out.len() + address_bytes + 1`
    /// bytes, latches `buffer-size` and returns that error without arming
    /// the worker, regardless of whether a command is already in flight.
    pub fn flash_read(&mut self, addr: u32, out: &mut [u8]) -> Result<(), Error> {
        let geometry = *self.geometry()?;
        let required = out.len() + geometry.address_bytes as usize + 1;
        if required > BUF {
            self.error = Some(Error::BufferSize);
            warn!("flash_read: buffer too small ({} < {})", BUF, required);
            return Err(Error::BufferSize);
        }
        self.check_not_busy()?;
        trace!("flash_read: {} bytes at {:#x}", out.len(), addr);
        self.command = Command::RawRead(RawReadState::new(addr, out.as_mut_ptr(), out.len()));
        Ok(())
    }

    /// Advances the in-flight command by exactly one step. Returns
    /// immediately if idle. After a call returns, `spi_len()` tells the
    /// caller how many bytes of the shared buffer the transport must
    /// exchange (in place) before calling `worker` again; zero means the
    /// worker can simply be called again without any transport I/O.
    pub fn worker(&mut self) {
        if self.command.is_idle() {
            return;
        }
        let geometry = match self.geometry {
            Some(ref g) => g,
            None => {
                self.error = Some(Error::NoFlash);
                self.command = Command::Idle;
                return;
            }
        };
        let mut ctx = Ctx {
            buf: &mut self.buf[..],
            spi_len: &mut self.spi_len,
            geometry,
        };
        match worker::step(&mut self.command, &mut self.queues, &mut ctx) {
            worker::StepOutcome::Continue => {}
            worker::StepOutcome::Done => {
                trace!("worker: command finished");
                self.command = Command::Idle;
                self.spi_len = 0;
            }
            worker::StepOutcome::Error(e) => {
                warn!("worker: latched error");
                self.error = Some(e);
                self.command = Command::Idle;
                self.spi_len = 0;
            }
        }
    }

    /// Non-zero iff a command is in flight.
    pub fn busy(&self) -> bool {
        !self.command.is_idle()
    }

    /// Bytes of the shared buffer the transport must exchange before the
    /// next `worker` call.
    pub fn spi_len(&self) -> usize {
        self.spi_len
    }

    /// Mutable access to the shared SPI buffer, for the transport to
    /// exchange in place.
    pub fn spi_buf(&mut self) -> &mut [u8] {
        &mut self.buf[..self.spi_len]
    }

    /// Cached `id_max` for a queue; 0 if the slot is unused.
    pub fn idmax(&self, cb_id: u8) -> u32 {
        self.queues.get(cb_id as usize).map_or(0, |q| q.id_max)
    }

    /// Non-zero iff the error latch is set.
    pub fn isero(&self) -> bool {
        self.error.is_some()
    }

    /// The latched error, if any.
    pub fn last_error(&self) -> Option<Error> {
        self.error
    }

    /// Total device size, from the injected geometry.
    pub fn flash_size(&self) -> u32 {
        self.geometry.as_ref().map_or(0, |g| g.total_size)
    }

    /// Payload bytes of the current or most recently completed append on
    /// this queue that have been committed to flash. 0 for an unused or
    /// out-of-range queue id; never latches an error (diagnostic only).
    pub fn pl_wrcnt(&self, cb_id: u8) -> u32 {
        self.queues
            .get(cb_id as usize)
            .filter(|q| q.used)
            .map_or(0, |q| core::cmp::min(q.pl_flash_ofs, q.pl_size))
    }

    /// Read-only snapshot of a queue's management state, for diagnostics.
    pub fn queue_info(&self, cb_id: u8) -> Option<QueueInfo> {
        self.queues.get(cb_id as usize).map(QueueMgmt::info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use norcb_device::{FlashParams, W25Q16JV};

    #[test]
    fn init_rejects_undersized_buffer() {
        let mut cb = CbFlash::<5, 4>::new();
        assert_eq!(cb.init(W25Q16JV::GEOMETRY), Err(Error::Memory));
    }

    #[test]
    fn fresh_handle_is_idle_and_error_free() {
        let mut cb = CbFlash::<5, 266>::new();
        cb.init(W25Q16JV::GEOMETRY).unwrap();
        assert!(!cb.busy());
        assert!(!cb.isero());
        assert_eq!(cb.flash_size(), 2 * 1024 * 1024);
    }

    #[test]
    fn new_cb_matches_scenario_geometry() {
        let mut cb = CbFlash::<5, 266>::new();
        cb.init(W25Q16JV::GEOMETRY).unwrap();
        let q0 = cb.new_cb(0x4711_4711, 244, 32).unwrap();
        assert_eq!(q0, 0);
        let q1 = cb.new_cb(0x0815_0815, 12280, 16).unwrap();
        assert_eq!(q1, 1);
        assert_eq!(cb.queue_info(1).unwrap().pages_per_elem, 49);
    }

    #[test]
    fn add_rejects_when_not_scanned() {
        let mut cb = CbFlash::<5, 266>::new();
        cb.init(W25Q16JV::GEOMETRY).unwrap();
        let q0 = cb.new_cb(1, 16, 4).unwrap();
        assert_eq!(cb.add(q0, &[0u8; 16]), Err(Error::WorkerRequest));
    }

    #[test]
    fn add_rejects_oversized_payload() {
        let mut cb = CbFlash::<5, 266>::new();
        cb.init(W25Q16JV::GEOMETRY).unwrap();
        let q0 = cb.new_cb(1, 16, 4).unwrap();
        cb.mkcb().unwrap();
        while cb.busy() {
            cb.worker();
        }
        assert_eq!(cb.add(q0, &[0u8; 64]), Err(Error::Memory));
    }

    #[test]
    fn pl_wrcnt_is_zero_for_unused_queue() {
        let cb = CbFlash::<5, 266>::new();
        assert_eq!(cb.pl_wrcnt(3), 0);
    }
}

//! The cooperative, per-command state machine. Each public driver method
//! (`add`, `mkcb`, `get_last`, `flash_read`, ...) only *submits* a command by
//! constructing one of the `*State` values below and storing it in
//! [`Command`]; all of the actual SPI traffic happens one packet at a time
//! inside [`step`], called by [`crate::driver::CbFlash::worker`].
//!
//! A single call to a stage's step function does one of three things: parse
//! the response of the packet the previous call built, build the next
//! packet, or finish. `ctx.spi_len == 0` after a call means no transport
//! exchange is needed before calling the worker again (more progress can be
//! made synchronously) — it does not mean the command is done.

pub(crate) mod append;
pub(crate) mod raw_read;
pub(crate) mod read_last;
pub(crate) mod scan;

use crate::address::{footer_addr, header_addr, write_address};
use crate::error::Error;
use crate::queue::QueueMgmt;
use norcb_device::FlashGeometry;

/// Borrowed view of the shared SPI buffer and geometry, threaded through
/// every stage's step function.
pub(crate) struct Ctx<'a> {
    pub buf: &'a mut [u8],
    pub spi_len: &'a mut usize,
    pub geometry: &'a FlashGeometry,
}

impl Ctx<'_> {
    fn data_offset(&self) -> usize {
        1 + self.geometry.address_bytes as usize
    }
}

/// Outcome of one `step` call.
pub(crate) enum StepOutcome {
    Continue,
    Done,
    Error(Error),
}

/// Gates a stage behind a write-in-progress poll. Re-issues the same
/// `{read-status, 0}` packet until the status byte reports the device
/// ready; this is the only busy-wait path in the driver, and it yields to
/// the caller once per poll.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WipGate {
    armed: bool,
}

impl WipGate {
    /// Returns true once the device is ready to proceed.
    pub(crate) fn poll(&mut self, ctx: &mut Ctx) -> bool {
        if self.armed && wip_ready(ctx) {
            self.armed = false;
            return true;
        }
        build_wip_poll(ctx);
        self.armed = true;
        false
    }
}

pub(crate) fn build_wip_poll(ctx: &mut Ctx) {
    ctx.buf[0] = ctx.geometry.opcodes.rd_status;
    ctx.buf[1] = 0;
    *ctx.spi_len = 2;
}

pub(crate) fn wip_ready(ctx: &Ctx) -> bool {
    ctx.buf[1] & ctx.geometry.wip_mask == 0
}

pub(crate) fn build_write_enable(ctx: &mut Ctx) {
    ctx.buf[0] = ctx.geometry.opcodes.wr_ena;
    *ctx.spi_len = 1;
}

pub(crate) fn build_sector_erase(ctx: &mut Ctx, addr: u32) {
    ctx.buf[0] = ctx.geometry.opcodes.erase_sector;
    write_address(&mut ctx.buf[1..], addr, ctx.geometry.address_bytes);
    *ctx.spi_len = 1 + ctx.geometry.address_bytes as usize;
}

/// Builds a read-data request and returns the offset at which the response
/// bytes will land once the transport exchanges the buffer.
pub(crate) fn build_read_data(ctx: &mut Ctx, addr: u32, len: usize) -> usize {
    ctx.buf[0] = ctx.geometry.opcodes.rd_data;
    write_address(&mut ctx.buf[1..], addr, ctx.geometry.address_bytes);
    let data_ofs = ctx.data_offset();
    *ctx.spi_len = data_ofs + len;
    data_ofs
}

pub(crate) fn build_page_program(ctx: &mut Ctx, addr: u32, bytes: &[u8]) {
    ctx.buf[0] = ctx.geometry.opcodes.wr_page;
    write_address(&mut ctx.buf[1..], addr, ctx.geometry.address_bytes);
    let data_ofs = ctx.data_offset();
    ctx.buf[data_ofs..data_ofs + bytes.len()].copy_from_slice(bytes);
    *ctx.spi_len = data_ofs + bytes.len();
}

pub(crate) fn header_addr_for(q: &QueueMgmt, g: &FlashGeometry, n: u32) -> u32 {
    header_addr(q.start_sector, g.sector_size, q.pages_per_elem, g.page_size, n)
}

pub(crate) fn footer_addr_for(q: &QueueMgmt, g: &FlashGeometry, n: u32) -> u32 {
    footer_addr(q.start_sector, g.sector_size, q.pages_per_elem, g.page_size, n)
}

/// The command currently owning the shared SPI buffer, if any.
pub(crate) enum Command {
    Idle,
    Scan(scan::ScanState),
    Append(append::AppendState),
    ReadLast(read_last::ReadLastState),
    RawRead(raw_read::RawReadState),
}

impl Command {
    pub(crate) fn is_idle(&self) -> bool {
        matches!(self, Command::Idle)
    }
}

/// Advance whichever command is in flight by exactly one step.
pub(crate) fn step(
    command: &mut Command,
    queues: &mut [QueueMgmt],
    ctx: &mut Ctx,
) -> StepOutcome {
    match command {
        Command::Idle => StepOutcome::Done,
        Command::Scan(state) => scan::step(state, queues, ctx),
        Command::Append(state) => append::step(state, queues, ctx),
        Command::ReadLast(state) => read_last::step(state, ctx),
        Command::RawRead(state) => raw_read::step(state, ctx),
    }
}

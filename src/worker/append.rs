//! Append (`add`, `add_append`, `add_done`): writes a record's header,
//! payload, and footer as a sequence of page-program packets.

use super::{build_page_program, build_write_enable, Ctx, StepOutcome, WipGate};
use crate::queue::QueueMgmt;
use crate::record::{RecordHeader, HEADER_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// WIP poll, then fall through to `Decide`.
    Poll,
    /// Decide whether a header/footer or payload write is next, or finish.
    Decide,
    /// Write-enable was just exchanged; build the header or footer program.
    WriteHeaderOrFooter,
    /// Write-enable was just exchanged; build the next payload program.
    WritePayload,
    /// The program packet was just exchanged; loop back to the poll.
    Reset,
}

pub(crate) struct AppendState {
    cb: u8,
    iter_adr: u32,
    iter: u16,
    elem_pl_size: u16,
    data_ptr: *const u8,
    wip: WipGate,
    stage: Stage,
}

impl AppendState {
    pub(crate) fn new(cb: u8, iter_adr: u32, data_ptr: *const u8, elem_pl_size: u16) -> Self {
        AppendState {
            cb,
            iter_adr,
            iter: 0,
            elem_pl_size,
            data_ptr,
            wip: WipGate::default(),
            stage: Stage::Poll,
        }
    }
}

pub(crate) fn step(
    state: &mut AppendState,
    queues: &mut [QueueMgmt],
    ctx: &mut Ctx,
) -> StepOutcome {
    match state.stage {
        Stage::Poll => {
            if !state.wip.poll(ctx) {
                return StepOutcome::Continue;
            }
            state.stage = Stage::Decide;
            *ctx.spi_len = 0;
            StepOutcome::Continue
        }
        Stage::Decide => {
            let q = &queues[state.cb as usize];
            let footer_due = q.pl_flash_ofs == q.pl_size + HEADER_SIZE;
            if state.iter_adr == q.next_write_addr || footer_due {
                build_write_enable(ctx);
                state.stage = Stage::WriteHeaderOrFooter;
                StepOutcome::Continue
            } else if state.iter < state.elem_pl_size {
                build_write_enable(ctx);
                state.stage = Stage::WritePayload;
                StepOutcome::Continue
            } else {
                StepOutcome::Done
            }
        }
        Stage::WriteHeaderOrFooter => {
            let q = &mut queues[state.cb as usize];
            let is_footer = q.pl_flash_ofs == q.pl_size + HEADER_SIZE;
            let header = RecordHeader {
                magic: q.magic,
                id: q.id_max + 1,
            };
            let bytes = header.to_bytes();
            let addr = if is_footer {
                q.next_write_addr + q.pages_per_elem * ctx.geometry.page_size - HEADER_SIZE
            } else {
                state.iter_adr
            };
            build_page_program(ctx, addr, &bytes);
            q.pl_flash_ofs += if is_footer { 1 } else { HEADER_SIZE };
            state.iter_adr += HEADER_SIZE;
            state.stage = Stage::Reset;
            StepOutcome::Continue
        }
        Stage::WritePayload => {
            let q = &mut queues[state.cb as usize];
            let avail = ctx.geometry.page_size - (state.iter_adr % ctx.geometry.page_size);
            let remaining = (state.elem_pl_size - state.iter) as u32;
            let cpy = core::cmp::min(remaining, avail) as usize;
            // Safety: `data_ptr` is valid for `elem_pl_size` bytes for the
            // lifetime of this command; the caller's submission function
            // holds the buffer borrowed until the command completes.
            let data = unsafe {
                core::slice::from_raw_parts(state.data_ptr.add(state.iter as usize), cpy)
            };
            build_page_program(ctx, state.iter_adr, data);
            state.iter += cpy as u16;
            q.pl_flash_ofs += cpy as u32;
            state.iter_adr += cpy as u32;
            state.stage = Stage::Reset;
            StepOutcome::Continue
        }
        Stage::Reset => {
            *ctx.spi_len = 0;
            state.stage = Stage::Poll;
            StepOutcome::Continue
        }
    }
}

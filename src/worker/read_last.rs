//! Read last (`get_last`): copies the payload of the last complete record
//! into a caller buffer, one page-sized read at a time.

use super::{build_read_data, Ctx, StepOutcome, WipGate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// WIP poll, then fall through to `Copy`.
    Poll,
    /// Copy bytes from any pending read, then request the next chunk or
    /// finish.
    Copy,
}

pub(crate) struct ReadLastState {
    iter_adr: u32,
    iter: u16,
    elem_pl_size: u16,
    out_ptr: *mut u8,
    wip: WipGate,
    stage: Stage,
    pending_copy: bool,
}

impl ReadLastState {
    pub(crate) fn new(iter_adr: u32, out_ptr: *mut u8, elem_pl_size: u16) -> Self {
        ReadLastState {
            iter_adr,
            iter: 0,
            elem_pl_size,
            out_ptr,
            wip: WipGate::default(),
            stage: Stage::Poll,
            pending_copy: false,
        }
    }
}

pub(crate) fn step(state: &mut ReadLastState, ctx: &mut Ctx) -> StepOutcome {
    match state.stage {
        Stage::Poll => {
            if !state.wip.poll(ctx) {
                return StepOutcome::Continue;
            }
            state.stage = Stage::Copy;
            *ctx.spi_len = 0;
            StepOutcome::Continue
        }
        Stage::Copy => {
            if state.pending_copy {
                let n = *ctx.spi_len - ctx.geometry.address_bytes as usize - 1;
                let ofs = ctx.data_offset();
                let src = &ctx.buf[ofs..ofs + n];
                // Safety: `out_ptr` is valid for `elem_pl_size` bytes for
                // the lifetime of this command.
                unsafe {
                    core::ptr::copy_nonoverlapping(
                        src.as_ptr(),
                        state.out_ptr.add(state.iter as usize),
                        n,
                    );
                }
                state.iter += n as u16;
                state.iter_adr += n as u32;
                state.pending_copy = false;
            }
            if state.iter < state.elem_pl_size {
                let remaining = (state.elem_pl_size - state.iter) as u32;
                let chunk = core::cmp::min(ctx.geometry.page_size, remaining) as usize;
                build_read_data(ctx, state.iter_adr, chunk);
                state.pending_copy = true;
                StepOutcome::Continue
            } else {
                StepOutcome::Done
            }
        }
    }
}

//! Raw read (`flash_read`): a single-shot read of an arbitrary flash
//! address into a caller buffer.

use super::{build_read_data, Ctx, StepOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Request,
    Copy,
}

pub(crate) struct RawReadState {
    addr: u32,
    len: usize,
    out_ptr: *mut u8,
    stage: Stage,
}

impl RawReadState {
    pub(crate) fn new(addr: u32, out_ptr: *mut u8, len: usize) -> Self {
        RawReadState {
            addr,
            len,
            out_ptr,
            stage: Stage::Request,
        }
    }
}

pub(crate) fn step(state: &mut RawReadState, ctx: &mut Ctx) -> StepOutcome {
    match state.stage {
        Stage::Request => {
            build_read_data(ctx, state.addr, state.len);
            state.stage = Stage::Copy;
            StepOutcome::Continue
        }
        Stage::Copy => {
            let ofs = ctx.data_offset();
            let src = &ctx.buf[ofs..ofs + state.len];
            // Safety: `out_ptr` is valid for `len` bytes for the lifetime
            // of this command.
            unsafe {
                core::ptr::copy_nonoverlapping(src.as_ptr(), state.out_ptr, state.len);
            }
            StepOutcome::Done
        }
    }
}

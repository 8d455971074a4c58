//! Build/scan (`mkcb`): reconstructs `mgmt_valid` for every used queue by
//! walking its records from flash.

use super::{
    build_read_data, build_sector_erase, build_write_enable, footer_addr_for, header_addr_for,
    Ctx, StepOutcome, WipGate,
};
use crate::address::sector_align_down;
use crate::queue::QueueMgmt;
use crate::record::{RecordHeader, HEADER_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// WIP poll, then request record `iter`'s header.
    WipThenHeader,
    /// Parse the header response, then request the matching footer.
    ParseHeader,
    /// Parse the footer response, then decide what happens next.
    ParseFooter,
    /// Write-enable was just exchanged; emit the sector erase.
    WriteEnable,
    /// WIP poll after the erase, then resume the header-read loop.
    PostErasePoll,
}

pub(crate) struct ScanState {
    cb: u8,
    iter: u32,
    iter_adr: u32,
    stage: Stage,
    wip: WipGate,
    header: RecordHeader,
    last_elem_adr: u32,
    last_elem_num: u32,
}

impl ScanState {
    pub(crate) fn new(cb: u8) -> Self {
        ScanState {
            cb,
            iter: 0,
            iter_adr: 0,
            stage: Stage::WipThenHeader,
            wip: WipGate::default(),
            header: RecordHeader::default(),
            last_elem_adr: 0,
            last_elem_num: 0,
        }
    }
}

fn next_dirty_queue(queues: &[QueueMgmt], after: u8) -> Option<u8> {
    queues
        .iter()
        .enumerate()
        .skip(after as usize + 1)
        .find(|(_, q)| q.used && !q.mgmt_valid)
        .map(|(i, _)| i as u8)
}

pub(crate) fn step(state: &mut ScanState, queues: &mut [QueueMgmt], ctx: &mut Ctx) -> StepOutcome {
    match state.stage {
        Stage::WipThenHeader => {
            if !state.wip.poll(ctx) {
                return StepOutcome::Continue;
            }
            let q = &queues[state.cb as usize];
            state.iter_adr = header_addr_for(q, ctx.geometry, state.iter);
            build_read_data(ctx, state.iter_adr, HEADER_SIZE as usize);
            state.stage = Stage::ParseHeader;
            StepOutcome::Continue
        }
        Stage::ParseHeader => {
            let ofs = ctx.data_offset();
            let bytes = &ctx.buf[ofs..ofs + HEADER_SIZE as usize];
            let header = RecordHeader::from_bytes(bytes);
            let q = &mut queues[state.cb as usize];
            if header.magic == q.magic {
                q.entries += 1;
                if header.id > q.id_max {
                    q.id_max = header.id;
                    state.last_elem_adr = state.iter_adr;
                    state.last_elem_num = header.id;
                }
                if header.id < q.id_min {
                    q.id_min = header.id;
                    q.start_page_idmin = state.iter_adr;
                }
            } else if !q.mgmt_valid && RecordHeader::is_blank(bytes) {
                q.next_write_addr = state.iter_adr;
                q.mgmt_valid = true;
            }
            state.header = header;
            state.iter_adr = footer_addr_for(q, ctx.geometry, state.iter);
            build_read_data(ctx, state.iter_adr, HEADER_SIZE as usize);
            state.stage = Stage::ParseFooter;
            StepOutcome::Continue
        }
        Stage::ParseFooter => {
            let ofs = ctx.data_offset();
            let bytes = &ctx.buf[ofs..ofs + HEADER_SIZE as usize];
            let footer = RecordHeader::from_bytes(bytes);
            let q = &mut queues[state.cb as usize];
            if RecordHeader::is_complete(&state.header, &footer, q.magic) {
                q.start_page_idmax_complete = state.last_elem_adr;
                q.id_last_complete = state.last_elem_num;
                q.has_complete = true;
            }

            if state.iter + 1 < q.max_entries {
                state.iter += 1;
                state.iter_adr = header_addr_for(q, ctx.geometry, state.iter);
                build_read_data(ctx, state.iter_adr, HEADER_SIZE as usize);
                state.stage = Stage::ParseHeader;
                StepOutcome::Continue
            } else if q.mgmt_valid {
                match next_dirty_queue(queues, state.cb) {
                    Some(next) => {
                        *state = ScanState::new(next);
                        *ctx.spi_len = 0;
                        StepOutcome::Continue
                    }
                    None => StepOutcome::Done,
                }
            } else {
                build_write_enable(ctx);
                state.stage = Stage::WriteEnable;
                StepOutcome::Continue
            }
        }
        Stage::WriteEnable => {
            let q = &queues[state.cb as usize];
            let erase_addr = sector_align_down(q.start_page_idmin, ctx.geometry.sector_size);
            build_sector_erase(ctx, erase_addr);
            state.stage = Stage::PostErasePoll;
            StepOutcome::Continue
        }
        Stage::PostErasePoll => {
            if !state.wip.poll(ctx) {
                return StepOutcome::Continue;
            }
            state.iter = 0;
            state.last_elem_adr = 0;
            state.last_elem_num = 0;
            let q = &mut queues[state.cb as usize];
            q.reset_for_scan();
            state.iter_adr = header_addr_for(q, ctx.geometry, 0);
            build_read_data(ctx, state.iter_adr, HEADER_SIZE as usize);
            state.stage = Stage::ParseHeader;
            StepOutcome::Continue
        }
    }
}

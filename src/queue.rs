//! Per-queue management state (RAM) and queue-table geometry allocation
//! (`new_cb`).

use crate::address::ceil_div;
use crate::error::Error;
use crate::record::HEADER_SIZE;
use norcb_device::FlashGeometry;

/// RAM-side bookkeeping for one queue. Mirrors the "Per-queue management"
/// fields of the on-flash log exactly; nothing here is itself persisted —
/// it is rebuilt by `mkcb` from the flash contents after any reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueueMgmt {
    pub used: bool,
    pub mgmt_valid: bool,
    pub magic: u32,
    pub start_sector: u32,
    pub stop_sector: u32,
    pub pages_per_elem: u32,
    pub max_entries: u32,
    pub entries: u32,
    pub id_min: u32,
    pub id_max: u32,
    pub start_page_idmin: u32,
    pub start_page_idmax_complete: u32,
    pub id_last_complete: u32,
    pub next_write_addr: u32,
    pub pl_size: u32,
    pub pl_flash_ofs: u32,
    /// Whether `start_page_idmax_complete`/`id_last_complete` name a real
    /// committed record. Not named in the management-entry field list, since
    /// it only disambiguates `id_last_complete == 0` (no record yet) from a
    /// legitimately-zero first id.
    pub has_complete: bool,
}

impl Default for QueueMgmt {
    fn default() -> Self {
        QueueMgmt {
            used: false,
            mgmt_valid: false,
            magic: 0,
            start_sector: 0,
            stop_sector: 0,
            pages_per_elem: 0,
            max_entries: 0,
            entries: 0,
            id_min: u32::MAX,
            id_max: 0,
            start_page_idmin: 0,
            start_page_idmax_complete: 0,
            id_last_complete: 0,
            next_write_addr: 0,
            pl_size: 0,
            pl_flash_ofs: 0,
            has_complete: false,
        }
    }
}

impl QueueMgmt {
    /// Clear the scan cache. Called whenever `mgmt_valid` transitions to
    /// false (an append has started, or a rescan is about to begin), so
    /// that `entries` never double-counts across scans (I1).
    pub(crate) fn invalidate(&mut self) {
        self.mgmt_valid = false;
        self.entries = 0;
    }

    /// Reset the scan accumulators before a fresh `mkcb` pass over this
    /// queue. `id_min`/`id_max` are seeded so that any id found on flash
    /// compares correctly.
    pub(crate) fn reset_for_scan(&mut self) {
        self.id_min = u32::MAX;
        self.id_max = 0;
        self.pl_flash_ofs = 0;
        self.entries = 0;
    }

    /// Read-only snapshot of a queue, for diagnostics.
    pub fn info(&self) -> QueueInfo {
        QueueInfo {
            used: self.used,
            mgmt_valid: self.mgmt_valid,
            magic: self.magic,
            start_sector: self.start_sector,
            stop_sector: self.stop_sector,
            pages_per_elem: self.pages_per_elem,
            max_entries: self.max_entries,
            entries: self.entries,
            id_min: self.id_min,
            id_max: self.id_max,
        }
    }
}

/// Read-only diagnostic snapshot of a queue's RAM management state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueueInfo {
    pub used: bool,
    pub mgmt_valid: bool,
    pub magic: u32,
    pub start_sector: u32,
    pub stop_sector: u32,
    pub pages_per_elem: u32,
    pub max_entries: u32,
    pub entries: u32,
    pub id_min: u32,
    pub id_max: u32,
}

/// Allocate the next free slot in `queues` as a new queue occupying a
/// contiguous sector range, packed immediately after the previous queue.
///
/// `pages_per_elem` is sized to hold the header, the payload, and the
/// footer: `ceil_div(pl_size + 2*HEADER_SIZE, page_size)`. The footer
/// occupies the record's last `HEADER_SIZE` bytes, distinct from the
/// payload region, so a full `pl_size`-byte payload never overlaps the
/// footer write that follows it.
pub(crate) fn allocate(
    queues: &mut [QueueMgmt],
    geometry: &FlashGeometry,
    magic: u32,
    pl_size: u32,
    num_elems: u32,
) -> Result<u8, Error> {
    let slot = queues.iter().position(|q| !q.used).ok_or(Error::Memory)?;

    let start_sector = match slot {
        0 => 0,
        i => queues[i - 1].stop_sector + 1,
    };

    let pages_per_sector = geometry.sector_size / geometry.page_size;
    let pages_per_elem = ceil_div(pl_size + 2 * HEADER_SIZE, geometry.page_size);
    if pages_per_elem == 0 {
        return Err(Error::Memory);
    }
    let num_sectors = core::cmp::max(
        2,
        ceil_div(num_elems * pages_per_elem, pages_per_sector),
    );
    let stop_sector = start_sector + num_sectors - 1;

    if (stop_sector + 1) as u64 * geometry.sector_size as u64 > geometry.total_size as u64 {
        return Err(Error::FlashFull);
    }

    let max_entries = (num_sectors * pages_per_sector) / pages_per_elem;

    queues[slot] = QueueMgmt {
        used: true,
        mgmt_valid: false,
        magic,
        start_sector,
        stop_sector,
        pages_per_elem,
        max_entries,
        entries: 0,
        id_min: u32::MAX,
        id_max: 0,
        start_page_idmin: 0,
        start_page_idmax_complete: 0,
        id_last_complete: 0,
        next_write_addr: start_sector * geometry.sector_size,
        pl_size,
        pl_flash_ofs: 0,
        has_complete: false,
    };

    Ok(slot as u8)
}

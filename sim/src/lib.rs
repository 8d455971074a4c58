#![no_std]

//! A simulated NOR flash device plus a packet-level transport that drives
//! [`norcb`](https://docs.rs/norcb)'s shared SPI buffer, for testing only.
//! Mirrors the placement and intent of
//! [`embedded_nand::test::VirtualNandFlash`](https://docs.rs/embedded-nand),
//! but speaks the request/response packet format of `norcb::worker` instead
//! of a trait-level `NandFlash` API.

mod fmt;

use fmt::{debug, trace};
use norcb_device::FlashGeometry;

/// A `SIZE`-byte simulated flash array. Bytes start erased (`0xFF`);
/// programming can only clear bits, never set them, matching real NOR
/// semantics; only `erase_sector` can return a byte to `0xFF`.
pub struct SimFlash<const SIZE: usize> {
    data: [u8; SIZE],
    pub erase_count: u32,
    pub program_count: u32,
    pub read_count: u32,
}

impl<const SIZE: usize> SimFlash<SIZE> {
    pub fn new() -> Self {
        SimFlash {
            data: [0xFFu8; SIZE],
            erase_count: 0,
            program_count: 0,
            read_count: 0,
        }
    }

    pub fn read(&mut self, addr: u32, out: &mut [u8]) {
        self.read_count += 1;
        let start = addr as usize;
        out.copy_from_slice(&self.data[start..start + out.len()]);
    }

    pub fn program(&mut self, addr: u32, bytes: &[u8]) {
        self.program_count += 1;
        let start = addr as usize;
        for (dst, &src) in self.data[start..start + bytes.len()].iter_mut().zip(bytes) {
            *dst &= src;
        }
    }

    pub fn erase_sector(&mut self, addr: u32, sector_size: u32) {
        self.erase_count += 1;
        let start = addr as usize;
        let end = start + sector_size as usize;
        self.data[start..end].fill(0xFF);
    }

    /// Raw byte-for-byte access, for asserting against a reference dump.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl<const SIZE: usize> Default for SimFlash<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

fn read_address(bytes: &[u8], address_bytes: u8) -> u32 {
    let mut addr = 0u32;
    for i in 0..address_bytes as usize {
        addr = (addr << 8) | bytes[i] as u32;
    }
    addr
}

/// Exchanges `norcb`'s shared buffer against a [`SimFlash`], interpreting
/// the opcode byte the same way a real NOR part would. Plays the role of
/// the SPI transport that `norcb` leaves out of scope.
pub struct SimTransport {
    geometry: FlashGeometry,
}

impl SimTransport {
    pub fn new(geometry: FlashGeometry) -> Self {
        SimTransport { geometry }
    }

    /// Exchanges `buf[..len]` in place against `flash`. `len` is normally
    /// `norcb::CbFlash::spi_len()`.
    pub fn exchange<const SIZE: usize>(&self, flash: &mut SimFlash<SIZE>, buf: &mut [u8]) {
        let g = &self.geometry;
        let ab = g.address_bytes as usize;
        let opcode = buf[0];

        if opcode == g.opcodes.rd_status {
            trace!("sim: read-status");
            buf[1] = 0;
        } else if opcode == g.opcodes.wr_ena {
            trace!("sim: write-enable");
        } else if opcode == g.opcodes.wr_dsbl {
            trace!("sim: write-disable");
        } else if opcode == g.opcodes.erase_sector {
            let addr = read_address(&buf[1..], ab);
            debug!("sim: erase-sector {:#x}", addr);
            flash.erase_sector(addr, g.sector_size);
        } else if opcode == g.opcodes.erase_bulk {
            debug!("sim: erase-bulk");
            for sector in 0..(g.total_size / g.sector_size) {
                flash.erase_sector(sector * g.sector_size, g.sector_size);
            }
        } else if opcode == g.opcodes.rd_data {
            let addr = read_address(&buf[1..], ab);
            let len = buf.len() - 1 - ab;
            trace!("sim: read-data {:#x} len {}", addr, len);
            flash.read(addr, &mut buf[1 + ab..]);
        } else if opcode == g.opcodes.wr_page {
            let addr = read_address(&buf[1..], ab);
            trace!("sim: write-page {:#x}", addr);
            let payload_start = 1 + ab;
            flash.program(addr, &buf[payload_start..]);
        } else if opcode == g.opcodes.rdid {
            let bytes = g.id_hex.to_be_bytes();
            buf[1..4].copy_from_slice(&bytes[1..4]);
        }
    }
}

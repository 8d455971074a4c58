#![no_std]

//! Flash-device parameter sets consumed by [`norcb`](https://docs.rs/norcb).
//!
//! `norcb` never hard-codes opcodes or geometry: every value here is an
//! ordinary runtime value ([`FlashGeometry`]) that gets passed to
//! `CbFlash::init`. [`FlashParams`] is just a convenient place to pin down a
//! known part's geometry as an associated `const`, the way
//! [`winbond::W25N`](https://docs.rs/winbond) pins down page/block counts for
//! a family of NAND parts.

/// The eight SPI opcodes a NOR part must expose for [`norcb`](https://docs.rs/norcb)
/// to drive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Opcodes {
    /// Read JEDEC/manufacturer ID.
    pub rdid: u8,
    /// Set the write-enable latch. Required before any program or erase.
    pub wr_ena: u8,
    /// Clear the write-enable latch.
    pub wr_dsbl: u8,
    /// Erase the whole device.
    pub erase_bulk: u8,
    /// Erase a single sector.
    pub erase_sector: u8,
    /// Read the status register (carries the WIP bit).
    pub rd_status: u8,
    /// Read data starting at an address.
    pub rd_data: u8,
    /// Program (write) a page.
    pub wr_page: u8,
}

/// Geometry and command set of one flash part, injected into the driver at
/// `init` rather than read from module-global constants, so one binary can
/// address different parts and tests can exercise several at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlashGeometry {
    /// Human-readable part name, for logging only.
    pub name: &'static str,
    /// JEDEC ID, for logging/diagnostics only; not checked by the driver.
    pub id_hex: u32,
    pub opcodes: Opcodes,
    /// Number of address bytes the part expects on read/write/erase commands.
    pub address_bytes: u8,
    /// Bytes per erase sector.
    pub sector_size: u32,
    /// Bytes per program page.
    pub page_size: u32,
    /// Total device capacity in bytes.
    pub total_size: u32,
    /// Dummy bytes clocked out after the RDID opcode before data is valid.
    pub rdid_dummy_bytes: u8,
    /// Mask of the write-in-progress bit within the status register byte.
    pub wip_mask: u8,
    /// Mask of the write-enable-latch bit within the status register byte.
    pub wren_mask: u8,
}

/// A flash part whose geometry is known at compile time.
///
/// Implementing this is equivalent to writing out a [`FlashGeometry`] value
/// by hand; it exists so common parts can be referred to by type, the way
/// [`winbond::W25N02K`](https://docs.rs/winbond) names a NAND part instead of
/// spelling out its page/block counts every time.
pub trait FlashParams {
    const GEOMETRY: FlashGeometry;
}

/// Winbond W25Q16JV: 2 MiB NOR flash, 256 B pages, 4 KiB sectors.
///
/// Used by the literal scenarios in the system specification (queue sizing,
/// append, raw-read and round-trip tests).
pub struct W25Q16JV;

impl FlashParams for W25Q16JV {
    const GEOMETRY: FlashGeometry = FlashGeometry {
        name: "W25Q16JV",
        id_hex: 0xEF_40_15,
        opcodes: Opcodes {
            rdid: 0x9F,
            wr_ena: 0x06,
            wr_dsbl: 0x04,
            erase_bulk: 0xC7,
            erase_sector: 0x20,
            rd_status: 0x05,
            rd_data: 0x03,
            wr_page: 0x02,
        },
        address_bytes: 3,
        sector_size: 4096,
        page_size: 256,
        total_size: 2 * 1024 * 1024,
        rdid_dummy_bytes: 0,
        wip_mask: 0x01,
        wren_mask: 0x02,
    };
}

/// Winbond W25Q128JV: 16 MiB NOR flash, 256 B pages, 4 KiB sectors.
///
/// Shares W25Q16JV's command set; only capacity differs.
pub struct W25Q128JV;

impl FlashParams for W25Q128JV {
    const GEOMETRY: FlashGeometry = FlashGeometry {
        name: "W25Q128JV",
        id_hex: 0xEF_40_18,
        total_size: 16 * 1024 * 1024,
        ..W25Q16JV::GEOMETRY
    };
}

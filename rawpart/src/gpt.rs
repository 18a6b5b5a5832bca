// SPDX-License-Identifier: MIT

//! GUID Partition Table codec.
//!
//! A table lives in memory as one contiguous buffer: the header sector
//! followed by the partition-entry array (`sector_size + entries * entry_size`
//! bytes), regardless of where the array sits on disk. [`GptCodec`] parses,
//! validates and re-encodes that buffer, and relocates a primary/backup pair
//! to a disk of another size.

use rawio::bytes;
use uuid::Uuid;

use crate::crc32::{self, Crc32};
use crate::errors::*;
use crate::guids::GptPartitionKind;
use crate::utils::PartitionExtent;

pub const GPT_SIGNATURE: &[u8; 8] = b"EFI PART";
pub const GPT_REVISION: u32 = 0x0001_0000;
pub const GPT_HEADER_SIZE: u32 = 92;
pub const GPT_ENTRY_SIZE: u32 = 128;
pub const GPT_DEFAULT_NUM_ENTRIES: u32 = 128;
pub const GPT_PRIMARY_HEADER_LBA: u64 = 1;
pub const GPT_PRIMARY_ENTRIES_LBA: u64 = 2;
/// UEFI minimum reservation for the entry array.
pub const GPT_MIN_ARRAY_BYTES: u64 = 16_384;
pub const GPT_NAME_FIELD_LEN: usize = 72;

const MAX_ENTRY_SIZE: u32 = 4096;
const MAX_NUM_ENTRIES: u32 = 16_384;

// Header field offsets
const HDR_SIGNATURE: usize = 0x00;
const HDR_REVISION: usize = 0x08;
const HDR_SIZE: usize = 0x0C;
const HDR_CRC: usize = 0x10;
const HDR_RESERVED: usize = 0x14;
const HDR_CURRENT_LBA: usize = 0x18;
const HDR_BACKUP_LBA: usize = 0x20;
const HDR_FIRST_USABLE: usize = 0x28;
const HDR_LAST_USABLE: usize = 0x30;
const HDR_DISK_GUID: usize = 0x38;
const HDR_ENTRIES_LBA: usize = 0x48;
const HDR_NUM_ENTRIES: usize = 0x50;
const HDR_ENTRY_SIZE: usize = 0x54;
const HDR_ENTRIES_CRC: usize = 0x58;

// Entry field offsets
const ENT_TYPE_GUID: usize = 0x00;
const ENT_UNIQUE_GUID: usize = 0x10;
const ENT_FIRST_LBA: usize = 0x20;
const ENT_LAST_LBA: usize = 0x28;
const ENT_ATTRIBUTES: usize = 0x30;
const ENT_NAME: usize = 0x38;

#[inline]
fn read_guid(buf: &[u8], offset: usize) -> PartResult<Uuid> {
    Ok(Uuid::from_bytes_le(bytes::read_array(buf, offset)?))
}

#[inline]
fn write_guid(buf: &mut [u8], offset: usize, guid: &Uuid) -> PartResult<()> {
    bytes::write_bytes(buf, offset, &guid.to_bytes_le())?;
    Ok(())
}

/// Header CRC over `[0, header_size)` with the CRC field taken as zero.
pub fn compute_header_crc(header_sector: &[u8], header_size: u32) -> PartResult<u32> {
    let hs = header_size as usize;
    if hs < GPT_HEADER_SIZE as usize || hs > header_sector.len() {
        return Err(GptError::InvalidHeaderSize { got: header_size }.into());
    }
    let mut h = Crc32::new();
    h.update(&header_sector[..HDR_CRC]);
    h.update(&[0u8; 4]);
    h.update(&header_sector[HDR_RESERVED..hs]);
    Ok(h.finalize())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GptHeader {
    pub signature: [u8; 8],
    pub revision: u32,
    pub header_size: u32,
    pub header_crc32: u32,
    pub reserved: u32,
    pub current_lba: u64,
    pub backup_lba: u64,
    pub first_usable_lba: u64,
    pub last_usable_lba: u64,
    pub disk_guid: Uuid,
    pub entries_lba: u64,
    pub num_entries: u32,
    pub entry_size: u32,
    pub entries_crc32: u32,
}

impl GptHeader {
    /// Fresh header with the default 128 x 128-byte array; LBAs are filled by [`GptLayout`].
    pub fn new(disk_guid: Uuid) -> Self {
        Self {
            signature: *GPT_SIGNATURE,
            revision: GPT_REVISION,
            header_size: GPT_HEADER_SIZE,
            header_crc32: 0,
            reserved: 0,
            current_lba: 0,
            backup_lba: 0,
            first_usable_lba: 0,
            last_usable_lba: 0,
            disk_guid,
            entries_lba: 0,
            num_entries: GPT_DEFAULT_NUM_ENTRIES,
            entry_size: GPT_ENTRY_SIZE,
            entries_crc32: 0,
        }
    }

    pub fn parse(buf: &[u8]) -> PartResult<Self> {
        if buf.len() < GPT_HEADER_SIZE as usize {
            return Err(PartError::BufferTooSmall {
                needed: GPT_HEADER_SIZE as usize,
                got: buf.len(),
            });
        }
        Ok(Self {
            signature: bytes::read_array(buf, HDR_SIGNATURE)?,
            revision: bytes::read_u32_le(buf, HDR_REVISION)?,
            header_size: bytes::read_u32_le(buf, HDR_SIZE)?,
            header_crc32: bytes::read_u32_le(buf, HDR_CRC)?,
            reserved: bytes::read_u32_le(buf, HDR_RESERVED)?,
            current_lba: bytes::read_u64_le(buf, HDR_CURRENT_LBA)?,
            backup_lba: bytes::read_u64_le(buf, HDR_BACKUP_LBA)?,
            first_usable_lba: bytes::read_u64_le(buf, HDR_FIRST_USABLE)?,
            last_usable_lba: bytes::read_u64_le(buf, HDR_LAST_USABLE)?,
            disk_guid: read_guid(buf, HDR_DISK_GUID)?,
            entries_lba: bytes::read_u64_le(buf, HDR_ENTRIES_LBA)?,
            num_entries: bytes::read_u32_le(buf, HDR_NUM_ENTRIES)?,
            entry_size: bytes::read_u32_le(buf, HDR_ENTRY_SIZE)?,
            entries_crc32: bytes::read_u32_le(buf, HDR_ENTRIES_CRC)?,
        })
    }

    /// Writes the 92 defined bytes; anything after them in the sector is left alone.
    pub fn write_to(&self, buf: &mut [u8]) -> PartResult<()> {
        bytes::write_bytes(buf, HDR_SIGNATURE, &self.signature)?;
        bytes::write_u32_le(buf, HDR_REVISION, self.revision)?;
        bytes::write_u32_le(buf, HDR_SIZE, self.header_size)?;
        bytes::write_u32_le(buf, HDR_CRC, self.header_crc32)?;
        bytes::write_u32_le(buf, HDR_RESERVED, self.reserved)?;
        bytes::write_u64_le(buf, HDR_CURRENT_LBA, self.current_lba)?;
        bytes::write_u64_le(buf, HDR_BACKUP_LBA, self.backup_lba)?;
        bytes::write_u64_le(buf, HDR_FIRST_USABLE, self.first_usable_lba)?;
        bytes::write_u64_le(buf, HDR_LAST_USABLE, self.last_usable_lba)?;
        write_guid(buf, HDR_DISK_GUID, &self.disk_guid)?;
        bytes::write_u64_le(buf, HDR_ENTRIES_LBA, self.entries_lba)?;
        bytes::write_u32_le(buf, HDR_NUM_ENTRIES, self.num_entries)?;
        bytes::write_u32_le(buf, HDR_ENTRY_SIZE, self.entry_size)?;
        bytes::write_u32_le(buf, HDR_ENTRIES_CRC, self.entries_crc32)?;
        Ok(())
    }

    #[inline]
    pub fn has_valid_signature(&self) -> bool {
        &self.signature == GPT_SIGNATURE
    }

    /// `num_entries * entry_size`.
    #[inline]
    pub fn array_length(&self) -> u64 {
        self.num_entries as u64 * self.entry_size as u64
    }

    /// Rejects geometries that would make decoding allocate absurd amounts.
    pub fn check_geometry(&self) -> PartResult<()> {
        let bad = self.entry_size < GPT_ENTRY_SIZE
            || self.entry_size % 8 != 0
            || self.entry_size > MAX_ENTRY_SIZE
            || self.num_entries == 0
            || self.num_entries > MAX_NUM_ENTRIES;
        if bad {
            return Err(GptError::InvalidEntryGeometry {
                count: self.num_entries,
                size: self.entry_size,
            }
            .into());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GptPartitionEntry {
    pub type_guid: Uuid,
    pub unique_guid: Uuid,
    pub first_lba: u64,
    pub last_lba: u64,
    pub attributes: u64,
    pub name: String,
    /// Logical sector size the LBAs are expressed in.
    pub sector_size: u64,
}

impl GptPartitionEntry {
    /// New partition with a random unique GUID, 512-byte sectors.
    pub fn new(type_guid: Uuid, first_lba: u64, last_lba: u64, name: &str) -> Self {
        Self {
            type_guid,
            unique_guid: Uuid::new_v4(),
            first_lba,
            last_lba,
            attributes: 0,
            name: name.to_string(),
            sector_size: crate::DEFAULT_SECTOR_SIZE,
        }
    }

    /// Unused slot.
    pub fn empty(sector_size: u64) -> Self {
        Self {
            type_guid: Uuid::nil(),
            unique_guid: Uuid::nil(),
            first_lba: 0,
            last_lba: 0,
            attributes: 0,
            name: String::new(),
            sector_size,
        }
    }

    pub fn parse(slot: &[u8], sector_size: u64) -> PartResult<Self> {
        if slot.len() < GPT_ENTRY_SIZE as usize {
            return Err(PartError::BufferTooSmall {
                needed: GPT_ENTRY_SIZE as usize,
                got: slot.len(),
            });
        }
        Ok(Self {
            type_guid: read_guid(slot, ENT_TYPE_GUID)?,
            unique_guid: read_guid(slot, ENT_UNIQUE_GUID)?,
            first_lba: bytes::read_u64_le(slot, ENT_FIRST_LBA)?,
            last_lba: bytes::read_u64_le(slot, ENT_LAST_LBA)?,
            attributes: bytes::read_u64_le(slot, ENT_ATTRIBUTES)?,
            name: bytes::read_utf16_name(slot, ENT_NAME, GPT_NAME_FIELD_LEN)?,
            sector_size,
        })
    }

    /// Encodes the 128 defined bytes of the slot. Names over 36 UTF-16 units are cut.
    pub fn write_to(&self, slot: &mut [u8]) -> PartResult<()> {
        write_guid(slot, ENT_TYPE_GUID, &self.type_guid)?;
        write_guid(slot, ENT_UNIQUE_GUID, &self.unique_guid)?;
        bytes::write_u64_le(slot, ENT_FIRST_LBA, self.first_lba)?;
        bytes::write_u64_le(slot, ENT_LAST_LBA, self.last_lba)?;
        bytes::write_u64_le(slot, ENT_ATTRIBUTES, self.attributes)?;
        bytes::write_utf16_name(slot, ENT_NAME, GPT_NAME_FIELD_LEN, &self.name)?;
        Ok(())
    }

    #[inline]
    pub fn has_data(&self) -> bool {
        !self.type_guid.is_nil()
    }

    #[inline]
    pub fn total_sectors(&self) -> u64 {
        if !self.has_data() {
            return 0;
        }
        self.last_lba
            .checked_sub(self.first_lba)
            .map_or(0, |span| span + 1)
    }

    #[inline]
    pub fn total_bytes(&self) -> u64 {
        self.total_sectors().saturating_mul(self.sector_size)
    }

    #[inline]
    pub fn kind(&self) -> GptPartitionKind {
        GptPartitionKind::from_guid(&self.type_guid)
    }

    pub fn extent(&self) -> Option<PartitionExtent> {
        if self.total_sectors() == 0 {
            return None;
        }
        Some(PartitionExtent {
            offset: self.first_lba.saturating_mul(self.sector_size),
            length: self.total_bytes(),
        })
    }
}

/// Decoded header plus every slot of the entry array, unused ones included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GptTable {
    pub header: GptHeader,
    pub entries: Vec<GptPartitionEntry>,
    pub sector_size: u64,
}

impl GptTable {
    #[inline]
    pub fn array_length(&self) -> u64 {
        self.header.array_length()
    }

    /// Header sector plus entry array, the size of the in-memory buffer.
    #[inline]
    pub fn total_length(&self) -> u64 {
        self.sector_size + self.array_length()
    }

    pub fn used_entries(&self) -> impl Iterator<Item = &GptPartitionEntry> {
        self.entries.iter().filter(|e| e.has_data())
    }

    pub fn partition_extents(&self) -> Vec<PartitionExtent> {
        self.used_entries().filter_map(|e| e.extent()).collect()
    }

    /// Partitions must be ordered LBA ranges inside the usable area, without overlap.
    pub fn validate_entries(&self) -> PartResult<()> {
        let mut segs: Vec<(u64, u64)> = Vec::new();
        for e in self.used_entries() {
            if e.last_lba < e.first_lba {
                return Err(GptError::Entry("GPT: partition ends before it starts").into());
            }
            if e.first_lba < self.header.first_usable_lba {
                return Err(
                    GptError::Entry("GPT: partition starts before first usable LBA").into(),
                );
            }
            if e.last_lba > self.header.last_usable_lba {
                return Err(GptError::Entry("GPT: partition ends after last usable LBA").into());
            }
            segs.push((e.first_lba, e.last_lba));
        }

        segs.sort_unstable_by_key(|s| s.0);
        if segs.windows(2).any(|w| w[1].0 <= w[0].1) {
            return Err(GptError::Entry("GPT: partition overlap detected").into());
        }
        Ok(())
    }
}

/// Byte range of the entry array on the device, from the first parse phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArrayLocation {
    pub byte_offset: u64,
    pub byte_length: u64,
}

/// Canonical LBAs of a GPT pair on a disk of a given size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GptLayout {
    pub total_lba: u64,
    pub array_sectors: u64,
    pub primary_header_lba: u64,
    pub primary_entries_lba: u64,
    pub first_usable_lba: u64,
    pub last_usable_lba: u64,
    pub backup_entries_lba: u64,
    pub backup_header_lba: u64,
}

impl GptLayout {
    pub fn new(disk_size: u64, sector_size: u64, array_bytes: u64) -> PartResult<Self> {
        if sector_size < crate::MIN_SECTOR_SIZE {
            return Err(PartError::Invalid("GPT: sector size below 512 bytes"));
        }
        let total_lba = disk_size / sector_size;
        let array_sectors = array_bytes
            .div_ceil(sector_size)
            .max(GPT_MIN_ARRAY_BYTES / sector_size);

        let first_usable_lba = GPT_PRIMARY_ENTRIES_LBA + array_sectors;
        let too_small = GptError::DiskTooSmall { total_lba };
        let backup_header_lba = total_lba.checked_sub(1).ok_or(too_small)?;
        let backup_entries_lba = backup_header_lba
            .checked_sub(array_sectors)
            .ok_or(too_small)?;
        let last_usable_lba = backup_entries_lba.checked_sub(1).ok_or(too_small)?;
        if last_usable_lba < first_usable_lba {
            return Err(too_small.into());
        }

        Ok(Self {
            total_lba,
            array_sectors,
            primary_header_lba: GPT_PRIMARY_HEADER_LBA,
            primary_entries_lba: GPT_PRIMARY_ENTRIES_LBA,
            first_usable_lba,
            last_usable_lba,
            backup_entries_lba,
            backup_header_lba,
        })
    }

    pub fn apply_primary(&self, header: &mut GptHeader) {
        header.current_lba = self.primary_header_lba;
        header.backup_lba = self.backup_header_lba;
        header.entries_lba = self.primary_entries_lba;
        header.first_usable_lba = self.first_usable_lba;
        header.last_usable_lba = self.last_usable_lba;
    }

    pub fn apply_backup(&self, header: &mut GptHeader) {
        header.current_lba = self.backup_header_lba;
        header.backup_lba = self.primary_header_lba;
        header.entries_lba = self.backup_entries_lba;
        header.first_usable_lba = self.first_usable_lba;
        header.last_usable_lba = self.last_usable_lba;
    }
}

/// Primary and backup tables with their encoded buffers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GptMirror {
    pub primary: GptTable,
    pub primary_raw: Vec<u8>,
    pub backup: GptTable,
    pub backup_raw: Vec<u8>,
}

impl GptMirror {
    /// Checks the cross links and that both copies describe the same partitions.
    pub fn validate_mirror(&self) -> PartResult<()> {
        let p = &self.primary.header;
        let b = &self.backup.header;
        if p.current_lba != b.backup_lba || b.current_lba != p.backup_lba {
            return Err(GptError::MirrorMismatch("GPT: primary/backup LBAs not cross-linked").into());
        }
        if p.first_usable_lba != b.first_usable_lba || p.last_usable_lba != b.last_usable_lba {
            return Err(GptError::MirrorMismatch("GPT: usable range differs between copies").into());
        }
        if p.num_entries != b.num_entries || p.entry_size != b.entry_size {
            return Err(GptError::MirrorMismatch("GPT: entry array geometry differs").into());
        }
        let same = self
            .primary
            .entries
            .iter()
            .zip(&self.backup.entries)
            .all(|(x, y)| {
                x.type_guid == y.type_guid
                    && x.first_lba == y.first_lba
                    && x.last_lba == y.last_lba
                    && x.attributes == y.attributes
                    && x.name == y.name
            });
        if !same {
            return Err(GptError::MirrorMismatch("GPT: partition entries differ").into());
        }
        Ok(())
    }
}

/// Stateless GPT codec bound to a logical sector size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GptCodec {
    sector_size: u64,
}

impl GptCodec {
    pub fn new(sector_size: u64) -> PartResult<Self> {
        if sector_size < crate::MIN_SECTOR_SIZE {
            return Err(PartError::Invalid("GPT: sector size below 512 bytes"));
        }
        Ok(Self { sector_size })
    }

    #[inline]
    pub fn sector_size(&self) -> u64 {
        self.sector_size
    }

    #[inline]
    fn ss(&self) -> usize {
        self.sector_size as usize
    }

    fn parse_header_sector(&self, header_sector: &[u8]) -> PartResult<GptHeader> {
        if header_sector.len() < self.ss() {
            return Err(PartError::BufferTooSmall {
                needed: self.ss(),
                got: header_sector.len(),
            });
        }
        let header = GptHeader::parse(header_sector)?;
        header.check_geometry()?;
        Ok(header)
    }

    /// First phase: where the entry array lives on the device.
    pub fn locate_entry_array(&self, header_sector: &[u8]) -> PartResult<ArrayLocation> {
        let header = self.parse_header_sector(header_sector)?;
        let byte_offset = header
            .entries_lba
            .checked_mul(self.sector_size)
            .ok_or(PartError::Invalid("GPT: entry array offset overflow"))?;
        Ok(ArrayLocation {
            byte_offset,
            byte_length: header.array_length(),
        })
    }

    /// Second phase: decodes header and every entry slot from `raw`
    /// (header sector followed by the entry array).
    ///
    /// Signature and checksums are not checked here, see [`GptCodec::validate`].
    pub fn parse(&self, raw: &[u8]) -> PartResult<GptTable> {
        let header = self.parse_header_sector(raw)?;
        let array_len = header.array_length() as usize;
        let needed = self.ss() + array_len;
        if raw.len() < needed {
            return Err(PartError::BufferTooSmall {
                needed,
                got: raw.len(),
            });
        }

        let array = &raw[self.ss()..needed];
        let entries = array
            .chunks_exact(header.entry_size as usize)
            .map(|slot| GptPartitionEntry::parse(slot, self.sector_size))
            .collect::<PartResult<Vec<_>>>()?;

        Ok(GptTable {
            header,
            entries,
            sector_size: self.sector_size,
        })
    }

    /// Signature, header size, header CRC and entry-array CRC.
    pub fn validate(&self, raw: &[u8]) -> PartResult<()> {
        let header = self.parse_header_sector(raw)?;
        if !header.has_valid_signature() {
            return Err(GptError::InvalidSignature.into());
        }
        if header.header_size < GPT_HEADER_SIZE || header.header_size as u64 > self.sector_size {
            return Err(GptError::InvalidHeaderSize {
                got: header.header_size,
            }
            .into());
        }

        let computed = compute_header_crc(&raw[..self.ss()], header.header_size)?;
        if computed != header.header_crc32 {
            return Err(GptError::HeaderCrcMismatch {
                stored: header.header_crc32,
                computed,
            }
            .into());
        }

        let computed = crc32::calculate(raw, self.ss(), header.array_length() as usize)?;
        if computed != header.entries_crc32 {
            return Err(GptError::EntriesCrcMismatch {
                stored: header.entries_crc32,
                computed,
            }
            .into());
        }
        Ok(())
    }

    /// Encodes `table` over a copy of `raw` and refreshes both checksums.
    ///
    /// Bytes the table does not model (header padding, reserved entry tails,
    /// slots past `table.entries`) are carried over from `raw`. The array CRC
    /// is written before the header CRC, which covers it.
    pub fn reconstruct(&self, raw: &[u8], table: &GptTable) -> PartResult<Vec<u8>> {
        let header = &table.header;
        header.check_geometry()?;
        let array_len = header.array_length() as usize;
        let total = self.ss() + array_len;

        let mut out = raw[..total.min(raw.len())].to_vec();
        out.resize(total, 0);

        header.write_to(&mut out[..self.ss()])?;

        let entry_size = header.entry_size as usize;
        for (slot, entry) in out[self.ss()..]
            .chunks_exact_mut(entry_size)
            .zip(&table.entries)
        {
            entry.write_to(slot)?;
        }

        let table_crc = crc32::calculate(&out, self.ss(), array_len)?;
        bytes::write_u32_le(&mut out, HDR_ENTRIES_CRC, table_crc)?;

        bytes::write_u32_le(&mut out, HDR_CRC, 0)?;
        let header_crc = compute_header_crc(&out[..self.ss()], header.header_size)?;
        bytes::write_u32_le(&mut out, HDR_CRC, header_crc)?;

        Ok(out)
    }

    fn relocate_one(
        &self,
        raw: &[u8],
        layout: &GptLayout,
        primary: bool,
    ) -> PartResult<(GptTable, Vec<u8>)> {
        let mut table = self.parse(raw)?;
        if primary {
            layout.apply_primary(&mut table.header);
        } else {
            layout.apply_backup(&mut table.header);
        }

        for e in table.entries.iter_mut().filter(|e| e.has_data()) {
            e.unique_guid = Uuid::new_v4();
            if e.last_lba > layout.last_usable_lba {
                log::warn!(
                    "gpt: partition {:?} ends at LBA {} past last usable LBA {}",
                    e.name,
                    e.last_lba,
                    layout.last_usable_lba
                );
            }
        }

        let out = self.reconstruct(raw, &table)?;
        let table = self.parse(&out)?;
        Ok((table, out))
    }

    /// Rebuilds a primary/backup pair for a disk of `disk_size` bytes.
    ///
    /// Both copies get the canonical layout, cross-linked header LBAs, fresh
    /// unique GUIDs for every used entry, and recomputed checksums.
    pub fn relocate_pair(
        &self,
        primary_raw: &[u8],
        backup_raw: &[u8],
        disk_size: u64,
    ) -> PartResult<GptMirror> {
        let primary_header = self.parse_header_sector(primary_raw)?;
        let backup_header = self.parse_header_sector(backup_raw)?;
        if primary_header.num_entries != backup_header.num_entries
            || primary_header.entry_size != backup_header.entry_size
        {
            return Err(GptError::MirrorMismatch(
                "GPT: entry array geometry differs between primary and backup",
            )
            .into());
        }
        let layout = GptLayout::new(disk_size, self.sector_size, primary_header.array_length())?;

        let (primary, primary_raw) = self.relocate_one(primary_raw, &layout, true)?;
        let (backup, backup_raw) = self.relocate_one(backup_raw, &layout, false)?;

        log::debug!(
            "gpt: relocated pair to {} sectors (usable {}..={}, backup header at {})",
            layout.total_lba,
            layout.first_usable_lba,
            layout.last_usable_lba,
            layout.backup_header_lba
        );

        Ok(GptMirror {
            primary,
            primary_raw,
            backup,
            backup_raw,
        })
    }

    /// Builds a brand new GPT pair (128 x 128-byte entries) holding `partitions`.
    pub fn create_mirror(
        &self,
        disk_size: u64,
        disk_guid: Uuid,
        partitions: &[GptPartitionEntry],
    ) -> PartResult<GptMirror> {
        let mut header = GptHeader::new(disk_guid);
        if partitions.len() > header.num_entries as usize {
            return Err(GptError::InvalidEntryGeometry {
                count: partitions.len() as u32,
                size: header.entry_size,
            }
            .into());
        }
        let layout = GptLayout::new(disk_size, self.sector_size, header.array_length())?;

        let mut entries: Vec<GptPartitionEntry> = partitions
            .iter()
            .cloned()
            .map(|mut e| {
                e.sector_size = self.sector_size;
                e
            })
            .collect();
        entries.resize(
            header.num_entries as usize,
            GptPartitionEntry::empty(self.sector_size),
        );

        layout.apply_primary(&mut header);
        let primary_table = GptTable {
            header,
            entries,
            sector_size: self.sector_size,
        };
        let primary_raw = self.reconstruct(&[], &primary_table)?;

        let mut backup_table = primary_table.clone();
        layout.apply_backup(&mut backup_table.header);
        let backup_raw = self.reconstruct(&[], &backup_table)?;

        Ok(GptMirror {
            primary: self.parse(&primary_raw)?,
            primary_raw,
            backup: self.parse(&backup_raw)?,
            backup_raw,
        })
    }
}

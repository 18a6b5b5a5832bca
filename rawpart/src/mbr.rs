// SPDX-License-Identifier: MIT

use core::fmt;

use rawio::bytes;
use uuid::Uuid;
use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::errors::*;
use crate::utils::PartitionExtent;

pub const MBR_SIZE: usize = 512;
pub const MBR_BOOT_SIGNATURE: u16 = 0xAA55;
pub const MBR_ENTRY_SIZE: usize = 16;
pub const MBR_ENTRY_COUNT: usize = 4;
pub const PROTECTIVE_GPT: u8 = 0xEE;

pub const BOOTSTRAP_1_LEN: usize = 218;
pub const TIMESTAMP_OFFSET: usize = 0x0DA;
pub const BOOTSTRAP_2_OFFSET: usize = 0x0E0;
pub const BOOTSTRAP_2_LEN: usize = 216;
pub const DISK_SIGNATURE_OFFSET: usize = 0x1B8;
pub const COPY_PROTECT_OFFSET: usize = 0x1BC;
pub const ENTRIES_OFFSET: usize = 0x1BE;
pub const BOOT_SIGNATURE_OFFSET: usize = 0x1FE;

/// Bytes rewritten by [`regenerate_disk_signature`]: signature plus copy-protect word.
pub const SIGNATURE_REGION_LEN: usize = 6;

/// Packed cylinder/head/sector triple as stored on disk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Chs {
    pub head: u8,
    /// Sector number in bits 0..6, cylinder bits 8..10 in bits 6..8.
    pub sector_raw: u8,
    pub cylinder_low: u8,
}

impl Chs {
    pub const MAX: Chs = Chs {
        head: 0xFE,
        sector_raw: 0xFF,
        cylinder_low: 0xFF,
    };

    #[inline]
    pub fn from_bytes(b: [u8; 3]) -> Self {
        Self {
            head: b[0],
            sector_raw: b[1],
            cylinder_low: b[2],
        }
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; 3] {
        [self.head, self.sector_raw, self.cylinder_low]
    }

    #[inline]
    pub fn sector(&self) -> u8 {
        self.sector_raw & 0x3F
    }

    /// 10-bit cylinder number.
    #[inline]
    pub fn cylinder(&self) -> u16 {
        (((self.sector_raw & 0xC0) as u16) << 2) | self.cylinder_low as u16
    }
}

impl fmt::Display for Chs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C:{} H:{} S:{}", self.cylinder(), self.head, self.sector())
    }
}

/// Generates the MBR partition-type catalog.
macro_rules! define_mbr_kinds {
    ($($name:ident = $code:expr => $desc:expr),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum MbrPartitionKind {
            $($name,)+
            Unknown(u8),
        }

        impl MbrPartitionKind {
            pub fn from_byte(code: u8) -> Self {
                match code {
                    $($code => Self::$name,)+
                    other => Self::Unknown(other),
                }
            }

            pub fn as_byte(&self) -> u8 {
                match self {
                    $(Self::$name => $code,)+
                    Self::Unknown(code) => *code,
                }
            }
        }

        impl fmt::Display for MbrPartitionKind {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$name => write!(f, $desc),)+
                    Self::Unknown(code) => write!(f, "Unknown ({code:#04X})"),
                }
            }
        }
    };
}

define_mbr_kinds! {
    Empty = 0x00 => "Empty",
    Fat12 = 0x01 => "FAT12",
    Fat16 = 0x04 => "FAT16",
    Extended = 0x05 => "Extended",
    Fat16B = 0x06 => "Huge (FAT16B)",
    Ntfs = 0x07 => "IFS (NTFS/exFAT)",
    Fat32 = 0x0B => "FAT32",
    Fat32Lba = 0x0C => "FAT32 (LBA)",
    Fat16Lba = 0x0E => "FAT16 (LBA)",
    ExtendedLba = 0x0F => "Extended (LBA)",
    LinuxSwap = 0x82 => "Linux swap",
    Linux = 0x83 => "Linux",
    LinuxLvm = 0x8E => "Linux LVM",
    ProtectiveGpt = 0xEE => "GPT protective",
    EfiSystem = 0xEF => "EFI system",
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
struct RawMbrEntry {
    status: u8,
    first_chs: [u8; 3],
    kind: u8,
    last_chs: [u8; 3],
    first_lba: U32<LittleEndian>,
    sector_count: U32<LittleEndian>,
}

/// One of the four primary partition slots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MbrPartitionEntry {
    pub status: u8,
    pub first_chs: Chs,
    pub kind: u8,
    pub last_chs: Chs,
    pub first_lba: u32,
    pub sector_count: u32,
}

impl MbrPartitionEntry {
    /// Decodes a 16-byte slot.
    pub fn parse(slot: &[u8]) -> PartResult<Self> {
        let raw = RawMbrEntry::read_from_bytes(slot).map_err(|_| PartError::BufferTooSmall {
            needed: MBR_ENTRY_SIZE,
            got: slot.len(),
        })?;
        Ok(Self {
            status: raw.status,
            first_chs: Chs::from_bytes(raw.first_chs),
            kind: raw.kind,
            last_chs: Chs::from_bytes(raw.last_chs),
            first_lba: raw.first_lba.get(),
            sector_count: raw.sector_count.get(),
        })
    }

    pub fn to_bytes(&self) -> [u8; MBR_ENTRY_SIZE] {
        let raw = RawMbrEntry {
            status: self.status,
            first_chs: self.first_chs.to_bytes(),
            kind: self.kind,
            last_chs: self.last_chs.to_bytes(),
            first_lba: U32::new(self.first_lba),
            sector_count: U32::new(self.sector_count),
        };
        let mut out = [0u8; MBR_ENTRY_SIZE];
        out.copy_from_slice(raw.as_bytes());
        out
    }

    /// Single 0xEE entry spanning the disk (clamped at 2 TiB of 512-byte sectors).
    pub fn new_protective(total_sectors: u64) -> Self {
        let sectors = total_sectors.saturating_sub(1).min(u32::MAX as u64) as u32;
        Self {
            status: 0x00,
            first_chs: Chs::from_bytes([0x00, 0x02, 0x00]),
            kind: PROTECTIVE_GPT,
            last_chs: Chs::MAX,
            first_lba: 1,
            sector_count: sectors,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kind == 0
    }

    #[inline]
    pub fn is_bootable(&self) -> bool {
        self.status == 0x80
    }

    #[inline]
    pub fn is_protective(&self) -> bool {
        self.kind == PROTECTIVE_GPT
    }

    #[inline]
    pub fn partition_kind(&self) -> MbrPartitionKind {
        MbrPartitionKind::from_byte(self.kind)
    }

    pub fn validate(&self) -> PartResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        if self.status != 0x00 && self.status != 0x80 {
            return Err(MbrError::InvalidBootFlag { got: self.status }.into());
        }
        if self.sector_count == 0 {
            return Err(MbrError::ZeroSectors.into());
        }
        Ok(())
    }

    /// Byte extent on a disk with the given sector size, `None` for empty slots.
    pub fn extent(&self, sector_size: u64) -> Option<PartitionExtent> {
        if self.is_empty() || self.sector_count == 0 {
            return None;
        }
        Some(PartitionExtent {
            offset: self.first_lba as u64 * sector_size,
            length: self.sector_count as u64 * sector_size,
        })
    }
}

/// Timestamp area at 0x0DA (Windows 95B/98/ME disk timestamp).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MbrTimestamp {
    pub raw: [u8; 6],
}

impl MbrTimestamp {
    /// Reserved word, zero when the timestamp is in use.
    #[inline]
    pub fn timestamp_word(&self) -> u16 {
        u16::from_le_bytes([self.raw[0], self.raw[1]])
    }

    #[inline]
    pub fn original_drive(&self) -> u8 {
        self.raw[2]
    }

    #[inline]
    pub fn seconds(&self) -> u8 {
        self.raw[3]
    }

    #[inline]
    pub fn minutes(&self) -> u8 {
        self.raw[4]
    }

    #[inline]
    pub fn hours(&self) -> u8 {
        self.raw[5]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbrKind {
    Empty,
    Protective,
    Legacy,
}

/// Decoded 512-byte master boot record.
///
/// Every byte of the sector belongs to exactly one field, so
/// `parse` followed by `to_bytes` reproduces the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MbrRecord {
    pub bootstrap_code_1: [u8; BOOTSTRAP_1_LEN],
    pub timestamp: MbrTimestamp,
    pub bootstrap_code_2: [u8; BOOTSTRAP_2_LEN],
    /// `None` when the on-disk signature is zero.
    pub disk_signature: Option<u32>,
    pub copy_protect: u16,
    pub entries: [MbrPartitionEntry; MBR_ENTRY_COUNT],
    pub boot_signature: u16,
}

impl MbrRecord {
    pub fn parse(buf: &[u8]) -> PartResult<Self> {
        if buf.len() < MBR_SIZE {
            return Err(PartError::BufferTooSmall {
                needed: MBR_SIZE,
                got: buf.len(),
            });
        }

        let mut entries = [MbrPartitionEntry::default(); MBR_ENTRY_COUNT];
        for (i, entry) in entries.iter_mut().enumerate() {
            let slot = bytes::read_bytes(buf, ENTRIES_OFFSET + i * MBR_ENTRY_SIZE, MBR_ENTRY_SIZE)?;
            *entry = MbrPartitionEntry::parse(slot)?;
        }

        let signature = bytes::read_u32_le(buf, DISK_SIGNATURE_OFFSET)?;

        Ok(Self {
            bootstrap_code_1: bytes::read_array(buf, 0)?,
            timestamp: MbrTimestamp {
                raw: bytes::read_array(buf, TIMESTAMP_OFFSET)?,
            },
            bootstrap_code_2: bytes::read_array(buf, BOOTSTRAP_2_OFFSET)?,
            disk_signature: (signature != 0).then_some(signature),
            copy_protect: bytes::read_u16_le(buf, COPY_PROTECT_OFFSET)?,
            entries,
            boot_signature: bytes::read_u16_le(buf, BOOT_SIGNATURE_OFFSET)?,
        })
    }

    pub fn new_protective(total_sectors: u64) -> Self {
        let mut entries = [MbrPartitionEntry::default(); MBR_ENTRY_COUNT];
        entries[0] = MbrPartitionEntry::new_protective(total_sectors);
        Self {
            bootstrap_code_1: [0u8; BOOTSTRAP_1_LEN],
            timestamp: MbrTimestamp::default(),
            bootstrap_code_2: [0u8; BOOTSTRAP_2_LEN],
            disk_signature: None,
            copy_protect: 0,
            entries,
            boot_signature: MBR_BOOT_SIGNATURE,
        }
    }

    #[inline]
    pub fn has_valid_signature(&self) -> bool {
        self.boot_signature == MBR_BOOT_SIGNATURE
    }

    pub fn validate(&self) -> PartResult<()> {
        if !self.has_valid_signature() {
            return Err(MbrError::InvalidSignature {
                expected: MBR_BOOT_SIGNATURE,
                found: self.boot_signature,
            }
            .into());
        }
        Ok(())
    }

    pub fn validate_entries(&self) -> PartResult<()> {
        self.entries.iter().try_for_each(|e| e.validate())
    }

    #[inline]
    pub fn first_non_empty(&self) -> Option<&MbrPartitionEntry> {
        self.entries.iter().find(|e| !e.is_empty())
    }

    pub fn kind(&self) -> MbrKind {
        match self.first_non_empty() {
            None => MbrKind::Empty,
            Some(e) if e.is_protective() => MbrKind::Protective,
            Some(_) => MbrKind::Legacy,
        }
    }

    /// Stretches the protective entry over a disk of `total_sectors`.
    /// Returns false, leaving the record untouched, when it is not protective.
    pub fn fit_protective(&mut self, total_sectors: u64) -> bool {
        match self.entries.iter_mut().find(|e| !e.is_empty()) {
            Some(e) if e.is_protective() => {
                e.sector_count = MbrPartitionEntry::new_protective(total_sectors).sector_count;
                true
            }
            _ => false,
        }
    }

    pub fn partition_extents(&self, sector_size: u64) -> Vec<PartitionExtent> {
        self.entries
            .iter()
            .filter(|e| !e.is_protective())
            .filter_map(|e| e.extent(sector_size))
            .collect()
    }

    pub fn to_bytes(&self) -> [u8; MBR_SIZE] {
        let mut out = [0u8; MBR_SIZE];
        out[..BOOTSTRAP_1_LEN].copy_from_slice(&self.bootstrap_code_1);
        out[TIMESTAMP_OFFSET..BOOTSTRAP_2_OFFSET].copy_from_slice(&self.timestamp.raw);
        out[BOOTSTRAP_2_OFFSET..DISK_SIGNATURE_OFFSET].copy_from_slice(&self.bootstrap_code_2);
        out[DISK_SIGNATURE_OFFSET..COPY_PROTECT_OFFSET]
            .copy_from_slice(&self.disk_signature.unwrap_or(0).to_le_bytes());
        out[COPY_PROTECT_OFFSET..ENTRIES_OFFSET].copy_from_slice(&self.copy_protect.to_le_bytes());
        for (i, e) in self.entries.iter().enumerate() {
            let off = ENTRIES_OFFSET + i * MBR_ENTRY_SIZE;
            out[off..off + MBR_ENTRY_SIZE].copy_from_slice(&e.to_bytes());
        }
        out[BOOT_SIGNATURE_OFFSET..].copy_from_slice(&self.boot_signature.to_le_bytes());
        out
    }

    /// Encodes into the first 512 bytes of `buf`.
    pub fn write_to(&self, buf: &mut [u8]) -> PartResult<()> {
        bytes::write_bytes(buf, 0, &self.to_bytes())?;
        Ok(())
    }

    /// Fresh random disk signature, keeping the in-memory record in sync
    /// with what [`regenerate_disk_signature`] would write.
    pub fn regenerate_signature(&mut self) -> [u8; SIGNATURE_REGION_LEN] {
        let fresh = random_signature();
        let sig = u32::from_le_bytes([fresh[0], fresh[1], fresh[2], fresh[3]]);
        self.disk_signature = (sig != 0).then_some(sig);
        self.copy_protect = u16::from_le_bytes([fresh[4], fresh[5]]);
        fresh
    }
}

fn random_signature() -> [u8; SIGNATURE_REGION_LEN] {
    let mut out = [0u8; SIGNATURE_REGION_LEN];
    out.copy_from_slice(&Uuid::new_v4().as_bytes()[..SIGNATURE_REGION_LEN]);
    out
}

/// Overwrites the six bytes at 0x1B8 with random data and returns them.
///
/// Gives a restored disk its own identity; nothing else in the sector changes.
pub fn regenerate_disk_signature(buf: &mut [u8]) -> PartResult<[u8; SIGNATURE_REGION_LEN]> {
    let fresh = random_signature();
    bytes::write_bytes(buf, DISK_SIGNATURE_OFFSET, &fresh)?;
    log::debug!("mbr: new disk signature {:02X?}", &fresh[..4]);
    Ok(fresh)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_sector() -> Vec<u8> {
        let mut buf: Vec<u8> = (0..MBR_SIZE).map(|i| (i % 233) as u8).collect();
        buf[DISK_SIGNATURE_OFFSET..COPY_PROTECT_OFFSET].copy_from_slice(&0x1234_5678u32.to_le_bytes());
        buf[COPY_PROTECT_OFFSET..ENTRIES_OFFSET].fill(0);
        let linux = MbrPartitionEntry {
            status: 0x80,
            first_chs: Chs::from_bytes([0x20, 0x21, 0x00]),
            kind: 0x83,
            last_chs: Chs::MAX,
            first_lba: 2048,
            sector_count: 4096,
        };
        buf[ENTRIES_OFFSET..ENTRIES_OFFSET + 16].copy_from_slice(&linux.to_bytes());
        buf[ENTRIES_OFFSET + 16..BOOT_SIGNATURE_OFFSET].fill(0);
        buf[BOOT_SIGNATURE_OFFSET..].copy_from_slice(&[0x55, 0xAA]);
        buf
    }

    #[test]
    fn parse_then_serialize_is_identity() {
        let buf = legacy_sector();
        let mbr = MbrRecord::parse(&buf).unwrap();
        mbr.validate().unwrap();
        assert_eq!(&mbr.to_bytes()[..], &buf[..]);
    }

    #[test]
    fn decodes_fields() {
        let mbr = MbrRecord::parse(&legacy_sector()).unwrap();
        assert_eq!(mbr.disk_signature, Some(0x1234_5678));
        assert_eq!(mbr.kind(), MbrKind::Legacy);

        let e = mbr.entries[0];
        assert!(e.is_bootable());
        assert_eq!(e.partition_kind(), MbrPartitionKind::Linux);
        assert_eq!(e.first_lba, 2048);
        assert_eq!(e.sector_count, 4096);
        assert_eq!(e.first_chs.sector(), 33);
        assert_eq!(e.last_chs.sector(), 63);
        assert_eq!(e.last_chs.cylinder(), 1023);
        assert_eq!(e.last_chs.to_string(), "C:1023 H:254 S:63");
        assert!(mbr.entries[1].is_empty());

        assert_eq!(
            mbr.partition_extents(512),
            vec![PartitionExtent {
                offset: 2048 * 512,
                length: 4096 * 512
            }]
        );
    }

    #[test]
    fn timestamp_accessors() {
        let mut buf = legacy_sector();
        buf[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 6].copy_from_slice(&[0, 0, 0x80, 12, 34, 5]);
        let ts = MbrRecord::parse(&buf).unwrap().timestamp;
        assert_eq!(ts.timestamp_word(), 0);
        assert_eq!(ts.original_drive(), 0x80);
        assert_eq!((ts.hours(), ts.minutes(), ts.seconds()), (5, 34, 12));
    }

    #[test]
    fn signature_regeneration_touches_six_bytes() {
        let original = legacy_sector();
        let mut buf = original.clone();
        let fresh = regenerate_disk_signature(&mut buf).unwrap();

        assert_eq!(&buf[DISK_SIGNATURE_OFFSET..ENTRIES_OFFSET], &fresh);
        assert_eq!(&buf[..DISK_SIGNATURE_OFFSET], &original[..DISK_SIGNATURE_OFFSET]);
        assert_eq!(&buf[ENTRIES_OFFSET..], &original[ENTRIES_OFFSET..]);
    }

    #[test]
    fn record_regeneration_matches_layout() {
        let mut mbr = MbrRecord::parse(&legacy_sector()).unwrap();
        let fresh = mbr.regenerate_signature();
        let out = mbr.to_bytes();
        assert_eq!(&out[DISK_SIGNATURE_OFFSET..ENTRIES_OFFSET], &fresh);
    }

    #[test]
    fn bad_boot_signature() {
        let mut buf = legacy_sector();
        buf[BOOT_SIGNATURE_OFFSET..].fill(0);
        let mbr = MbrRecord::parse(&buf).unwrap();
        assert_eq!(
            mbr.validate(),
            Err(PartError::Mbr(MbrError::InvalidSignature {
                expected: 0xAA55,
                found: 0
            }))
        );
    }

    #[test]
    fn short_buffer_is_rejected() {
        assert_eq!(
            MbrRecord::parse(&[0u8; 511]),
            Err(PartError::BufferTooSmall {
                needed: 512,
                got: 511
            })
        );
    }

    #[test]
    fn entry_validation() {
        let mut mbr = MbrRecord::parse(&legacy_sector()).unwrap();
        mbr.validate_entries().unwrap();

        mbr.entries[0].status = 0x12;
        assert!(matches!(
            mbr.validate_entries(),
            Err(PartError::Mbr(MbrError::InvalidBootFlag { got: 0x12 }))
        ));

        mbr.entries[0].status = 0;
        mbr.entries[0].sector_count = 0;
        assert_eq!(mbr.validate_entries(), Err(PartError::Mbr(MbrError::ZeroSectors)));
    }

    #[test]
    fn protective_record() {
        let mbr = MbrRecord::new_protective(2048);
        assert_eq!(mbr.kind(), MbrKind::Protective);
        assert_eq!(mbr.entries[0].sector_count, 2047);
        assert!(mbr.partition_extents(512).is_empty());

        let mut parsed = MbrRecord::parse(&mbr.to_bytes()).unwrap();
        assert_eq!(parsed, mbr);
        assert!(parsed.fit_protective(4096));
        assert_eq!(parsed.entries[0].sector_count, 4095);

        let mut legacy = MbrRecord::parse(&legacy_sector()).unwrap();
        assert!(!legacy.fit_protective(4096));
        assert_eq!(legacy.entries[0].sector_count, 4096);
        assert_eq!(MbrRecord::new_protective(u64::MAX).entries[0].sector_count, u32::MAX);
        assert_eq!(MbrPartitionKind::from_byte(0xEE).to_string(), "GPT protective");
    }
}

// SPDX-License-Identifier: MIT

define_partition_types! {
    EFI => "EFI System Partition", 0xC12A7328_F81F_11D2_BA4B_00A0C93EC93B,
    MICROSOFT_RESERVED => "Microsoft Reserved Partition", 0xE3C9E316_0B5C_4DB8_817D_F92DF00215AE,
    BASIC_DATA => "Basic Data Partition", 0xEBD0A0A2_B9E5_4433_87C0_68B6B72699C7,
    LDM_METADATA => "LDM Metadata Partition", 0x5808C8AA_7E8F_42E0_85D2_E1E90434CFB3,
    LDM_DATA => "LDM Data Partition", 0xAF9B60A0_1431_4F62_BC68_3311714A69AD,
    MICROSOFT_RECOVERY => "Microsoft Recovery Partition", 0xDE94BBA4_06D1_4D40_A16A_BFD50179D6AC,
    LINUX_FS => "Linux Filesystem", 0x0FC63DAF_8483_4772_8E79_3D69D8477DE4,
    LINUX_SWAP => "Linux Swap", 0x0657FD6D_A4AB_43C4_84E5_0933C84B4F4F,
    BIOS_BOOT => "BIOS Boot Partition", 0x21686148_6449_6E6F_744E_656564454649,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpt::GptPartitionEntry;
    use uuid::Uuid;

    #[test]
    fn catalog_lookup() {
        let efi = Uuid::parse_str("c12a7328-f81f-11d2-ba4b-00a0c93ec93b").unwrap();
        assert_eq!(GPT_PARTITION_TYPE_EFI, efi);
        assert_eq!(GptPartitionKind::from_guid(&efi), GptPartitionKind::Efi);
        assert_eq!(GptPartitionKind::Efi.to_string(), "EFI System Partition");
        assert_eq!(GptPartitionKind::from_guid(&Uuid::nil()), GptPartitionKind::Unused);
        assert_eq!(
            GptPartitionKind::BasicData.as_guid(),
            Some(GPT_PARTITION_TYPE_BASIC_DATA)
        );
    }

    #[test]
    fn find_by_kind() {
        let mut data = GptPartitionEntry::new(GPT_PARTITION_TYPE_BASIC_DATA, 2048, 4095, "data");
        data.unique_guid = Uuid::from_u128(1);
        let esp = GptPartitionEntry::new(GPT_PARTITION_TYPE_EFI, 34, 2047, "esp");
        let entries = [esp, data];

        assert!(is_efi_partition(&entries[0]));
        assert_eq!(find_basic_data_partition(&entries).map(|e| e.first_lba), Some(2048));
        assert!(find_linux_swap_partition(&entries).is_none());
    }
}

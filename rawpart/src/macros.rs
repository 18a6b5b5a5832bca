// SPDX-License-Identifier: MIT

#[macro_export]
/// Defines a set of GPT partition types, along with associated constants, lookup functions, and an enum for partition kinds.
///
/// This macro generates:
/// - A `Uuid` constant for each partition type GUID.
/// - A function to check if a partition entry matches a given type.
/// - A function returning the first entry of a given type in a table.
/// - An enum `GptPartitionKind` representing all defined partition types and an `Unknown` variant for unrecognized GUIDs.
/// - Conversions between GUIDs and `GptPartitionKind`, and a `Display` implementation.
///
/// # Example
/// ```rust
/// use rawpart::define_partition_types;
///
/// define_partition_types! {
///     EFI => "EFI System Partition", 0xC12A7328_F81F_11D2_BA4B_00A0C93EC93B,
///     LINUX_FS => "Linux Filesystem", 0x0FC63DAF_8483_4772_8E79_3D69D8477DE4,
/// }
/// ```
///
/// # Parameters
/// - `$name`: Identifier for the partition type (used for enum variant and function/constant names).
/// - `$desc`: Description string for the partition type.
/// - `$guid`: the GUID as a `u128` in its canonical textual order.
///
/// # Generated Items
/// For each partition type:
/// - `pub const GPT_PARTITION_TYPE_<NAME>: Uuid`
/// - `pub fn is_<name>_partition(entry: &GptPartitionEntry) -> bool`
/// - `pub fn find_<name>_partition(entries: &[GptPartitionEntry]) -> Option<&GptPartitionEntry>`
///
/// # Note
/// This macro requires the `paste` and `uuid` crates.
macro_rules! define_partition_types {
    (
        $(
            $name:ident => $desc:expr, $guid:expr
        ),+ $(,)?
    ) => {
        paste::paste! {
            $(
                #[doc = $desc]
                pub const [<GPT_PARTITION_TYPE_ $name:upper>]: uuid::Uuid = uuid::Uuid::from_u128($guid);

                #[doc = concat!("Checks if a GPT partition is of type: ", $desc)]
                pub fn [<is_ $name:lower _partition>](
                    entry: &$crate::gpt::GptPartitionEntry,
                ) -> bool {
                    entry.type_guid == [<GPT_PARTITION_TYPE_ $name:upper>]
                }

                #[doc = concat!("Returns the first GPT partition of type: ", $desc)]
                pub fn [<find_ $name:lower _partition>](
                    entries: &[$crate::gpt::GptPartitionEntry],
                ) -> Option<&$crate::gpt::GptPartitionEntry> {
                    entries.iter().find(|e| [<is_ $name:lower _partition>](e))
                }
            )+

            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub enum GptPartitionKind {
                $([<$name:camel>],)+
                Unused,
                Unknown(uuid::Uuid),
            }

            impl GptPartitionKind {
                pub fn from_guid(guid: &uuid::Uuid) -> Self {
                    match *guid {
                        $(g if g == [<GPT_PARTITION_TYPE_ $name:upper>] => Self::[<$name:camel>],)+
                        g if g.is_nil() => Self::Unused,
                        other => Self::Unknown(other),
                    }
                }

                pub fn as_guid(&self) -> Option<uuid::Uuid> {
                    match self {
                        $(Self::[<$name:camel>] => Some([<GPT_PARTITION_TYPE_ $name:upper>]),)+
                        Self::Unused => Some(uuid::Uuid::nil()),
                        Self::Unknown(_) => None,
                    }
                }
            }

            impl core::fmt::Display for GptPartitionKind {
                fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                    match self {
                        $(Self::[<$name:camel>] => write!(f, $desc),)+
                        Self::Unused => write!(f, "Unused"),
                        Self::Unknown(guid) => write!(f, "Unknown ({guid})"),
                    }
                }
            }
        }
    };
}

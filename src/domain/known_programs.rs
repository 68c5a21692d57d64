//! Known Program Addresses
//!
//! Protocol and system accounts that show up in almost every transaction's
//! account list but never belong to a buyer. The address classifier rejects
//! anything listed here.

/// Native programs and sysvars filtered out of buyer candidates
pub const SYSTEM_PROGRAMS: &[&str] = &[
    // System Program
    "11111111111111111111111111111111",
    // SPL Token Program
    "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
    // Associated Token Account Program
    "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL",
    // Compute Budget Program
    "ComputeBudget111111111111111111111111111111",
    // Sysvar Rent
    "SysvarRent111111111111111111111111111111111",
    // Sysvar Clock
    "SysvarC1ock11111111111111111111111111111111",
    // Vote Program
    "Vote111111111111111111111111111111111111111",
    // Stake Program
    "Stake11111111111111111111111111111111111111",
    // Config Program
    "Config1111111111111111111111111111111111111",
    // BPF Upgradeable Loader
    "BPFLoaderUpgradeab1e11111111111111111111111",
];

/// Check if an address is a listed system program or sysvar
pub fn is_system_program(address: &str) -> bool {
    SYSTEM_PROGRAMS.contains(&address)
}

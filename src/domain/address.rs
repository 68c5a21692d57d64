//! Address Classification
//!
//! Pure predicates over base58 address strings:
//! - `is_valid_token_address`: input validation before discovery starts
//! - `is_user_wallet`: separates buyer wallets from programs, sysvars and the mint

use super::known_programs::is_system_program;

/// Shortest base58 encoding of a 32-byte public key
pub const MIN_ADDRESS_LEN: usize = 32;

/// Longest base58 encoding of a 32-byte public key
pub const MAX_ADDRESS_LEN: usize = 44;

/// Trailing run of '1' characters that marks program-derived or burn-style addresses
const PROGRAM_SUFFIX: &str = "1111111111";

/// Validate a user-supplied token mint address.
///
/// True iff the length is within [32, 44], every character belongs to the
/// Bitcoin base58 alphabet (no `0`, `O`, `I` or `l`), and the string is not an
/// `0x`-prefixed EVM address.
pub fn is_valid_token_address(address: &str) -> bool {
    if address.len() < MIN_ADDRESS_LEN || address.len() > MAX_ADDRESS_LEN {
        return false;
    }

    if address.starts_with("0x") {
        return false;
    }

    bs58::decode(address).into_vec().is_ok()
}

/// Check whether an address looks like a genuine user wallet.
///
/// Rejects empty or short strings, the mint itself, listed system programs,
/// and anything ending in ten or more consecutive '1' characters.
pub fn is_user_wallet(address: &str, mint_address: &str) -> bool {
    if address.len() < MIN_ADDRESS_LEN {
        return false;
    }

    if address == mint_address {
        return false;
    }

    if is_system_program(address) {
        return false;
    }

    !address.ends_with(PROGRAM_SUFFIX)
}

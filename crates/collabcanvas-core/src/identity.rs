//! User identity.

use uuid::Uuid;

/// A user identity: an authenticated username or a generated guest tag.
pub type UserId = String;

/// Prefix used for generated guest identities.
pub const GUEST_PREFIX: &str = "Anon";

/// Generate a guest identity of the form `Anon####`.
pub fn guest_identity() -> UserId {
    let bytes = Uuid::new_v4().into_bytes();
    let seed = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    format!("{GUEST_PREFIX}{:04}", seed % 10_000)
}

/// Check if an identity was generated for a guest.
pub fn is_guest(user: &str) -> bool {
    user.strip_prefix(GUEST_PREFIX)
        .is_some_and(|digits| digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_digit()))
}

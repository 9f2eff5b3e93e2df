//! UUID-derived tokens

use uuid::Uuid;

/// Random 32-character lowercase hex token (UUIDv4 without hyphens)
///
/// Used to name generated files so concurrent writers never collide.
pub fn hex_token() -> String {
    Uuid::new_v4().simple().to_string()
}

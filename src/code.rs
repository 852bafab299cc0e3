use rand::{distr::Alphanumeric, Rng};

/// Length of the short code printed inside a QR label.
pub const QR_CODE_LEN: usize = 10;

/// Generate a random short code for an item.
///
/// Collisions are possible (62^10 space); the items table carries a unique
/// constraint and `create_item` regenerates on conflict.
pub fn generate_qr_code_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(QR_CODE_LEN)
        .map(char::from)
        .collect()
}

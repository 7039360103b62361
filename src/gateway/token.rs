use rand::{distr::Alphanumeric, Rng};

/// Length of issued session tokens
const TOKEN_LEN: usize = 21;

/// Generates an opaque bearer token for a newly admitted participant.
/// Tokens carry no structure or claims; the store's connected list is
/// the only place they mean anything.
pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

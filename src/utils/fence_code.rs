use rand::{distributions::Alphanumeric, Rng};

/// Fixed code length; 36^8 possible codes once lower-cased.
pub const FENCE_CODE_LEN: usize = 8;

/// Random lower-case alphanumeric fence code.
pub fn generate_fence_code() -> String {
    let code: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(FENCE_CODE_LEN)
        .map(char::from)
        .collect();
    code.to_lowercase()
}

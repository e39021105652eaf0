//! Random draws that never fall back to a fixed value

use rand::RngCore;
use tracing::warn;

/// Fill `buf` from `rng`, retrying until the source succeeds
pub fn fill_bytes(rng: &mut dyn RngCore, buf: &mut [u8]) {
    loop {
        match rng.try_fill_bytes(buf) {
            Ok(()) => return,
            Err(e) => warn!(error = %e, "Entropy source failed, retrying draw"),
        }
    }
}

/// Draw one uniformly random byte
pub fn random_byte(rng: &mut dyn RngCore) -> u8 {
    let mut buf = [0u8; 1];
    fill_bytes(rng, &mut buf);
    buf[0]
}

use rand::{distributions::Alphanumeric, Rng, RngCore};
use std::time::Duration;

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// A fixed delay followed by a weighted coin flip. Stands in for a call to an
/// external provider.
#[derive(Clone, Debug)]
pub struct RandomizedOutcome {
    delay: Duration,
    success_rate: f64,
}

impl RandomizedOutcome {
    pub fn new(delay_ms: u64, success_rate: f64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            success_rate: success_rate.clamp(0.0, 1.0),
        }
    }

    /// Waits out the delay, then returns whether the call succeeded.
    pub async fn draw(&self) -> bool {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        rand::thread_rng().gen::<f64>() < self.success_rate
    }
}

/// `0x` followed by 32 random bytes in hex.
pub fn fabricate_tx_hash() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("0x{}", hex::encode(bytes))
}

/// TRC20-looking address: `T` followed by 33 base58 characters.
pub fn generate_trc20_address() -> String {
    let mut rng = rand::thread_rng();
    let mut address = String::with_capacity(34);
    address.push('T');
    for _ in 0..33 {
        let index = rng.gen_range(0..BASE58_ALPHABET.len());
        address.push(BASE58_ALPHABET[index] as char);
    }
    address
}

pub fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

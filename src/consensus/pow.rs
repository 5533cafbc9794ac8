// Proof of Work implementation

use crate::core::{BlockHeader, Hash256};
use std::time::{Duration, Instant};

/// Fixed difficulty target: a block hash, read as a big-endian 256-bit
/// integer, must be strictly below `2^(256 - zero_bits)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    zero_bits: u32,
    threshold: Hash256,
}

impl Target {
    /// Default target, `0x00001000…00`
    pub const DEFAULT_ZERO_BITS: u32 = 20;

    /// Target requiring `zero_bits` leading zero bits (clamped to 1..=255)
    pub fn from_zero_bits(zero_bits: u32) -> Self {
        let zero_bits = zero_bits.clamp(1, 255);
        let bit = (zero_bits - 1) as usize;

        let mut threshold = [0u8; 32];
        threshold[bit / 8] = 0x80 >> (bit % 8);

        Self {
            zero_bits,
            threshold: Hash256::new(threshold),
        }
    }

    pub fn zero_bits(&self) -> u32 {
        self.zero_bits
    }

    /// The threshold as 32 big-endian bytes
    pub fn threshold(&self) -> &Hash256 {
        &self.threshold
    }

    /// Check if a hash meets this target (hash < target)
    #[inline]
    pub fn is_met_by(&self, hash: &Hash256) -> bool {
        // Byte arrays order lexicographically, i.e. as big-endian integers
        hash.as_bytes() < self.threshold.as_bytes()
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::from_zero_bits(Self::DEFAULT_ZERO_BITS)
    }
}

/// Proof of Work miner
#[derive(Debug, Clone)]
pub struct ProofOfWork {
    target: Target,
}

impl ProofOfWork {
    pub fn new(target: Target) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Search nonces upward from 0 and keep the first one whose header hash
    /// meets the target. There is no timeout; the loop only ends on success.
    pub fn mine(&self, header: &mut BlockHeader) -> MiningResult {
        let start_time = Instant::now();
        let mut attempts = 0u64;

        header.nonce = 0;
        loop {
            let hash = header.hash();
            attempts += 1;

            if self.target.is_met_by(&hash) {
                let result = MiningResult {
                    nonce: header.nonce,
                    hash,
                    attempts,
                    duration: start_time.elapsed(),
                };
                log::info!("Mined block {} (nonce {}, {:.1} KH/s)",
                    hash,
                    result.nonce,
                    result.hash_rate() / 1000.0
                );
                return result;
            }

            if attempts % 100_000 == 0 {
                let elapsed = start_time.elapsed();
                log::debug!("Mining attempts: {} ({:.1} KH/s)",
                    attempts,
                    attempts as f64 / elapsed.as_secs_f64() / 1000.0
                );
            }

            header.nonce += 1;
        }
    }

    /// Verify that a block header satisfies PoW
    pub fn verify(&self, header: &BlockHeader) -> bool {
        self.target.is_met_by(&header.hash())
    }
}

/// Mining result
#[derive(Debug, Clone)]
pub struct MiningResult {
    /// The nonce that was found
    pub nonce: u64,
    /// The resulting hash
    pub hash: Hash256,
    /// Number of attempts
    pub attempts: u64,
    /// Time taken
    pub duration: Duration,
}

impl MiningResult {
    /// Calculate hash rate (hashes per second)
    pub fn hash_rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            return self.attempts as f64;
        }
        self.attempts as f64 / secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> BlockHeader {
        BlockHeader::new(0, Hash256::new([3; 32]), Hash256::new([4; 32]), 1234567890, 8, 0)
    }

    #[test]
    fn test_default_target_hex() {
        let target = Target::default();
        assert_eq!(
            target.threshold().to_hex(),
            "0000100000000000000000000000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn test_target_validation() {
        let target = Target::from_zero_bits(20);

        // Zero hash should always be valid (lowest possible)
        assert!(target.is_met_by(&Hash256::zero()));

        // All 0xff hash should be invalid (highest possible)
        assert!(!target.is_met_by(&Hash256::new([0xff; 32])));

        // Equal to the threshold is not below it
        assert!(!target.is_met_by(target.threshold()));

        let mut just_below = [0xff; 32];
        just_below[0] = 0;
        just_below[1] = 0;
        just_below[2] = 0x0f;
        assert!(target.is_met_by(&Hash256::new(just_below)));
    }

    #[test]
    fn test_zero_bits_clamped() {
        assert_eq!(Target::from_zero_bits(0).zero_bits(), 1);
        assert_eq!(Target::from_zero_bits(300).zero_bits(), 255);
        assert_eq!(Target::from_zero_bits(8).threshold().as_bytes()[0], 0x01);
        assert_eq!(Target::from_zero_bits(9).threshold().as_bytes()[1], 0x80);
    }

    #[test]
    fn test_pow_mining_finds_smallest_nonce() {
        let pow = ProofOfWork::new(Target::from_zero_bits(8));
        let mut header = header();

        let result = pow.mine(&mut header);
        assert!(pow.verify(&header));
        assert_eq!(result.hash, header.hash());
        assert_eq!(result.attempts, result.nonce + 1);

        // No smaller nonce satisfies the target
        for nonce in 0..result.nonce {
            let mut candidate = header.clone();
            candidate.nonce = nonce;
            assert!(!pow.verify(&candidate));
        }
    }

    #[test]
    fn test_mining_is_deterministic_for_fixed_header() {
        let pow = ProofOfWork::new(Target::from_zero_bits(6));
        let mut a = header();
        let mut b = header();
        b.nonce = 999;

        assert_eq!(pow.mine(&mut a).nonce, pow.mine(&mut b).nonce);
    }
}

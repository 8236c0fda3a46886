//! Size tiers for receive buffers
//!
//! Each endpoint reads into one buffer per tier with a single readv. Small
//! frames touch only the first tiers; a maximum-size frame spills across
//! all of them.

use crate::constants::MAX_IP_PACKET_SIZE;
use crate::error::{LinkError, LinkResult};

/// Default tier layout shared by every endpoint (sum: 65664 bytes)
pub const BUF_CONFIG: [usize; 10] = [128, 256, 256, 512, 1024, 2048, 4096, 8192, 16384, 32768];

/// Validated, non-decreasing list of tier sizes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierConfig {
    sizes: Vec<usize>,
}

impl TierConfig {
    /// Validate `sizes`: non-empty, no zero tier, non-decreasing
    pub fn new(sizes: Vec<usize>) -> LinkResult<Self> {
        if sizes.is_empty() {
            return Err(LinkError::InvalidConfig("tiers must not be empty"));
        }
        if sizes.iter().any(|&s| s == 0) {
            return Err(LinkError::InvalidConfig("tier sizes must be > 0"));
        }
        if sizes.windows(2).any(|w| w[1] < w[0]) {
            return Err(LinkError::InvalidConfig("tier sizes must be non-decreasing"));
        }
        Ok(TierConfig { sizes })
    }

    #[inline]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Number of tiers, which is also the number of buffer slots
    #[inline]
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Largest frame a single read can hold
    pub fn total_capacity(&self) -> usize {
        self.sizes.iter().sum()
    }

    /// True if any IP packet fits without truncation
    pub fn holds_max_ip_packet(&self) -> bool {
        self.total_capacity() >= MAX_IP_PACKET_SIZE
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        TierConfig {
            sizes: BUF_CONFIG.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tiers() {
        let t = TierConfig::default();
        assert_eq!(t.len(), 10);
        assert_eq!(t.total_capacity(), 65664);
        assert!(t.sizes().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_validation() {
        assert!(TierConfig::new(vec![]).is_err());
        assert!(TierConfig::new(vec![128, 0]).is_err());
        assert!(TierConfig::new(vec![256, 128]).is_err());
        assert!(TierConfig::new(vec![64, 64, 128]).is_ok());
    }

    #[test]
    fn test_max_packet_fit() {
        assert!(TierConfig::new(vec![65535]).unwrap().holds_max_ip_packet());
        assert!(TierConfig::default().holds_max_ip_packet());
        assert!(!TierConfig::new(vec![1024, 2048]).unwrap().holds_max_ip_packet());
    }
}

//! Chain bundles
//!
//! The full chain starts with the leaf PEM and appends each authority block
//! after a blank-line separator. The CA-only chain holds the same authority
//! blocks without the leaf.

/// Separator placed before every appended block
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Leaf plus the authority blocks bundled with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBundle {
    leaf: String,
    authorities: Vec<String>,
}

impl ChainBundle {
    pub fn new(leaf_pem: String, authorities: Vec<String>) -> Self {
        Self {
            leaf: leaf_pem,
            authorities,
        }
    }

    /// Number of authority blocks after the leaf
    pub fn depth(&self) -> usize {
        self.authorities.len()
    }

    pub fn leaf(&self) -> &str {
        &self.leaf
    }

    pub fn authorities(&self) -> &[String] {
        &self.authorities
    }

    /// Leaf followed by every authority block
    pub fn full_chain(&self) -> String {
        let mut chain = self.leaf.clone();
        for block in &self.authorities {
            chain.push_str(BLOCK_SEPARATOR);
            chain.push_str(block);
        }
        chain
    }

    /// Authority blocks only; empty when the leaf has no bundled issuer
    pub fn ca_chain(&self) -> String {
        self.authorities.join(BLOCK_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEAF: &str = "-----BEGIN CERTIFICATE-----\nLEAF\n-----END CERTIFICATE-----\n";
    const CA: &str = "-----BEGIN CERTIFICATE-----\nCA\n-----END CERTIFICATE-----\n";
    const ROOT: &str = "-----BEGIN CERTIFICATE-----\nROOT\n-----END CERTIFICATE-----\n";

    #[test]
    fn test_padding_matches_depth() {
        for depth in 0..=2 {
            let authorities: Vec<String> =
                [CA, ROOT][..depth].iter().map(|b| b.to_string()).collect();
            let bundle = ChainBundle::new(LEAF.to_string(), authorities);
            let full = bundle.full_chain();

            assert!(full.starts_with(LEAF));
            assert_eq!(full.matches(BLOCK_SEPARATOR).count(), depth);
            assert_eq!(bundle.depth(), depth);
        }
    }

    #[test]
    fn test_ca_chain_excludes_leaf() {
        let bundle = ChainBundle::new(LEAF.to_string(), vec![CA.to_string(), ROOT.to_string()]);
        assert_eq!(bundle.ca_chain(), format!("{CA}\n\n{ROOT}"));
        assert_eq!(bundle.full_chain(), format!("{LEAF}\n\n{CA}\n\n{ROOT}"));
        assert!(!bundle.ca_chain().contains("LEAF"));
    }

    #[test]
    fn test_self_signed_has_empty_ca_chain() {
        let bundle = ChainBundle::new(LEAF.to_string(), Vec::new());
        assert_eq!(bundle.full_chain(), LEAF);
        assert!(bundle.ca_chain().is_empty());
    }
}

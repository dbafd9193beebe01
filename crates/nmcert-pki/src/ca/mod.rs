//! Authority minting, on-disk authorities and AIA

pub mod aia;
pub mod authority;

pub use aia::{issuing_certificate_urls, DEFAULT_AIA_BASE};
pub use authority::{
    resolve_issuer, AnchorStrategy, Authority, AuthorityOrigin, ExistingAuthority, IssueContext,
    KeySource,
};

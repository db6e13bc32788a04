use sha2::{Digest, Sha256};

/// An 8-byte discriminator at offset 0, derived from SHA-256 of a canonical
/// struct name, Anchor-style (spec.md §6.1).
pub type Discriminator = [u8; 8];

fn anchor_discriminator(namespace: &str, name: &str) -> Discriminator {
    let preimage = format!("{namespace}:{name}");
    let digest = Sha256::digest(preimage.as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

pub fn reserve_discriminator() -> Discriminator {
    anchor_discriminator("account", "Reserve")
}

pub fn obligation_discriminator() -> Discriminator {
    anchor_discriminator("account", "Obligation")
}

/// Anchor instruction discriminator (namespace `global`), used only to
/// recognize instruction *kinds* when walking a compiled message (spec.md
/// §4.6), never to validate business rules.
pub fn instruction_discriminator(name: &str) -> Discriminator {
    anchor_discriminator("global", name)
}

pub fn matches(data: &[u8], expected: &Discriminator) -> bool {
    data.len() >= 8 && &data[0..8] == expected
}

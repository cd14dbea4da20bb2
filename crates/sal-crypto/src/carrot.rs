//! CARROT key hierarchy and shared derivation plumbing.
//!
//! Every CARROT hash is a keyed BLAKE2b over a length-prefixed domain
//! transcript: `[len:1][domain][data...]`. Scalars come from 64-byte
//! digests reduced mod L; raw secrets from 32-byte digests. Domain
//! strings match carrot_core/config.h and must never drift.

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;

use crate::curve::{compress, decompress, msm, mul_base, t_point};
use crate::error::CryptoError;
use crate::hash::{blake2b, blake2b_keyed};
use crate::x25519;

// ─── Domain separators ──────────────────────────────────────────────────

pub mod domain {
    pub const PROVE_SPEND_KEY: &[u8] = b"Carrot prove-spend key";
    pub const VIEW_BALANCE_SECRET: &[u8] = b"Carrot view-balance secret";
    pub const GENERATE_IMAGE_KEY: &[u8] = b"Carrot generate-image key";
    pub const INCOMING_VIEW_KEY: &[u8] = b"Carrot incoming view key";
    pub const GENERATE_ADDRESS_SECRET: &[u8] = b"Carrot generate-address secret";
    pub const ADDRESS_INDEX_GEN: &[u8] = b"Carrot address index generator";
    pub const SUBADDRESS_SCALAR: &[u8] = b"Carrot subaddress scalar";
    pub const SENDING_KEY_NORMAL: &[u8] = b"Carrot sending key normal";
    pub const SENDER_RECEIVER_SECRET: &[u8] = b"Carrot sender-receiver secret";
    pub const VIEW_TAG: &[u8] = b"Carrot view tag";
    pub const COMMITMENT_MASK: &[u8] = b"Carrot commitment mask";
    pub const EXTENSION_G: &[u8] = b"Carrot key extension G";
    pub const EXTENSION_T: &[u8] = b"Carrot key extension T";
    pub const ENCRYPTION_MASK_ANCHOR: &[u8] = b"Carrot encryption mask anchor";
    pub const ENCRYPTION_MASK_AMOUNT: &[u8] = b"Carrot encryption mask a";
    pub const ENCRYPTION_MASK_PAYMENT_ID: &[u8] = b"Carrot encryption mask pid";
    pub const JANUS_ANCHOR_SPECIAL: &[u8] = b"Carrot janus anchor special";
}

/// Enote type byte bound into the commitment mask.
pub mod enote_type {
    pub const PAYMENT: u8 = 0;
    pub const CHANGE: u8 = 1;
}

/// `[domain_len][domain][data...]` (SpFixedTranscript).
pub fn transcript(domain: &[u8], data: &[&[u8]]) -> Vec<u8> {
    let total = 1 + domain.len() + data.iter().map(|d| d.len()).sum::<usize>();
    let mut t = Vec::with_capacity(total);
    t.push(domain.len() as u8);
    t.extend_from_slice(domain);
    for d in data {
        t.extend_from_slice(d);
    }
    t
}

/// `H_n`: keyed BLAKE2b-512 of the transcript, reduced mod L.
pub fn derive_scalar(key: &[u8], domain: &[u8], data: &[&[u8]]) -> Scalar {
    let digest = blake2b_keyed(&transcript(domain, data), 64, key);
    let mut wide = [0u8; 64];
    wide.copy_from_slice(&digest);
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// Unkeyed `H_n` used for the sender's ephemeral key.
pub fn derive_scalar_unkeyed(domain: &[u8], data: &[&[u8]]) -> Scalar {
    let digest = blake2b(&transcript(domain, data), 64);
    let mut wide = [0u8; 64];
    wide.copy_from_slice(&digest);
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// `H_32`: keyed BLAKE2b with 32-byte output.
pub fn derive_bytes_32(key: &[u8], domain: &[u8], data: &[&[u8]]) -> [u8; 32] {
    let digest = blake2b_keyed(&transcript(domain, data), 32, key);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Keyed BLAKE2b with arbitrary short output (view tags, XOR pads).
pub fn derive_bytes(key: &[u8], domain: &[u8], data: &[&[u8]], len: usize) -> Vec<u8> {
    blake2b_keyed(&transcript(domain, data), len, key)
}

// ─── Key hierarchy ──────────────────────────────────────────────────────

/// Full CARROT account keys. Secret halves are `None` on view-only
/// wallets.
#[derive(Debug, Clone)]
pub struct CarrotKeys {
    pub master_secret: Option<[u8; 32]>,
    pub prove_spend_key: Option<Scalar>,
    pub view_balance_secret: [u8; 32],
    pub generate_image_key: Scalar,
    pub view_incoming_key: Scalar,
    pub generate_address_secret: [u8; 32],
    /// `K_s = k_gi*G + k_ps*T`.
    pub account_spend_pubkey: [u8; 32],
    /// `K^0_v = k_vi*G`.
    pub primary_address_view_pubkey: [u8; 32],
    /// `K_v = k_vi*K_s`.
    pub account_view_pubkey: [u8; 32],
}

impl CarrotKeys {
    /// Derive the whole tree from a 32-byte master secret.
    pub fn from_master(master: &[u8; 32]) -> Self {
        let prove_spend_key = derive_scalar(master, domain::PROVE_SPEND_KEY, &[]);
        let view_balance_secret = derive_bytes_32(master, domain::VIEW_BALANCE_SECRET, &[]);
        let mut keys = Self::from_view_balance_unchecked(view_balance_secret, prove_spend_key);
        keys.master_secret = Some(*master);
        keys
    }

    /// View-only tree: everything below `s_vb` plus the externally
    /// supplied account spend pubkey.
    pub fn view_only(
        view_balance_secret: [u8; 32],
        account_spend_pubkey: [u8; 32],
    ) -> Result<Self, CryptoError> {
        let generate_image_key =
            derive_scalar(&view_balance_secret, domain::GENERATE_IMAGE_KEY, &[]);
        let view_incoming_key =
            derive_scalar(&view_balance_secret, domain::INCOMING_VIEW_KEY, &[]);
        let generate_address_secret =
            derive_bytes_32(&view_balance_secret, domain::GENERATE_ADDRESS_SECRET, &[]);

        let ks = decompress(&account_spend_pubkey)?;
        Ok(Self {
            master_secret: None,
            prove_spend_key: None,
            view_balance_secret,
            generate_image_key,
            view_incoming_key,
            generate_address_secret,
            account_spend_pubkey,
            primary_address_view_pubkey: compress(&mul_base(&view_incoming_key)),
            account_view_pubkey: compress(&(view_incoming_key * ks)),
        })
    }

    fn from_view_balance_unchecked(view_balance_secret: [u8; 32], k_ps: Scalar) -> Self {
        let generate_image_key =
            derive_scalar(&view_balance_secret, domain::GENERATE_IMAGE_KEY, &[]);
        let view_incoming_key =
            derive_scalar(&view_balance_secret, domain::INCOMING_VIEW_KEY, &[]);
        let generate_address_secret =
            derive_bytes_32(&view_balance_secret, domain::GENERATE_ADDRESS_SECRET, &[]);

        let spend_pt: EdwardsPoint = msm(
            &[generate_image_key, k_ps],
            &[ED25519_BASEPOINT_POINT, *t_point()],
        );

        Self {
            master_secret: None,
            prove_spend_key: Some(k_ps),
            view_balance_secret,
            generate_image_key,
            view_incoming_key,
            generate_address_secret,
            account_spend_pubkey: compress(&spend_pt),
            primary_address_view_pubkey: compress(&mul_base(&view_incoming_key)),
            account_view_pubkey: compress(&(view_incoming_key * spend_pt)),
        }
    }

    pub fn is_view_only(&self) -> bool {
        self.prove_spend_key.is_none()
    }
}

// ─── Subaddress derivation ──────────────────────────────────────────────

/// `s^j_gen = H_32[s_ga]("Carrot address index generator", maj, min)`.
pub fn index_extension_generator(
    generate_address_secret: &[u8; 32],
    major: u32,
    minor: u32,
) -> [u8; 32] {
    derive_bytes_32(
        generate_address_secret,
        domain::ADDRESS_INDEX_GEN,
        &[&major.to_le_bytes(), &minor.to_le_bytes()],
    )
}

/// `k^j_subscal = H_n[s^j_gen]("Carrot subaddress scalar", K_s, maj, min)`.
pub fn subaddress_scalar(
    account_spend_pubkey: &[u8; 32],
    index_generator: &[u8; 32],
    major: u32,
    minor: u32,
) -> Scalar {
    derive_scalar(
        index_generator,
        domain::SUBADDRESS_SCALAR,
        &[account_spend_pubkey, &major.to_le_bytes(), &minor.to_le_bytes()],
    )
}

/// Subaddress spend pubkey: `K^j_s = k^j_subscal * K_s` (identity map at
/// index (0,0)).
pub fn subaddress_spend_pubkey(
    keys: &CarrotKeys,
    major: u32,
    minor: u32,
) -> Result<[u8; 32], CryptoError> {
    if major == 0 && minor == 0 {
        return Ok(keys.account_spend_pubkey);
    }
    let gen = index_extension_generator(&keys.generate_address_secret, major, minor);
    let scal = subaddress_scalar(&keys.account_spend_pubkey, &gen, major, minor);
    let ks = decompress(&keys.account_spend_pubkey)?;
    Ok(compress(&(scal * ks)))
}

// ─── Ephemeral pubkey recomputation (janus check) ───────────────────────

/// Sender ephemeral scalar `d_e` from the janus anchor.
pub fn ephemeral_privkey(
    anchor: &[u8; 16],
    input_context: &[u8],
    address_spend_pubkey: &[u8; 32],
    payment_id: &[u8; 8],
) -> Scalar {
    derive_scalar_unkeyed(
        domain::SENDING_KEY_NORMAL,
        &[anchor, input_context, address_spend_pubkey, payment_id],
    )
}

/// Recompute `D_e` the way the sender built it: `d_e * B` for a main
/// address, `d_e * ConvertPointE(K^j_s)` for a subaddress.
pub fn recompute_ephemeral_pubkey(
    d_e: &Scalar,
    address_spend_pubkey: &[u8; 32],
    is_subaddress: bool,
) -> Result<[u8; 32], CryptoError> {
    let base = if is_subaddress {
        x25519::edwards_to_montgomery_u(address_spend_pubkey)?
    } else {
        let mut b = [0u8; 32];
        b[0] = 9;
        b
    };
    Ok(x25519::montgomery_ladder(&d_e.to_bytes(), &base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_is_deterministic() {
        let a = CarrotKeys::from_master(&[0x42; 32]);
        let b = CarrotKeys::from_master(&[0x42; 32]);
        assert_eq!(a.account_spend_pubkey, b.account_spend_pubkey);
        assert_eq!(a.view_balance_secret, b.view_balance_secret);
        assert_eq!(a.account_view_pubkey, b.account_view_pubkey);
    }

    #[test]
    fn all_derived_keys_differ() {
        let k = CarrotKeys::from_master(&[0x01; 32]);
        let items: Vec<[u8; 32]> = vec![
            k.prove_spend_key.unwrap().to_bytes(),
            k.view_balance_secret,
            k.generate_image_key.to_bytes(),
            k.view_incoming_key.to_bytes(),
            k.generate_address_secret,
            k.account_spend_pubkey,
            k.primary_address_view_pubkey,
            k.account_view_pubkey,
        ];
        for i in 0..items.len() {
            for j in i + 1..items.len() {
                assert_ne!(items[i], items[j], "slots {i} and {j} collide");
            }
        }
    }

    #[test]
    fn view_only_matches_full() {
        let full = CarrotKeys::from_master(&[0x55; 32]);
        let vo = CarrotKeys::view_only(full.view_balance_secret, full.account_spend_pubkey)
            .unwrap();
        assert!(vo.is_view_only());
        assert_eq!(vo.view_incoming_key, full.view_incoming_key);
        assert_eq!(vo.generate_image_key, full.generate_image_key);
        assert_eq!(vo.generate_address_secret, full.generate_address_secret);
        assert_eq!(vo.primary_address_view_pubkey, full.primary_address_view_pubkey);
        assert_eq!(vo.account_view_pubkey, full.account_view_pubkey);
    }

    #[test]
    fn spend_pubkey_combines_both_generators() {
        // K_s must move if either secret moves.
        let base = CarrotKeys::from_master(&[0x10; 32]);
        let other = CarrotKeys::from_master(&[0x11; 32]);
        assert_ne!(base.account_spend_pubkey, other.account_spend_pubkey);
    }

    #[test]
    fn subaddress_zero_is_account_key() {
        let k = CarrotKeys::from_master(&[0x77; 32]);
        assert_eq!(subaddress_spend_pubkey(&k, 0, 0).unwrap(), k.account_spend_pubkey);
        assert_ne!(subaddress_spend_pubkey(&k, 0, 1).unwrap(), k.account_spend_pubkey);
        assert_ne!(
            subaddress_spend_pubkey(&k, 1, 0).unwrap(),
            subaddress_spend_pubkey(&k, 0, 1).unwrap()
        );
    }

    #[test]
    fn transcript_layout() {
        let t = transcript(b"test", &[&[1, 2], &[3]]);
        assert_eq!(t, vec![4, b't', b'e', b's', b't', 1, 2, 3]);
    }
}

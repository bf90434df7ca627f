use wasm_bindgen::prelude::*;
use tiny_keccak::{Hasher, Keccak};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::constants::{ED25519_BASEPOINT_TABLE, ED25519_BASEPOINT_POINT};
use curve25519_dalek::traits::VartimeMultiscalarMul;

pub mod bulletproofs_plus;
pub mod carrot_keys;
pub mod carrot_scan;
pub mod clsag;
pub mod cn_scan;
pub mod elligator2;
pub mod rct_verify;
pub mod subaddress;
pub mod tclsag;
pub mod tx_constants;
pub mod tx_format;
pub mod tx_parse;
pub mod tx_serialize;
pub mod x25519;

#[cfg(not(target_arch = "wasm32"))]
pub mod ffi;
#[cfg(not(target_arch = "wasm32"))]
pub mod storage;

/// Second Pedersen-commitment generator `H` (independent of `G`, discrete log
/// unknown). Matches Monero/Salvium's `rct::H`: `8 * hash_to_point(G)`.
pub const H_POINT_BYTES: [u8; 32] = [
    0x8b, 0x65, 0x59, 0x70, 0x15, 0x37, 0x99, 0xaf, 0x2a, 0xea, 0xdc, 0x9f, 0xf1, 0xad, 0xd0, 0xea,
    0x6c, 0x72, 0x51, 0xd5, 0x41, 0x54, 0xcf, 0xa9, 0x2c, 0x17, 0x3a, 0x0d, 0xd3, 0x9c, 0x1f, 0x94,
];

/// Keccak-256 over a buffer, returned as a fixed-size array (internal helper
/// shared by every module that needs a raw digest rather than a `Vec<u8>`).
pub(crate) fn keccak256_internal(data: &[u8]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    let mut output = [0u8; 32];
    keccak.update(data);
    keccak.finalize(&mut output);
    output
}

fn encode_varint_u32(mut val: u32, buf: &mut Vec<u8>) {
    loop {
        let byte = (val & 0x7f) as u8;
        val >>= 7;
        if val == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

/// `H_s(derivation || varint(output_index))` reduced mod ℓ — the CryptoNote
/// "derivation to scalar" primitive (§4.B `H_n`).
pub(crate) fn derivation_to_scalar(derivation: &[u8; 32], output_index: u32) -> Scalar {
    let mut buf = Vec::with_capacity(40);
    buf.extend_from_slice(derivation);
    encode_varint_u32(output_index, &mut buf);
    Scalar::from_bytes_mod_order(keccak256_internal(&buf))
}

/// Hash-to-point: `H_p(data) = 8 * elligator2(keccak256(data))` (§4.A).
fn hash_to_point_internal(data: &[u8]) -> EdwardsPoint {
    let hash = keccak256_internal(data);
    elligator2::ge_fromfe_frombytes_vartime(&hash).mul_by_cofactor()
}

/// Keccak-256 hash (CryptoNote variant with 0x01 padding, NOT SHA3)
/// Matches Salvium C++ cn_fast_hash / keccak()
#[wasm_bindgen]
pub fn keccak256(data: &[u8]) -> Vec<u8> {
    let mut keccak = Keccak::v256();
    let mut output = [0u8; 32];
    keccak.update(data);
    keccak.finalize(&mut output);
    output.to_vec()
}

/// Blake2b with variable output length (unkeyed)
/// Matches Salvium C++ blake2b(out, outLen, data, dataLen, NULL, 0)
#[wasm_bindgen]
pub fn blake2b_hash(data: &[u8], out_len: usize) -> Vec<u8> {
    blake2b_simd::Params::new()
        .hash_length(out_len)
        .hash(data)
        .as_bytes()
        .to_vec()
}

/// Blake2b with key (keyed variant per RFC 7693)
/// Matches Salvium C++ blake2b(out, outLen, data, dataLen, key, keyLen)
/// Used by CARROT protocol for domain-separated hashing
#[wasm_bindgen]
pub fn blake2b_keyed(data: &[u8], out_len: usize, key: &[u8]) -> Vec<u8> {
    blake2b_simd::Params::new()
        .hash_length(out_len)
        .key(key)
        .hash(data)
        .as_bytes()
        .to_vec()
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn to32(s: &[u8]) -> [u8; 32] {
    let mut buf = [0u8; 32];
    let len = s.len().min(32);
    buf[..len].copy_from_slice(&s[..len]);
    buf
}

fn to64(s: &[u8]) -> [u8; 64] {
    let mut buf = [0u8; 64];
    let len = s.len().min(64);
    buf[..len].copy_from_slice(&s[..len]);
    buf
}

// ─── Scalar Operations (mod L) ─────────────────────────────────────────────

#[wasm_bindgen]
pub fn sc_add(a: &[u8], b: &[u8]) -> Vec<u8> {
    let sa = Scalar::from_bytes_mod_order(to32(a));
    let sb = Scalar::from_bytes_mod_order(to32(b));
    (sa + sb).to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn sc_sub(a: &[u8], b: &[u8]) -> Vec<u8> {
    let sa = Scalar::from_bytes_mod_order(to32(a));
    let sb = Scalar::from_bytes_mod_order(to32(b));
    (sa - sb).to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn sc_mul(a: &[u8], b: &[u8]) -> Vec<u8> {
    let sa = Scalar::from_bytes_mod_order(to32(a));
    let sb = Scalar::from_bytes_mod_order(to32(b));
    (sa * sb).to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn sc_mul_add(a: &[u8], b: &[u8], c: &[u8]) -> Vec<u8> {
    let sa = Scalar::from_bytes_mod_order(to32(a));
    let sb = Scalar::from_bytes_mod_order(to32(b));
    let sc = Scalar::from_bytes_mod_order(to32(c));
    (sa * sb + sc).to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn sc_mul_sub(a: &[u8], b: &[u8], c: &[u8]) -> Vec<u8> {
    let sa = Scalar::from_bytes_mod_order(to32(a));
    let sb = Scalar::from_bytes_mod_order(to32(b));
    let sc = Scalar::from_bytes_mod_order(to32(c));
    (sc - sa * sb).to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn sc_reduce32(s: &[u8]) -> Vec<u8> {
    Scalar::from_bytes_mod_order(to32(s)).to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn sc_reduce64(s: &[u8]) -> Vec<u8> {
    Scalar::from_bytes_mod_order_wide(&to64(s)).to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn sc_invert(a: &[u8]) -> Vec<u8> {
    Scalar::from_bytes_mod_order(to32(a)).invert().to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn sc_check(s: &[u8]) -> bool {
    bool::from(Scalar::from_canonical_bytes(to32(s)).is_some())
}

#[wasm_bindgen]
pub fn sc_is_zero(s: &[u8]) -> bool {
    Scalar::from_bytes_mod_order(to32(s)) == Scalar::ZERO
}

// ─── Point Operations (compressed Edwards) ──────────────────────────────────

#[wasm_bindgen]
pub fn scalar_mult_base(s: &[u8]) -> Vec<u8> {
    let scalar = Scalar::from_bytes_mod_order(to32(s));
    (ED25519_BASEPOINT_TABLE * &scalar).compress().to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn scalar_mult_point(s: &[u8], p: &[u8]) -> Vec<u8> {
    let scalar = Scalar::from_bytes_mod_order(to32(s));
    let point = CompressedEdwardsY(to32(p)).decompress().expect("invalid point");
    // Use variable-time Straus/wNAF — much faster than constant-time mul
    EdwardsPoint::vartime_multiscalar_mul(&[scalar], &[point])
        .compress().to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn point_add_compressed(p: &[u8], q: &[u8]) -> Vec<u8> {
    let pp = CompressedEdwardsY(to32(p)).decompress().expect("invalid point p");
    let qq = CompressedEdwardsY(to32(q)).decompress().expect("invalid point q");
    (pp + qq).compress().to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn point_sub_compressed(p: &[u8], q: &[u8]) -> Vec<u8> {
    let pp = CompressedEdwardsY(to32(p)).decompress().expect("invalid point p");
    let qq = CompressedEdwardsY(to32(q)).decompress().expect("invalid point q");
    (pp - qq).compress().to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn point_negate(p: &[u8]) -> Vec<u8> {
    let pp = CompressedEdwardsY(to32(p)).decompress().expect("invalid point");
    (-pp).compress().to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn double_scalar_mult_base(a: &[u8], p: &[u8], b: &[u8]) -> Vec<u8> {
    let sa = Scalar::from_bytes_mod_order(to32(a));
    let sb = Scalar::from_bytes_mod_order(to32(b));
    let pp = CompressedEdwardsY(to32(p)).decompress().expect("invalid point");
    // Variable-time multi-scalar: a*P + b*G
    EdwardsPoint::vartime_multiscalar_mul(
        &[sa, sb],
        &[pp, curve25519_dalek::constants::ED25519_BASEPOINT_POINT],
    ).compress().to_bytes().to_vec()
}

// ─── Hash-to-Point & Key Derivation (flat crate-root surface) ──────────────
//
// These wrap the per-variant scanning internals (`cn_scan`, `carrot_scan`)
// into the plain byte-slice-in/`Vec<u8>`-out shape `wasm_bindgen` wants, and
// that `salvium-tx`/`salvium-wallet` call across the crate boundary.

#[wasm_bindgen]
pub fn hash_to_point(data: &[u8]) -> Vec<u8> {
    hash_to_point_internal(data).compress().to_bytes().to_vec()
}

/// `D = 8 * sec_key * pub_key` (CryptoNote `generate_key_derivation`).
/// Returns an empty vector if `pub_key` does not decompress to a valid point.
#[wasm_bindgen]
pub fn generate_key_derivation(pub_key: &[u8], sec_key: &[u8]) -> Vec<u8> {
    let point = match CompressedEdwardsY(to32(pub_key)).decompress() {
        Some(p) => p,
        None => return Vec::new(),
    };
    let scalar = Scalar::from_bytes_mod_order(to32(sec_key));
    (point * scalar).mul_by_cofactor().compress().to_bytes().to_vec()
}

/// `KI = sec_key * H_p(pub_key)` — the CryptoNote key image.
#[wasm_bindgen]
pub fn generate_key_image(pub_key: &[u8], sec_key: &[u8]) -> Vec<u8> {
    let hp = hash_to_point_internal(pub_key);
    let scalar = Scalar::from_bytes_mod_order(to32(sec_key));
    EdwardsPoint::vartime_multiscalar_mul(&[scalar], &[hp]).compress().to_bytes().to_vec()
}

/// `Ko = base_pub + H_s(D || index) * G`.
#[wasm_bindgen]
pub fn derive_public_key(derivation: &[u8], output_index: u32, base_pub: &[u8]) -> Vec<u8> {
    let base = match CompressedEdwardsY(to32(base_pub)).decompress() {
        Some(p) => p,
        None => return Vec::new(),
    };
    let scalar = derivation_to_scalar(&to32(derivation), output_index);
    (base + ED25519_BASEPOINT_TABLE * &scalar).compress().to_bytes().to_vec()
}

/// `ko = base_sec + H_s(D || index)`.
#[wasm_bindgen]
pub fn derive_secret_key(derivation: &[u8], output_index: u32, base_sec: &[u8]) -> Vec<u8> {
    let base = Scalar::from_bytes_mod_order(to32(base_sec));
    let scalar = derivation_to_scalar(&to32(derivation), output_index);
    (base + scalar).to_bytes().to_vec()
}

/// `H_s(D || index)` alone, as raw scalar bytes — used by the transaction
/// builder to recover the per-output shared secret for amount encryption.
#[wasm_bindgen]
pub fn derivation_to_scalar_bytes(derivation: &[u8], output_index: u32) -> Vec<u8> {
    derivation_to_scalar(&to32(derivation), output_index).to_bytes().to_vec()
}

// ─── Pedersen Commitments ───────────────────────────────────────────────────

/// `C = mask * G + amount * H`. `amount` and `mask` are both taken as raw
/// little-endian scalar bytes (reduced mod ℓ), not as `u64`s, so callers can
/// pass either a zero-padded amount or an already-derived mask scalar.
#[wasm_bindgen]
pub fn pedersen_commit(amount: &[u8], mask: &[u8]) -> Vec<u8> {
    let h = CompressedEdwardsY(H_POINT_BYTES).decompress().expect("invalid H point");
    let amount_scalar = Scalar::from_bytes_mod_order(to32(amount));
    let mask_scalar = Scalar::from_bytes_mod_order(to32(mask));
    EdwardsPoint::vartime_multiscalar_mul(&[mask_scalar, amount_scalar], &[ED25519_BASEPOINT_POINT, h])
        .compress()
        .to_bytes()
        .to_vec()
}

/// The canonical zero-commitment used for coinbase/cleartext outputs:
/// `mask = 1`, i.e. `C = G + amount * H`.
#[wasm_bindgen]
pub fn zero_commit(amount: &[u8]) -> Vec<u8> {
    pedersen_commit(amount, Scalar::ONE.as_bytes())
}

/// `scReduce32(keccak256("commitment_mask" || shared_secret))`.
#[wasm_bindgen]
pub fn gen_commitment_mask(secret: &[u8]) -> Vec<u8> {
    cn_scan::gen_commitment_mask(&to32(secret)).to_vec()
}

// ─── CARROT input context ──────────────────────────────────────────────────

/// Build the 33-byte CARROT input context for a RingCT spend: `'R' ||
/// first_key_image`.
#[wasm_bindgen]
pub fn make_input_context_rct(first_key_image: &[u8]) -> Vec<u8> {
    let mut ctx = Vec::with_capacity(33);
    ctx.push(b'R');
    ctx.extend_from_slice(&to32(first_key_image));
    ctx
}

/// Build the 33-byte CARROT input context for a coinbase output: `'C' ||
/// LE64(height) || 24 zero bytes`.
#[wasm_bindgen]
pub fn make_input_context_coinbase(block_height: u64) -> Vec<u8> {
    let mut ctx = Vec::with_capacity(33);
    ctx.push(b'C');
    ctx.extend_from_slice(&block_height.to_le_bytes());
    ctx.extend_from_slice(&[0u8; 24]);
    ctx
}

/// X25519 scalar multiplication with Salvium's non-standard clamping (only
/// bit 255 is cleared — bits 0-2 are left intact and bit 254 is not set).
#[wasm_bindgen]
pub fn x25519_scalar_mult(scalar: &[u8], u_coord: &[u8]) -> Vec<u8> {
    let mut clamped = to32(scalar);
    clamped[31] &= 0x7F;
    x25519::montgomery_ladder(&clamped, &to32(u_coord)).to_vec()
}

/// Convert an Ed25519 public key (Edwards point) to its Montgomery `u`
/// coordinate, for use as the `u_coord` input to [`x25519_scalar_mult`].
#[wasm_bindgen]
pub fn edwards_to_montgomery_u(ed_point: &[u8]) -> Vec<u8> {
    x25519::edwards_to_montgomery_u(&to32(ed_point)).to_vec()
}

// ─── Transaction (de)serialization glue ─────────────────────────────────────

/// Parse a raw transaction blob into the JSON representation used throughout
/// `salvium-tx`/`salvium-wallet`. Returns an empty string on a parse error —
/// callers treat that as "could not recover the canonical prefix bytes".
#[wasm_bindgen]
pub fn parse_transaction_bytes(data: &[u8]) -> String {
    tx_parse::parse_transaction(data).unwrap_or_default()
}

/// Parse a raw block blob into its JSON representation (header, miner_tx,
/// tx_hashes, …). Returns an empty string on a parse error.
#[wasm_bindgen]
pub fn parse_block_bytes(data: &[u8]) -> String {
    tx_parse::parse_block(data).unwrap_or_default()
}

/// Serialize the JSON transaction representation back to canonical prefix
/// bytes. Returns an empty vector on a serialization error.
#[wasm_bindgen]
pub fn serialize_transaction_json(json_str: &str) -> Vec<u8> {
    tx_serialize::serialize_transaction(json_str).unwrap_or_default()
}

// ─── Misc. native primitives (SHA-256, Argon2id, oracle signatures) ────────

/// Plain SHA-256 (used by the oracle pricing-record signature scheme and
/// wallet-file encryption key derivation; distinct from the CryptoNote
/// Keccak-256 digest used for prefix hashes and addresses).
#[wasm_bindgen]
pub fn sha256(data: &[u8]) -> Vec<u8> {
    use sha2::Digest;
    sha2::Sha256::digest(data).to_vec()
}

/// Argon2id key derivation, used for the at-rest wallet encryption envelope
/// (password → Argon2id → AES-256-GCM) described in §6.
#[wasm_bindgen]
pub fn argon2id_hash(
    password: &[u8],
    salt: &[u8],
    t_cost: u32,
    m_cost: u32,
    parallelism: u32,
    dk_len: u32,
) -> Vec<u8> {
    use argon2::{Algorithm, Argon2, Params, Version};
    let params = Params::new(m_cost, t_cost, parallelism, Some(dk_len as usize))
        .expect("invalid argon2 parameters");
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut out = vec![0u8; dk_len as usize];
    argon2
        .hash_password_into(password, salt, &mut out)
        .expect("argon2 hashing failed");
    out
}

/// Verify an ECDSA P-256 signature against a DER-encoded SPKI public key.
/// Returns `1` for a valid signature, `0` otherwise — including on any
/// malformed input; never panics. The testnet/stagenet oracle key is P-256;
/// the mainnet oracle key is DSA (see `salvium-consensus::oracle`), whose
/// verification is deliberately left to a caller-supplied backend rather
/// than guessed at here.
#[cfg(not(target_arch = "wasm32"))]
pub fn verify_signature(message: &[u8], signature_bytes: &[u8], pubkey_der: &[u8]) -> i32 {
    use signature::Verifier;

    let vk = match <p256::ecdsa::VerifyingKey as spki::DecodePublicKey>::from_public_key_der(pubkey_der) {
        Ok(vk) => vk,
        Err(_) => return 0,
    };
    let sig = match p256::ecdsa::Signature::from_der(signature_bytes) {
        Ok(sig) => sig,
        Err(_) => return 0,
    };
    if vk.verify(message, &sig).is_ok() {
        1
    } else {
        0
    }
}

#[cfg(target_arch = "wasm32")]
pub fn verify_signature(_message: &[u8], _signature_bytes: &[u8], _pubkey_der: &[u8]) -> i32 {
    0
}

//! C FFI bindings for salvium-crypto.
//!
//! All functions use the convention:
//!   - Caller owns all buffers
//!   - Rust writes into `*mut u8 out` of known size
//!   - Returns i32: 0 = ok, -1 = error
//!   - All functions prefixed `salvium_` to avoid symbol conflicts
//!
//! This module is only compiled on non-wasm targets (guarded by
//! `#[cfg(not(target_arch = "wasm32"))]` in lib.rs).

use std::slice;
use std::ptr;

// ─── Hashing ────────────────────────────────────────────────────────────────

#[no_mangle]
pub unsafe extern "C" fn salvium_keccak256(
    data: *const u8,
    data_len: usize,
    out: *mut u8,
) -> i32 {
    let data = slice::from_raw_parts(data, data_len);
    let result = crate::keccak256(data);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_blake2b(
    data: *const u8,
    data_len: usize,
    out_len: usize,
    out: *mut u8,
) -> i32 {
    let data = slice::from_raw_parts(data, data_len);
    let result = crate::blake2b_hash(data, out_len);
    ptr::copy_nonoverlapping(result.as_ptr(), out, out_len);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_blake2b_keyed(
    data: *const u8,
    data_len: usize,
    out_len: usize,
    key: *const u8,
    key_len: usize,
    out: *mut u8,
) -> i32 {
    let data = slice::from_raw_parts(data, data_len);
    let key = slice::from_raw_parts(key, key_len);
    let result = crate::blake2b_keyed(data, out_len, key);
    ptr::copy_nonoverlapping(result.as_ptr(), out, out_len);
    0
}

// ─── Scalar Operations ─────────────────────────────────────────────────────

#[no_mangle]
pub unsafe extern "C" fn salvium_sc_add(
    a: *const u8,
    b: *const u8,
    out: *mut u8,
) -> i32 {
    let a = slice::from_raw_parts(a, 32);
    let b = slice::from_raw_parts(b, 32);
    let result = crate::sc_add(a, b);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_sc_sub(
    a: *const u8,
    b: *const u8,
    out: *mut u8,
) -> i32 {
    let a = slice::from_raw_parts(a, 32);
    let b = slice::from_raw_parts(b, 32);
    let result = crate::sc_sub(a, b);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_sc_mul(
    a: *const u8,
    b: *const u8,
    out: *mut u8,
) -> i32 {
    let a = slice::from_raw_parts(a, 32);
    let b = slice::from_raw_parts(b, 32);
    let result = crate::sc_mul(a, b);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_sc_mul_add(
    a: *const u8,
    b: *const u8,
    c: *const u8,
    out: *mut u8,
) -> i32 {
    let a = slice::from_raw_parts(a, 32);
    let b = slice::from_raw_parts(b, 32);
    let c = slice::from_raw_parts(c, 32);
    let result = crate::sc_mul_add(a, b, c);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_sc_mul_sub(
    a: *const u8,
    b: *const u8,
    c: *const u8,
    out: *mut u8,
) -> i32 {
    let a = slice::from_raw_parts(a, 32);
    let b = slice::from_raw_parts(b, 32);
    let c = slice::from_raw_parts(c, 32);
    let result = crate::sc_mul_sub(a, b, c);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_sc_reduce32(
    s: *const u8,
    out: *mut u8,
) -> i32 {
    let s = slice::from_raw_parts(s, 32);
    let result = crate::sc_reduce32(s);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_sc_reduce64(
    s: *const u8,
    out: *mut u8,
) -> i32 {
    let s = slice::from_raw_parts(s, 64);
    let result = crate::sc_reduce64(s);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_sc_invert(
    a: *const u8,
    out: *mut u8,
) -> i32 {
    let a = slice::from_raw_parts(a, 32);
    let result = crate::sc_invert(a);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_sc_check(s: *const u8) -> i32 {
    let s = slice::from_raw_parts(s, 32);
    if crate::sc_check(s) { 1 } else { 0 }
}

#[no_mangle]
pub unsafe extern "C" fn salvium_sc_is_zero(s: *const u8) -> i32 {
    let s = slice::from_raw_parts(s, 32);
    if crate::sc_is_zero(s) { 1 } else { 0 }
}

// ─── Point Operations ───────────────────────────────────────────────────────

#[no_mangle]
pub unsafe extern "C" fn salvium_scalar_mult_base(
    s: *const u8,
    out: *mut u8,
) -> i32 {
    let s = slice::from_raw_parts(s, 32);
    let result = crate::scalar_mult_base(s);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_scalar_mult_point(
    s: *const u8,
    p: *const u8,
    out: *mut u8,
) -> i32 {
    let s = slice::from_raw_parts(s, 32);
    let p = slice::from_raw_parts(p, 32);
    let result = crate::scalar_mult_point(s, p);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_point_add(
    p: *const u8,
    q: *const u8,
    out: *mut u8,
) -> i32 {
    let p = slice::from_raw_parts(p, 32);
    let q = slice::from_raw_parts(q, 32);
    let result = crate::point_add_compressed(p, q);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_point_sub(
    p: *const u8,
    q: *const u8,
    out: *mut u8,
) -> i32 {
    let p = slice::from_raw_parts(p, 32);
    let q = slice::from_raw_parts(q, 32);
    let result = crate::point_sub_compressed(p, q);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_point_negate(
    p: *const u8,
    out: *mut u8,
) -> i32 {
    let p = slice::from_raw_parts(p, 32);
    let result = crate::point_negate(p);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_double_scalar_mult_base(
    a: *const u8,
    p: *const u8,
    b: *const u8,
    out: *mut u8,
) -> i32 {
    let a = slice::from_raw_parts(a, 32);
    let p = slice::from_raw_parts(p, 32);
    let b = slice::from_raw_parts(b, 32);
    let result = crate::double_scalar_mult_base(a, p, b);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

// ─── Hash-to-Point & Key Derivation ────────────────────────────────────────

#[no_mangle]
pub unsafe extern "C" fn salvium_hash_to_point(
    data: *const u8,
    data_len: usize,
    out: *mut u8,
) -> i32 {
    let data = slice::from_raw_parts(data, data_len);
    let result = crate::hash_to_point(data);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_generate_key_derivation(
    pub_key: *const u8,
    sec_key: *const u8,
    out: *mut u8,
) -> i32 {
    let pk = slice::from_raw_parts(pub_key, 32);
    let sk = slice::from_raw_parts(sec_key, 32);
    let result = crate::generate_key_derivation(pk, sk);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_generate_key_image(
    pub_key: *const u8,
    sec_key: *const u8,
    out: *mut u8,
) -> i32 {
    let pk = slice::from_raw_parts(pub_key, 32);
    let sk = slice::from_raw_parts(sec_key, 32);
    let result = crate::generate_key_image(pk, sk);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_derive_public_key(
    derivation: *const u8,
    output_index: u32,
    base_pub: *const u8,
    out: *mut u8,
) -> i32 {
    let deriv = slice::from_raw_parts(derivation, 32);
    let base = slice::from_raw_parts(base_pub, 32);
    let result = crate::derive_public_key(deriv, output_index, base);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_derive_secret_key(
    derivation: *const u8,
    output_index: u32,
    base_sec: *const u8,
    out: *mut u8,
) -> i32 {
    let deriv = slice::from_raw_parts(derivation, 32);
    let base = slice::from_raw_parts(base_sec, 32);
    let result = crate::derive_secret_key(deriv, output_index, base);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

// ─── Pedersen Commitments ───────────────────────────────────────────────────

#[no_mangle]
pub unsafe extern "C" fn salvium_pedersen_commit(
    amount: *const u8,
    mask: *const u8,
    out: *mut u8,
) -> i32 {
    let amount = slice::from_raw_parts(amount, 32);
    let mask = slice::from_raw_parts(mask, 32);
    let result = crate::pedersen_commit(amount, mask);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_zero_commit(
    amount: *const u8,
    out: *mut u8,
) -> i32 {
    let amount = slice::from_raw_parts(amount, 32);
    let result = crate::zero_commit(amount);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

#[no_mangle]
pub unsafe extern "C" fn salvium_gen_commitment_mask(
    secret: *const u8,
    out: *mut u8,
) -> i32 {
    let secret = slice::from_raw_parts(secret, 32);
    let result = crate::gen_commitment_mask(secret);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

// ─── Oracle Signature Verification ──────────────────────────────────────────

#[no_mangle]
pub unsafe extern "C" fn salvium_sha256(
    data: *const u8,
    data_len: usize,
    out: *mut u8,
) -> i32 {
    let data = slice::from_raw_parts(data, data_len);
    let result = crate::sha256(data);
    ptr::copy_nonoverlapping(result.as_ptr(), out, 32);
    0
}

/// Verify a signature against a DER-encoded SPKI public key.
/// Returns 1 for valid, 0 for invalid/error.
#[no_mangle]
pub unsafe extern "C" fn salvium_verify_signature(
    message: *const u8,
    msg_len: usize,
    signature: *const u8,
    sig_len: usize,
    pubkey_der: *const u8,
    key_len: usize,
) -> i32 {
    let message = slice::from_raw_parts(message, msg_len);
    let signature = slice::from_raw_parts(signature, sig_len);
    let pubkey_der = slice::from_raw_parts(pubkey_der, key_len);
    crate::verify_signature(message, signature, pubkey_der)
}

// ─── Tests ──────────────────────────────────────────────────────────────────

//! The seam between the pallet and the homomorphic-encryption coprocessor.
//!
//! The pallet never sees plaintexts. It stores and moves ciphertext handles, and asks the
//! coprocessor to combine them. Every handle that has never been written is the all-zero
//! [`ZERO_HANDLE`], which all operations treat as an encryption of `0`.

use codec::Encode;
use sp_core::H256;
use sp_io::hashing::blake2_256;

/// Opaque reference to a ciphertext held by the coprocessor.
pub type Handle = H256;

/// Sentinel for "no value recorded yet". Distinct from a recorded encryption of zero.
pub const ZERO_HANDLE: Handle = H256([0u8; 32]);

const INPUT_BINDING_TAG: &[u8; 10] = b"cbal/input";

/// Homomorphic operations over 64-bit encrypted integers.
///
/// Booleans produced by [`FheCoprocessor::le`] are handles too, and are only meaningful as
/// the condition of [`FheCoprocessor::select`].
pub trait FheCoprocessor {
    /// Checks that `input` was encrypted for `binding` and that `proof` attests to it.
    ///
    /// Returns the handle the pallet may use from now on, or `None` if the proof does not
    /// verify.
    fn verify_input(input: Handle, proof: &[u8], binding: [u8; 32]) -> Option<Handle>;

    /// Encrypts a public constant.
    fn trivial_encrypt(value: u64) -> Handle;

    fn add(lhs: Handle, rhs: Handle) -> Handle;

    /// Wrapping subtraction. Callers guard it with [`FheCoprocessor::le`].
    fn sub(lhs: Handle, rhs: Handle) -> Handle;

    /// Encrypted `lhs <= rhs`.
    fn le(lhs: Handle, rhs: Handle) -> Handle;

    /// Encrypted `if condition { if_true } else { if_false }`.
    fn select(condition: Handle, if_true: Handle, if_false: Handle) -> Handle;
}

/// The value an encrypted input must be bound to when it is sent by `caller` to `target`.
///
/// A proof produced for one (target, caller) pair does not verify for any other pair.
pub fn input_binding<Target: Encode, Caller: Encode>(target: &Target, caller: &Caller) -> [u8; 32] {
    blake2_256(&(INPUT_BINDING_TAG, target, caller).encode())
}

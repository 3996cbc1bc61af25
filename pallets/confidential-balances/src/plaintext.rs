//! A development coprocessor that keeps cleartexts in process memory.
//!
//! It gives no confidentiality at all. It exists so that tests and local development chains
//! can exercise the pallet logic, and so that a test oracle has something to decrypt against.
//! State is per thread.

use crate::coprocessor::{FheCoprocessor, Handle, ZERO_HANDLE};
use codec::Encode;
use sp_io::hashing::blake2_256;
use std::{cell::RefCell, collections::BTreeMap, vec::Vec};

thread_local! {
    static CLEARTEXTS: RefCell<BTreeMap<Handle, u64>> = const { RefCell::new(BTreeMap::new()) };
    static INPUT_BINDINGS: RefCell<BTreeMap<Handle, [u8; 32]>> =
        const { RefCell::new(BTreeMap::new()) };
    static NONCE: RefCell<u64> = const { RefCell::new(0) };
}

/// [`FheCoprocessor`] over cleartext `u64` values.
pub struct PlaintextCoprocessor;

impl PlaintextCoprocessor {
    /// Client side of an encrypted input: registers `value` and returns the input handle
    /// together with a proof that only verifies for `binding`.
    pub fn encrypt_input(value: u64, binding: [u8; 32]) -> (Handle, Vec<u8>) {
        let handle = Self::store(value);
        INPUT_BINDINGS.with(|bindings| bindings.borrow_mut().insert(handle, binding));
        (handle, binding.to_vec())
    }

    /// Cleartext behind `handle`, or `None` if the handle was never produced here.
    pub fn decrypt(handle: Handle) -> Option<u64> {
        if handle == ZERO_HANDLE {
            return Some(0);
        }
        CLEARTEXTS.with(|values| values.borrow().get(&handle).copied())
    }

    /// Forgets every handle.
    pub fn reset() {
        CLEARTEXTS.with(|values| values.borrow_mut().clear());
        INPUT_BINDINGS.with(|bindings| bindings.borrow_mut().clear());
    }

    fn store(value: u64) -> Handle {
        let nonce = NONCE.with(|nonce| {
            let mut nonce = nonce.borrow_mut();
            *nonce = nonce.wrapping_add(1);
            *nonce
        });
        let handle = Handle::from(blake2_256(&(b"plaintext-fhe", nonce).encode()));
        CLEARTEXTS.with(|values| values.borrow_mut().insert(handle, value));
        handle
    }

    fn read(handle: Handle) -> u64 {
        Self::decrypt(handle).unwrap_or_else(|| {
            log::warn!(target: crate::LOG_TARGET, "unknown handle {handle:?}, reading as zero");
            0
        })
    }
}

impl FheCoprocessor for PlaintextCoprocessor {
    fn verify_input(input: Handle, proof: &[u8], binding: [u8; 32]) -> Option<Handle> {
        let bound_to = INPUT_BINDINGS.with(|bindings| bindings.borrow().get(&input).copied())?;
        (bound_to == binding && proof == binding.as_slice()).then_some(input)
    }

    fn trivial_encrypt(value: u64) -> Handle {
        Self::store(value)
    }

    fn add(lhs: Handle, rhs: Handle) -> Handle {
        Self::store(Self::read(lhs).wrapping_add(Self::read(rhs)))
    }

    fn sub(lhs: Handle, rhs: Handle) -> Handle {
        Self::store(Self::read(lhs).wrapping_sub(Self::read(rhs)))
    }

    fn le(lhs: Handle, rhs: Handle) -> Handle {
        Self::store(u64::from(Self::read(lhs) <= Self::read(rhs)))
    }

    fn select(condition: Handle, if_true: Handle, if_false: Handle) -> Handle {
        if Self::read(condition) != 0 { Self::store(Self::read(if_true)) } else { Self::store(Self::read(if_false)) }
    }
}

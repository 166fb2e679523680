//! Miscellaneous utility functions and constants used in the crate.

use std::io::Cursor;
use std::io::Read;

use bitvec::prelude::*;
use simple_sds_sbwt::raw_vector::RawVector;
use simple_sds_sbwt::serialize::Serialize;

pub(crate) type BitVec = bitvec::vec::BitVec<u64, Lsb0>;

/// The DNA alphabet in the character order the index uses everywhere.
pub const DNA_ALPHABET: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Maps ascii A -> 0, C -> 1, G -> 2, T -> 3, upper and lower case.
/// All other bytes map to 255. Other code depends on this choice: don't touch it.
pub const ACGT_TO_0123: [u8; 256] = {
    let mut table = [255u8; 256];
    let mut i = 0;
    while i < DNA_ALPHABET.len() {
        table[DNA_ALPHABET[i] as usize] = i as u8;
        table[DNA_ALPHABET[i].to_ascii_lowercase() as usize] = i as u8;
        i += 1;
    }
    table
};

// Watson-Crick complement. Bytes outside acgtACGT map to themselves,
// so invalid characters stay invalid after complementation.
const COMPLEMENT: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = i as u8;
        i += 1;
    }
    table[b'A' as usize] = b'T';
    table[b'T' as usize] = b'A';
    table[b'C' as usize] = b'G';
    table[b'G' as usize] = b'C';
    table[b'a' as usize] = b't';
    table[b't' as usize] = b'a';
    table[b'c' as usize] = b'g';
    table[b'g' as usize] = b'c';
    table
};

/// Reverses the given ASCII DNA sequence and replaces each nucleotide with its complement.
pub fn reverse_complement_in_place(seq: &mut [u8]) {
    seq.reverse();
    for c in seq.iter_mut() {
        *c = COMPLEMENT[*c as usize];
    }
}

// Returns the number of bytes written
pub(crate) fn write_bytes<W: std::io::Write>(out: &mut W, bytes: &[u8]) -> std::io::Result<usize> {
    out.write_all(bytes)?;
    Ok(bytes.len())
}

// Leftmost index in [0..n) that fulfills the predicate, or n if none does.
// The predicate must be monotone: once true, it stays true for larger indices.
pub(crate) fn binary_search_leftmost<P: Fn(usize) -> bool>(pred: P, n: usize) -> usize {
    let mut lo = 0_usize;
    let mut hi = n;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

// Reinterprets a bitvec as a simple-sds raw bit vector by prepending the
// [n_bits, n_words] header that the RawVector serialization format expects.
pub(crate) fn bitvec_to_raw_vector(bv: &BitVec) -> RawVector {
    let header = [bv.len() as u64, bv.len().div_ceil(64) as u64];
    let header_bytes: &[u8] = bytemuck::cast_slice(&header);
    let data_bytes: &[u8] = bytemuck::cast_slice(bv.as_raw_slice());
    let mut stream = Cursor::new(header_bytes).chain(Cursor::new(data_bytes));
    RawVector::load(&mut stream).unwrap() // In-memory read of a valid header cannot fail
}

#[cfg(test)]
pub(crate) fn random_dna_string(len: usize, seed: u64) -> Vec<u8> {
    use rand_chacha::rand_core::{RngCore, SeedableRng};

    let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(seed);
    (0..len)
        .map(|_| DNA_ALPHABET[(rng.next_u64() % 4) as usize])
        .collect()
}

//! Subset rank queries on a sequence of subsets of the DNA alphabet.
//!
//! The SBWT is a sequence of subsets of {A,C,G,T}. The only operation the
//! query algorithms need on this sequence is the *subset rank query*: how many
//! of the first i subsets contain a given character? The [SubsetRank] trait
//! captures that capability, and [SubsetMatrix] implements it as four
//! parallel plain bit vectors with rank dictionaries. The index container
//! [SbwtIndex](crate::SbwtIndex) is generic over the implementation, so
//! alternative encodings can be plugged in without touching the query code.

use std::io::Read;
use std::io::Write;

use byteorder::LittleEndian;
use byteorder::ReadBytesExt;
use simple_sds_sbwt::bit_vector::BitVector;
use simple_sds_sbwt::ops::BitVec;
use simple_sds_sbwt::ops::Rank;
use simple_sds_sbwt::serialize::Serialize;

use crate::util;
use crate::util::DNA_ALPHABET;

/// Rank queries over a sequence of subsets of the DNA alphabet.
///
/// Characters are given as indexes into [DNA_ALPHABET](crate::util::DNA_ALPHABET),
/// that is, A = 0, C = 1, G = 2, T = 3. Callers are responsible for mapping
/// ascii to character indexes and for the validity of the index.
pub trait SubsetRank: Sized {
    /// Construct from one bit vector per character of the alphabet. The i-th
    /// subset contains character c iff bit i of the c-th vector is set.
    /// All vectors must have the same length.
    fn new_from_bit_vectors(rows: Vec<BitVector>) -> Self;

    /// Build the rank dictionaries. Must be called before [SubsetRank::rank].
    fn build_rank(&mut self);

    /// Number of subsets in the sequence.
    fn len(&self) -> usize;

    /// True iff the sequence has no subsets.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of subsets among the first `i` that contain the character with
    /// index `char_idx`. `i` may be equal to [SubsetRank::len].
    fn rank(&self, char_idx: u8, i: usize) -> usize;

    /// True iff the i-th subset contains the character with index `char_idx`.
    fn set_contains(&self, i: usize, char_idx: u8) -> bool;

    /// The i-th subset as a sorted list of character indexes.
    fn access(&self, i: usize) -> Vec<u8>;

    /// Writes the structure to the writer and returns the number of bytes
    /// written. The stream is self-framing: [SubsetRank::load] consumes
    /// exactly the bytes this function wrote.
    fn serialize<W: Write>(&self, out: &mut W) -> std::io::Result<usize>;

    /// Loads a structure previously written with [SubsetRank::serialize].
    fn load<R: Read>(input: &mut R) -> std::io::Result<Self>;
}

/// [SubsetRank] implemented as a matrix of indicator bit vectors, one row per
/// character, with a rank dictionary on each row. This is the plain matrix
/// representation of the SBWT paper: simple, fast, and within a few percent
/// of the entropy of typical genomic subset sequences.
#[derive(Clone, Debug, PartialEq)]
pub struct SubsetMatrix {
    rows: Vec<BitVector>,
}

impl SubsetMatrix {
    /// Access to the indicator bit vector of a character.
    pub fn row(&self, char_idx: u8) -> &BitVector {
        &self.rows[char_idx as usize]
    }
}

impl SubsetRank for SubsetMatrix {
    fn new_from_bit_vectors(rows: Vec<BitVector>) -> Self {
        for row in rows.iter().skip(1) {
            assert_eq!(row.len(), rows[0].len());
        }
        Self { rows }
    }

    fn build_rank(&mut self) {
        for row in self.rows.iter_mut() {
            row.enable_rank();
        }
    }

    fn len(&self) -> usize {
        self.rows.first().map_or(0, |row| row.len())
    }

    fn rank(&self, char_idx: u8, i: usize) -> usize {
        self.rows[char_idx as usize].rank(i)
    }

    fn set_contains(&self, i: usize, char_idx: u8) -> bool {
        self.rows[char_idx as usize].get(i)
    }

    fn access(&self, i: usize) -> Vec<u8> {
        (0..self.rows.len() as u8)
            .filter(|&c| self.set_contains(i, c))
            .collect()
    }

    fn serialize<W: Write>(&self, out: &mut W) -> std::io::Result<usize> {
        let mut n_written = util::write_bytes(out, &(self.rows.len() as u64).to_le_bytes())?;
        for row in self.rows.iter() {
            row.serialize(out)?;
            n_written += row.size_in_bytes();
        }
        Ok(n_written)
    }

    fn load<R: Read>(input: &mut R) -> std::io::Result<Self> {
        let n_rows = input.read_u64::<LittleEndian>()? as usize;
        if n_rows != DNA_ALPHABET.len() {
            return Err(std::io::ErrorKind::InvalidData.into());
        }
        let mut rows = Vec::<BitVector>::with_capacity(n_rows);
        for _ in 0..n_rows {
            let mut row = BitVector::load(input)?;
            row.enable_rank();
            rows.push(row);
        }
        if rows.iter().any(|row| row.len() != rows[0].len()) {
            return Err(std::io::ErrorKind::InvalidData.into());
        }
        Ok(Self { rows })
    }
}

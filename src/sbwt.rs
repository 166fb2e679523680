//! The [SbwtIndex] data structure: membership and colex rank queries on an
//! immutable set of k-mers.
//!
//! # SBWT index
//!
//! The SBWT index is a compressed index for searching for k-mers in a set of
//! k-mers. It can be seen as a version of the FM-index on sets of k-mers: the
//! set is completed into an automaton whose nodes ("columns") are the k-mers
//! plus dollar-padded dummy prefixes, sorted in colexicographic order, and
//! each column stores the subset of {A,C,G,T} labeling its outgoing edges.
//! The subsets are kept in a [SubsetRank] structure, and a k-mer is located
//! with k subset rank steps, exactly like backward search on a BWT. See the
//! paper "Succinct k-mer Set Representations Using Subset Rank Queries on
//! the Spectral Burrows-Wheeler Transform" (Alanko, Puglisi, Vuohtoniemi,
//! 2022) for the full story.
//!
//! An index is either *colex* (built over colex-sorted k-mers, search walks
//! the pattern left to right) or *lex* (built over lex-sorted k-mers, search
//! walks right to left). The orientation is a reading-direction flag;
//! everything else is identical.
//!
//! If the index carries suffix group start marks, [SbwtIndex::streaming_search]
//! locates every k-mer window of a long query with amortized one rank step
//! per character instead of k.

use std::io::Read;
use std::io::Write;

use byteorder::LittleEndian;
use byteorder::ReadBytesExt;
use simple_sds_sbwt::bit_vector::BitVector;
use simple_sds_sbwt::raw_vector::AccessRaw;
use simple_sds_sbwt::raw_vector::RawVector;
use simple_sds_sbwt::serialize::Serialize;

use crate::subset_rank::SubsetRank;
use crate::util;
use crate::util::ACGT_TO_0123;
use crate::util::DNA_ALPHABET;

/// Error type for the query operations of [SbwtIndex].
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum QueryError {
    /// Streaming search was called on an index built without suffix group
    /// start marks.
    #[error("streaming query support not built (the index has no suffix group start marks)")]
    StreamingUnsupported,
}

/// The SBWT index data structure. Construct with
/// [SbwtIndexBuilder](crate::SbwtIndexBuilder) or from precomputed bit
/// vectors with [SbwtIndex::from_bit_vectors]. For the [SubsetRank]
/// implementation we recommend the bit matrix [SubsetMatrix](crate::SubsetMatrix).
#[derive(Clone, PartialEq, Debug)]
#[allow(non_snake_case)] // C-array is an established convention in BWT indexes
pub struct SbwtIndex<SR: SubsetRank> {
    subset_rank: SR,
    // Marks the first column of every suffix group. Empty when streaming
    // support is not built.
    suffix_group_starts: RawVector,
    C: Vec<i64>, // Cumulative character counts (includes one ghost dollar)
    n_nodes: usize,
    k: usize,
    n_kmers: usize,
    // True if the index is over colex-sorted k-mers (the paper convention),
    // false if over lex-sorted k-mers. With lex sorting the search walks the
    // k-mer backwards.
    colex: bool,
}

impl<SR: SubsetRank> SbwtIndex<SR> {
    /// Construct from precomputed data: one indicator bit vector per
    /// character, the suffix group start vector (may be empty, which disables
    /// streaming queries), the k-mer length, the number of k-mers, and the
    /// orientation. The C-array is derived from full-length rank queries.
    #[allow(non_snake_case)]
    pub fn from_bit_vectors(
        A_bits: RawVector,
        C_bits: RawVector,
        G_bits: RawVector,
        T_bits: RawVector,
        streaming_support: RawVector,
        k: usize,
        n_kmers: usize,
        colex: bool,
    ) -> Self {
        let n_nodes = A_bits.len();
        assert_eq!(C_bits.len(), n_nodes);
        assert_eq!(G_bits.len(), n_nodes);
        assert_eq!(T_bits.len(), n_nodes);
        assert!(streaming_support.is_empty() || streaming_support.len() == n_nodes);

        let rows = vec![A_bits, C_bits, G_bits, T_bits]
            .into_iter()
            .map(BitVector::from)
            .collect();
        let mut subset_rank = SR::new_from_bit_vectors(rows);
        subset_rank.build_rank();

        let C = Self::compute_C_array(&subset_rank);
        Self {
            subset_rank,
            suffix_group_starts: streaming_support,
            C,
            n_nodes,
            k,
            n_kmers,
            colex,
        }
    }

    /// Number of k-mers in the index, not counting dummy columns.
    pub fn n_kmers(&self) -> usize {
        self.n_kmers
    }

    /// Number of subsets (columns) in the SBWT.
    pub fn n_sets(&self) -> usize {
        self.n_nodes
    }

    /// Length of the k-mers in the index.
    pub fn k(&self) -> usize {
        self.k
    }

    /// True iff the index is over colex-sorted k-mers. With lex sorting the
    /// search walks the k-mer backwards.
    pub fn is_colex(&self) -> bool {
        self.colex
    }

    /// Returns the C-array of the index.
    /// The array is such that C\[i\] is 1 plus the number of sets in the SBWT
    /// that contain a character smaller than the i-th character of the alphabet.
    #[allow(non_snake_case)]
    pub fn C_array(&self) -> &[i64] {
        self.C.as_slice()
    }

    /// The suffix group start marks. Empty iff streaming support is not built.
    pub fn streaming_support(&self) -> &RawVector {
        &self.suffix_group_starts
    }

    /// The subset rank structure holding the SBWT set sequence.
    pub fn subset_rank(&self) -> &SR {
        &self.subset_rank
    }

    /// True iff [SbwtIndex::streaming_search] is available on this index.
    pub fn has_streaming_query_support(&self) -> bool {
        !self.suffix_group_starts.is_empty()
    }

    /// Searches for the k-mer at the start of `kmer`, which must have at
    /// least [SbwtIndex::k] characters; the rest are ignored. Characters are
    /// matched case-insensitively. Returns the index of the column of the
    /// k-mer, or -1 if the k-mer is not in the index or contains a non-ACGT
    /// character.
    ///
    /// # Panics
    ///
    /// Panics if the search ends in a multi-column range, which can only
    /// happen if the index is structurally corrupt.
    pub fn search(&self, kmer: &[u8]) -> i64 {
        assert!(kmer.len() >= self.k, "query shorter than k");

        let mut node_left = 0_i64;
        let mut node_right = self.n_nodes as i64 - 1;
        for i in 0..self.k {
            let c = if self.colex { kmer[i] } else { kmer[self.k - 1 - i] };
            let char_idx = ACGT_TO_0123[c as usize];
            if char_idx == 255 {
                return -1; // Character does not exist in the index
            }

            node_left = self.lf_step(node_left, char_idx);
            node_right = self.lf_step(node_right + 1, char_idx) - 1;

            if node_left > node_right {
                return -1; // Not found
            }
        }
        if node_left != node_right {
            // A full-length search must resolve to a single column. A wider
            // range means the subset sequence does not encode a valid SBWT.
            panic!(
                "corrupt SBWT index: search ended in range [{}, {}]",
                node_left, node_right
            );
        }
        node_left
    }

    /// Searches for every k-mer window of `input`, reusing work between
    /// overlapping windows through the suffix group start marks. Returns one
    /// result per window in left-to-right position order, regardless of the
    /// index orientation: the i-th result is the column of `input[i..i+k]`,
    /// or -1 if that window is not in the index. If the input is shorter
    /// than k, the result is empty.
    ///
    /// Returns [QueryError::StreamingUnsupported] if the index was built
    /// without suffix group start marks.
    pub fn streaming_search(&self, input: &[u8]) -> Result<Vec<i64>, QueryError> {
        if !self.has_streaming_query_support() {
            return Err(QueryError::StreamingUnsupported);
        }

        let len = input.len();
        let mut ans = Vec::<i64>::new();
        if len < self.k {
            return Ok(ans);
        }
        ans.reserve(len - self.k + 1);

        // With lex sorting the windows are processed from right to left
        let first_start = if self.colex { 0 } else { len - self.k };
        ans.push(self.search(&input[first_start..first_start + self.k]));

        for i in 1..(len - self.k + 1) {
            if *ans.last().unwrap() == -1 {
                // Need to search from scratch
                let start = if self.colex { first_start + i } else { first_start - i };
                ans.push(self.search(&input[start..start + self.k]));
                continue;
            }

            // The previous window resolved, so extending from the start of
            // its suffix group takes a single rank step.
            let mut column = *ans.last().unwrap();
            while !self.suffix_group_starts.bit(column as usize) {
                column -= 1; // Cannot go negative because the first column is always marked
            }

            let c = if self.colex { input[i + self.k - 1] } else { input[len - self.k - i] };
            let char_idx = ACGT_TO_0123[c as usize];
            if char_idx == 255 {
                ans.push(-1); // Not found
                continue;
            }

            let node_left = self.lf_step(column, char_idx);
            let node_right = self.lf_step(column + 1, char_idx) - 1;
            ans.push(if node_left == node_right { node_left } else { -1 });
        }

        if !self.colex {
            ans.reverse(); // Report in left-to-right position order on the input
        }
        Ok(ans)
    }

    /// A low-level function returning `C[char_idx] + rank(char_idx, i)`.
    fn lf_step(&self, i: i64, char_idx: u8) -> i64 {
        self.C[char_idx as usize] + self.subset_rank.rank(char_idx, i as usize) as i64
    }

    /// Writes the index to the writer and returns the number of bytes
    /// written. The index can later be loaded with [SbwtIndex::load].
    pub fn serialize<W: Write>(&self, out: &mut W) -> std::io::Result<usize> {
        let mut n_written = 0_usize;

        n_written += self.subset_rank.serialize(out)?;

        self.suffix_group_starts.serialize(out)?;
        n_written += self.suffix_group_starts.size_in_bytes();

        // We're not using serde because we want full control over the bytes
        // in order to guarantee compatibility across languages

        n_written += util::write_bytes(out, &((self.C.len() * 8) as u64).to_le_bytes())?;
        for x in self.C.iter() {
            n_written += util::write_bytes(out, &x.to_le_bytes())?;
        }

        n_written += util::write_bytes(out, &(self.n_nodes as i64).to_le_bytes())?;
        n_written += util::write_bytes(out, &(self.k as i64).to_le_bytes())?;
        n_written += util::write_bytes(out, &[self.colex as u8])?;

        Ok(n_written)
    }

    /// Loads an index that was previously serialized with [SbwtIndex::serialize].
    #[allow(non_snake_case)] // For C-array
    pub fn load<R: Read>(input: &mut R) -> std::io::Result<Self> {
        let subset_rank = SR::load(input)?;
        let suffix_group_starts = RawVector::load(input)?;

        let C_byte_length = input.read_u64::<LittleEndian>()? as usize;
        if C_byte_length % 8 != 0 {
            return Err(std::io::ErrorKind::InvalidData.into());
        }
        let mut C = Vec::<i64>::with_capacity(C_byte_length / 8);
        for _ in 0..C_byte_length / 8 {
            C.push(input.read_i64::<LittleEndian>()?);
        }

        let n_nodes = input.read_i64::<LittleEndian>()?;
        let k = input.read_i64::<LittleEndian>()?;
        let mut colex_flag = [0_u8; 1];
        input.read_exact(&mut colex_flag)?;

        if n_nodes < 0 || k < 0 || n_nodes as usize != subset_rank.len() {
            return Err(std::io::ErrorKind::InvalidData.into());
        }
        if C.len() != DNA_ALPHABET.len() {
            return Err(std::io::ErrorKind::InvalidData.into());
        }
        let n_nodes = n_nodes as usize;
        let k = k as usize;

        // The stored C-array is authoritative, but it must agree with the
        // ranks of the subset sequence it was stored with.
        debug_assert_eq!(C, Self::compute_C_array(&subset_rank));
        debug_assert!(suffix_group_starts.is_empty() || suffix_group_starts.bit(0));

        // The number of k-mers is not part of the serialization format, but
        // it is recoverable: the non-k-mer columns are exactly the columns
        // reachable from the root in fewer than k steps.
        let n_kmers = n_nodes - Self::count_dummy_nodes(&subset_rank, &C, k);
        log::debug!(
            "Loaded SBWT index: {} columns, {} k-mers, k = {}",
            n_nodes,
            n_kmers,
            k
        );

        Ok(Self {
            subset_rank,
            suffix_group_starts,
            C,
            n_nodes,
            k,
            n_kmers,
            colex: colex_flag[0] != 0,
        })
    }

    /// Derives the C-array from full-length rank queries: C\[0\] counts the
    /// ghost dollar of the root, and each later entry adds the total number
    /// of subsets containing the previous character.
    #[allow(non_snake_case)]
    fn compute_C_array(subset_rank: &SR) -> Vec<i64> {
        let n = subset_rank.len();
        let mut C = vec![0_i64; DNA_ALPHABET.len()];
        C[0] = 1; // There is one incoming ghost-dollar to the root node
        for c in 1..DNA_ALPHABET.len() {
            C[c] = C[c - 1] + subset_rank.rank(c as u8 - 1, n) as i64;
        }
        C
    }

    // Walks the dummy part of the SBWT graph: the root column, its
    // successors, and so on for k-1 steps. Every column in the walk is
    // distinct because each column has at most one incoming edge, so the
    // total work is bounded by the number of dummy columns.
    #[allow(non_snake_case)]
    fn count_dummy_nodes(subset_rank: &SR, C: &[i64], k: usize) -> usize {
        if subset_rank.is_empty() {
            return 0;
        }
        let mut n_dummies = 1_usize; // The root
        let mut frontier = vec![0_i64];
        let mut next = Vec::<i64>::new();
        for _ in 1..k {
            next.clear();
            for &column in frontier.iter() {
                for char_idx in 0..DNA_ALPHABET.len() as u8 {
                    if subset_rank.set_contains(column as usize, char_idx) {
                        next.push(
                            C[char_idx as usize]
                                + subset_rank.rank(char_idx, column as usize) as i64,
                        );
                    }
                }
            }
            // Each column has at most one incoming edge, so the successors
            // must all be distinct; a repeat means the structure is broken.
            #[cfg(debug_assertions)]
            {
                let mut sorted = next.clone();
                sorted.sort_unstable();
                sorted.dedup();
                debug_assert_eq!(sorted.len(), next.len(), "duplicate columns in the dummy walk");
            }

            n_dummies += next.len();
            std::mem::swap(&mut frontier, &mut next);
        }
        n_dummies
    }
}

#[cfg(test)]
mod tests {

    use std::collections::HashSet;

    use crate::builder::SbwtIndexBuilder;
    use crate::subset_rank::SubsetMatrix;
    use crate::util::random_dna_string;

    use super::*;

    // The example k-mer set used throughout these tests, k = 3:
    // {AAA, AAC, ACG, CGT, GTA, TAA}.
    //
    // Every k-mer's 2-prefix is the 2-suffix of another k-mer, so the only
    // dummy column is the root. In colex order the columns are:
    //
    //   0 $$$   {}
    //   1 AAA   {A, C}     <- first of the suffix group {AAA, TAA}
    //   2 TAA   {}
    //   3 GTA   {A}
    //   4 AAC   {G}
    //   5 ACG   {T}
    //   6 CGT   {A}
    fn example_kmers() -> Vec<&'static [u8]> {
        vec![b"AAA", b"AAC", b"ACG", b"CGT", b"GTA", b"TAA"]
    }

    fn example_index(colex: bool) -> SbwtIndex<SubsetMatrix> {
        SbwtIndexBuilder::new()
            .k(3)
            .colex(colex)
            .run_from_slices::<SubsetMatrix>(&example_kmers())
    }

    #[test]
    fn example_structure_colex() {
        let index = example_index(true);

        assert_eq!(index.n_sets(), 7);
        assert_eq!(index.n_kmers(), 6);
        assert_eq!(index.k(), 3);
        assert!(index.is_colex());
        assert_eq!(index.C_array(), &[1, 4, 5, 6]);

        let expected_subsets: Vec<Vec<u8>> = vec![
            vec![],
            vec![0, 1],
            vec![],
            vec![0],
            vec![2],
            vec![3],
            vec![0],
        ];
        let computed: Vec<Vec<u8>> =
            (0..index.n_sets()).map(|i| index.subset_rank().access(i)).collect();
        assert_eq!(computed, expected_subsets);

        let expected_sg_starts = [true, true, false, true, true, true, true];
        assert!(index.has_streaming_query_support());
        for (i, &expected) in expected_sg_starts.iter().enumerate() {
            assert_eq!(index.streaming_support().bit(i), expected, "column {}", i);
        }
    }

    #[test]
    fn search_colex() {
        let index = example_index(true);

        assert_eq!(index.search(b"AAA"), 1);
        assert_eq!(index.search(b"TAA"), 2);
        assert_eq!(index.search(b"GTA"), 3);
        assert_eq!(index.search(b"AAC"), 4);
        assert_eq!(index.search(b"ACG"), 5);
        assert_eq!(index.search(b"CGT"), 6);

        assert_eq!(index.search(b"aac"), 4); // Case-insensitive
        assert_eq!(index.search(b"AACGT"), 4); // Only the first k characters are searched

        assert_eq!(index.search(b"AAT"), -1); // Absent
        assert_eq!(index.search(b"AAN"), -1); // Invalid character
        assert_eq!(index.search(b"A#A"), -1);
    }

    #[test]
    fn search_lex() {
        let index = example_index(false);
        assert!(!index.is_colex());
        assert_eq!(index.n_sets(), 7);
        assert_eq!(index.n_kmers(), 6);
        assert_eq!(index.C_array(), &[1, 4, 5, 6]);

        // In lex orientation the columns of the k-mers are their ranks in
        // the lexicographic order of the padded node set:
        // $$$, AAA, AAC, ACG, CGT, GTA, TAA.
        assert_eq!(index.search(b"AAA"), 1);
        assert_eq!(index.search(b"AAC"), 2);
        assert_eq!(index.search(b"ACG"), 3);
        assert_eq!(index.search(b"CGT"), 4);
        assert_eq!(index.search(b"GTA"), 5);
        assert_eq!(index.search(b"TAA"), 6);
        assert_eq!(index.search(b"AAT"), -1);
    }

    #[test]
    fn streaming_search_colex() {
        let index = example_index(true);

        assert_eq!(index.streaming_search(b"AACGTAA").unwrap(), vec![4, 5, 6, 3, 2]);
        assert_eq!(index.streaming_search(b"AA").unwrap(), Vec::<i64>::new());

        // The previous window TAA is not the first column of its suffix
        // group, so this exercises the backward walk along the marks.
        assert_eq!(index.streaming_search(b"GTAAC").unwrap(), vec![3, 2, 4]);

        // Dead windows force a restart from scratch
        assert_eq!(index.streaming_search(b"AATAAC").unwrap(), vec![-1, -1, 2, 4]);
        assert_eq!(index.streaming_search(b"AANGTAA").unwrap(), vec![-1, -1, -1, 3, 2]);
    }

    #[test]
    fn streaming_search_lex() {
        let index = example_index(false);

        // Same windows, reported left to right, in lex column indexes
        assert_eq!(index.streaming_search(b"AACGTAA").unwrap(), vec![2, 3, 4, 5, 6]);
        assert_eq!(index.streaming_search(b"AA").unwrap(), Vec::<i64>::new());
        assert_eq!(index.streaming_search(b"AAC").unwrap(), vec![2]); // len == k
        assert_eq!(index.streaming_search(b"AATAAC").unwrap(), vec![-1, -1, 6, 2]);
    }

    #[test]
    fn orientation_membership_equivalence() {
        let colex = example_index(true);
        let lex = example_index(false);
        for input in [
            b"AACGTAA".as_slice(),
            b"AAAACGTAAT",
            b"GTAAC",
            b"TTTT",
            b"AANGTAA",
        ] {
            let found_colex: Vec<bool> = colex
                .streaming_search(input)
                .unwrap()
                .iter()
                .map(|&x| x >= 0)
                .collect();
            let found_lex: Vec<bool> = lex
                .streaming_search(input)
                .unwrap()
                .iter()
                .map(|&x| x >= 0)
                .collect();
            assert_eq!(found_colex, found_lex);
        }
    }

    #[test]
    fn streaming_unsupported() {
        let index = SbwtIndexBuilder::new()
            .k(3)
            .streaming_support(false)
            .run_from_slices::<SubsetMatrix>(&example_kmers());
        assert!(!index.has_streaming_query_support());
        assert_eq!(
            index.streaming_search(b"AACGTAA"),
            Err(QueryError::StreamingUnsupported)
        );
        // Single k-mer search does not need the marks
        assert_eq!(index.search(b"AAC"), 4);
    }

    #[test_log::test]
    fn serialize_and_load() {
        for colex in [true, false] {
            for streaming in [true, false] {
                let index = SbwtIndexBuilder::new()
                    .k(3)
                    .colex(colex)
                    .streaming_support(streaming)
                    .run_from_slices::<SubsetMatrix>(&example_kmers());

                let mut buf = Vec::<u8>::new();
                let n_written = index.serialize(&mut buf).unwrap();
                assert_eq!(n_written, buf.len());

                let loaded = SbwtIndex::<SubsetMatrix>::load(&mut buf.as_slice()).unwrap();
                assert_eq!(index, loaded);
                assert_eq!(loaded.n_kmers(), 6);
                assert_eq!(loaded.k(), 3);
                assert_eq!(loaded.is_colex(), colex);
                assert_eq!(loaded.has_streaming_query_support(), streaming);
            }
        }
    }

    #[test]
    fn roundtrip_recovers_kmer_count_through_dummy_chains() {
        // ACG and GGT both lack a predecessor, so the automaton carries the
        // dummy chains $$$ -> $$A -> $AC and $$$ -> $$G -> $GG: five dummy
        // columns and two k-mer columns. Loading has to rediscover that
        // split by walking the chains.
        for colex in [true, false] {
            let index: SbwtIndex<SubsetMatrix> = SbwtIndexBuilder::new()
                .k(3)
                .colex(colex)
                .run_from_slices(&[b"ACG".as_slice(), b"GGT".as_slice()]);
            assert_eq!(index.n_sets(), 7);
            assert_eq!(index.n_kmers(), 2);

            let mut buf = Vec::<u8>::new();
            index.serialize(&mut buf).unwrap();
            let loaded = SbwtIndex::<SubsetMatrix>::load(&mut buf.as_slice()).unwrap();
            assert_eq!(index, loaded);
            assert_eq!(loaded.n_kmers(), 2);
            assert_eq!(loaded.n_sets(), 7);
        }
    }

    #[test]
    fn serialized_metadata_layout() {
        // The tail of the stream is fixed: C byte count, four C entries,
        // node count, k, colex flag.
        let index = example_index(true);
        let mut buf = Vec::<u8>::new();
        index.serialize(&mut buf).unwrap();

        let tail = &buf[buf.len() - (8 + 4 * 8 + 8 + 8 + 1)..];
        assert_eq!(&tail[0..8], &32_u64.to_le_bytes());
        assert_eq!(&tail[8..16], &1_i64.to_le_bytes());
        assert_eq!(&tail[16..24], &4_i64.to_le_bytes());
        assert_eq!(&tail[24..32], &5_i64.to_le_bytes());
        assert_eq!(&tail[32..40], &6_i64.to_le_bytes());
        assert_eq!(&tail[40..48], &7_i64.to_le_bytes()); // n_nodes
        assert_eq!(&tail[48..56], &3_i64.to_le_bytes()); // k
        assert_eq!(tail[56], 1); // colex
    }

    #[test]
    #[allow(non_snake_case)]
    fn C_array_consistency() {
        for colex in [true, false] {
            let index = example_index(colex);
            let C = index.C_array();
            let n = index.n_sets();
            for c in 0..3_u8 {
                assert_eq!(
                    C[c as usize + 1] - C[c as usize],
                    index.subset_rank().rank(c, n) as i64
                );
            }
            // One ghost dollar plus one incoming edge per non-root column
            assert_eq!(C[3] + index.subset_rank().rank(3, n) as i64, n as i64);
        }
    }

    #[test]
    fn membership_soundness_random() {
        let seq = random_dna_string(2000, 1234);
        let k = 7;
        let index: SbwtIndex<SubsetMatrix> =
            SbwtIndexBuilder::new().k(k).run_from_slices(&[seq.as_slice()]);

        let distinct: HashSet<&[u8]> = seq.windows(k).collect();
        assert_eq!(index.n_kmers(), distinct.len());

        let mut found_columns = HashSet::<i64>::new();
        for kmer in seq.windows(k) {
            let column = index.search(kmer);
            assert!(column >= 0 && column < index.n_sets() as i64);
            found_columns.insert(column);
        }
        // Distinct k-mers resolve to distinct columns
        assert_eq!(found_columns.len(), distinct.len());

        // Absent k-mers answer -1
        for i in 0..500 {
            let candidate = random_dna_string(k, 10_000 + i);
            if !distinct.contains(candidate.as_slice()) {
                assert_eq!(index.search(&candidate), -1);
            }
        }
    }

    #[test]
    fn streaming_equivalence_random() {
        let seq = random_dna_string(1000, 5678);
        for colex in [true, false] {
            let index: SbwtIndex<SubsetMatrix> = SbwtIndexBuilder::new()
                .k(5)
                .colex(colex)
                .run_from_slices(&[seq.as_slice()]);

            // Queries overlapping the indexed sequence, a disjoint random
            // string, and a string with invalid characters sprinkled in
            let mut with_gaps = random_dna_string(300, 99);
            for i in (0..with_gaps.len()).step_by(37) {
                with_gaps[i] = b'N';
            }
            let queries: Vec<Vec<u8>> = vec![
                seq[100..400].to_vec(),
                random_dna_string(300, 42),
                with_gaps,
                seq[0..5].to_vec(),
                seq[0..6].to_vec(),
            ];

            for query in queries.iter() {
                let streamed = index.streaming_search(query).unwrap();
                let scratch: Vec<i64> =
                    query.windows(5).map(|w| index.search(w)).collect();
                assert_eq!(streamed, scratch);
            }
        }
    }

    #[test]
    fn roundtrip_preserves_queries() {
        let seq = random_dna_string(500, 31337);
        let index: SbwtIndex<SubsetMatrix> =
            SbwtIndexBuilder::new().k(4).run_from_slices(&[seq.as_slice()]);

        let mut buf = Vec::<u8>::new();
        index.serialize(&mut buf).unwrap();
        let loaded = SbwtIndex::<SubsetMatrix>::load(&mut buf.as_slice()).unwrap();
        // Equality covers the recomputed k-mer count as well
        assert_eq!(index, loaded);

        let query = random_dna_string(200, 555);
        assert_eq!(
            index.streaming_search(&query).unwrap(),
            loaded.streaming_search(&query).unwrap()
        );
        for w in seq.windows(4).take(50) {
            assert_eq!(index.search(w), loaded.search(w));
        }
    }

    #[test]
    fn concurrent_queries() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SbwtIndex<SubsetMatrix>>();

        let seq = random_dna_string(1000, 7);
        let index: SbwtIndex<SubsetMatrix> =
            SbwtIndexBuilder::new().k(6).run_from_slices(&[seq.as_slice()]);

        std::thread::scope(|scope| {
            for t in 0..4 {
                let index = &index;
                let seq = &seq;
                scope.spawn(move || {
                    let expected: Vec<i64> = seq.windows(6).map(|w| index.search(w)).collect();
                    for _ in 0..10 {
                        assert_eq!(index.streaming_search(seq).unwrap(), expected);
                    }
                    let _ = t;
                });
            }
        });
    }
}

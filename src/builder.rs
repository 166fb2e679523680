//! In-memory construction of an [SbwtIndex] from a stream of DNA sequences.
//!
//! The pipeline extracts every valid k-mer window of the input, sorts the
//! k-mers colexicographically, completes the set into an SBWT automaton by
//! adding dollar-padded dummy prefixes for k-mers with no predecessor, and
//! emits the four subset indicator bit vectors plus the suffix group start
//! marks. Construction keeps the padded k-mer spectrum in memory as byte
//! rows, so it is meant for datasets that fit in RAM; massive inputs are
//! expected to go through an external k-mer counting pipeline that produces
//! the bit vectors directly (see [SbwtIndex::from_bit_vectors]).

use std::cmp::Ordering;

use bitvec::prelude::*;
use rayon::iter::IntoParallelIterator;
use rayon::iter::ParallelIterator;
use rayon::slice::ParallelSliceMut;
use simple_sds_sbwt::raw_vector::AccessRaw;
use simple_sds_sbwt::raw_vector::RawVector;

use crate::sbwt::SbwtIndex;
use crate::subset_rank::SubsetRank;
use crate::util;
use crate::util::ACGT_TO_0123;
use crate::util::DNA_ALPHABET;
use crate::SeqStream;

const DOLLAR: u8 = b'$'; // Smaller than every DNA character in ascii

/// Construction parameters. Passed explicitly so that building has no
/// process-wide state.
#[derive(Clone, Debug)]
pub struct BuildConfig {
    /// The k-mer length. Must be positive.
    pub k: usize,
    /// Also index the reverse complement of every input sequence.
    pub add_rev_comp: bool,
    /// Build the suffix group start marks required by
    /// [SbwtIndex::streaming_search].
    pub streaming_support: bool,
    /// Sort the k-mers colexicographically (the paper convention) or
    /// lexicographically. Queries work the same either way; only the column
    /// numbering and the internal reading direction differ.
    pub colex: bool,
    /// Number of rayon threads used during construction.
    pub n_threads: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            k: 30,
            add_rev_comp: false,
            streaming_support: true,
            colex: true,
            n_threads: 4,
        }
    }
}

/// Builds an [SbwtIndex] out of sequences of ascii DNA characters.
/// k-mer windows containing non-ACGT characters are skipped, and lower case
/// input is folded to upper case.
///
/// ```
/// use sbwt_index::{SbwtIndexBuilder, SbwtIndex, SubsetMatrix};
///
/// let index: SbwtIndex<SubsetMatrix> = SbwtIndexBuilder::new()
///     .k(4)
///     .run_from_slices(&[b"ACGTACGT".as_slice(), b"TTTTA".as_slice()]);
/// assert!(index.search(b"CGTA") >= 0);
/// assert_eq!(index.search(b"CCCC"), -1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SbwtIndexBuilder {
    config: BuildConfig,
}

impl SbwtIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build with the given configuration.
    pub fn from_config(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Set the k-mer length.
    pub fn k(mut self, k: usize) -> Self {
        self.config.k = k;
        self
    }

    /// Also index reverse complements.
    pub fn add_rev_comp(mut self, add_rev_comp: bool) -> Self {
        self.config.add_rev_comp = add_rev_comp;
        self
    }

    /// Enable or disable the suffix group start marks.
    pub fn streaming_support(mut self, streaming_support: bool) -> Self {
        self.config.streaming_support = streaming_support;
        self
    }

    /// Choose the sort order of the k-mers.
    pub fn colex(mut self, colex: bool) -> Self {
        self.config.colex = colex;
        self
    }

    /// Set the number of construction threads.
    pub fn n_threads(mut self, n_threads: usize) -> Self {
        self.config.n_threads = n_threads;
        self
    }

    /// Run the construction on a stream of sequences.
    pub fn run<SR: SubsetRank + Send, IN: SeqStream + Send>(self, mut seqs: IN) -> SbwtIndex<SR> {
        let config = self.config;
        assert!(config.k > 0, "k must be positive");

        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.n_threads)
            .build()
            .unwrap();

        thread_pool.install(|| {
            let mut kmers = ByteMatrix::new(config.k);
            while let Some(seq) = seqs.stream_next() {
                push_kmers_of_sequence(seq, config.colex, &mut kmers);
                if config.add_rev_comp {
                    let mut rc = seq.to_vec();
                    util::reverse_complement_in_place(&mut rc);
                    push_kmers_of_sequence(&rc, config.colex, &mut kmers);
                }
            }

            kmers.sort_and_dedup();
            log::info!("{} distinct k-mers found", kmers.n_rows());

            let dummies = required_dummies(&kmers);
            log::info!("{} dummy columns needed", dummies.n_rows());

            let n_kmers = kmers.n_rows();
            let nodes = merge_nodes(kmers, dummies);

            log::info!("Constructing the SBWT subset sequence");
            let rows = build_subset_bit_vectors(&nodes);

            let streaming_support = if config.streaming_support {
                mark_suffix_group_starts(&nodes)
            } else {
                RawVector::new()
            };

            log::info!("Building the subset rank structure");
            let [a_bits, c_bits, g_bits, t_bits] = rows;
            SbwtIndex::from_bit_vectors(
                a_bits,
                c_bits,
                g_bits,
                t_bits,
                streaming_support,
                config.k,
                n_kmers,
                config.colex,
            )
        })
    }

    /// Run the construction on a slice of ascii sequences.
    pub fn run_from_slices<SR: SubsetRank + Send>(self, seqs: &[&[u8]]) -> SbwtIndex<SR> {
        self.run(crate::SliceSeqStream::new(seqs))
    }

    /// Run the construction on a slice of ascii sequence vectors.
    pub fn run_from_vecs<SR: SubsetRank + Send>(self, seqs: &[Vec<u8>]) -> SbwtIndex<SR> {
        self.run(crate::VecSeqStream::new(seqs))
    }
}

// Fixed-width byte rows in a single flat allocation. Row i occupies
// data[i*width .. (i+1)*width]. Rows are dollar-padded k-mer labels, so a
// plain byte comparison of reversed rows is the colex order of the labels.
struct ByteMatrix {
    data: Vec<u8>,
    width: usize,
}

impl ByteMatrix {
    fn new(width: usize) -> Self {
        Self { data: Vec::new(), width }
    }

    fn n_rows(&self) -> usize {
        self.data.len() / self.width
    }

    fn row(&self, i: usize) -> &[u8] {
        &self.data[i * self.width..(i + 1) * self.width]
    }

    fn push_row(&mut self, row: &[u8]) {
        debug_assert_eq!(row.len(), self.width);
        self.data.extend_from_slice(row);
    }

    fn push_row_rev(&mut self, row: &[u8]) {
        debug_assert_eq!(row.len(), self.width);
        self.data.extend(row.iter().rev());
    }

    fn sort_and_dedup(&mut self) {
        let n = self.n_rows();
        let mut order: Vec<usize> = (0..n).collect();
        order.par_sort_unstable_by(|&a, &b| colex_cmp(self.row(a), self.row(b)));

        let mut deduped = Vec::<u8>::with_capacity(self.data.len());
        for (pos, &i) in order.iter().enumerate() {
            if pos > 0 && self.row(order[pos - 1]) == self.row(i) {
                continue;
            }
            deduped.extend_from_slice(self.row(i));
        }
        self.data = deduped;
        self.data.shrink_to_fit();
    }
}

// Colexicographic comparison of two equal-length rows: compare the last
// bytes first. The dollar is smaller than every DNA character in ascii.
fn colex_cmp(a: &[u8], b: &[u8]) -> Ordering {
    a.iter().rev().cmp(b.iter().rev())
}

// Appends every window of k consecutive ACGT characters, upper-cased.
// For lex-sorted construction the window is reversed, which turns the
// lexicographic order of the k-mers into the colex order of the rows.
fn push_kmers_of_sequence(seq: &[u8], colex: bool, out: &mut ByteMatrix) {
    let k = out.width;
    let normalized: Vec<u8> = seq.to_ascii_uppercase();
    let mut valid_run = 0_usize;
    for (i, &c) in normalized.iter().enumerate() {
        if ACGT_TO_0123[c as usize] == 255 {
            valid_run = 0;
        } else {
            valid_run += 1;
        }
        if valid_run >= k {
            let window = &normalized[i + 1 - k..=i];
            if colex {
                out.push_row(window);
            } else {
                out.push_row_rev(window);
            }
        }
    }
}

// The dummy columns of the automaton: for every k-mer with no predecessor,
// all of its proper prefixes, padded to width k with dollars from the left.
// The root (all dollars) is always included.
fn required_dummies(kmers: &ByteMatrix) -> ByteMatrix {
    let k = kmers.width;
    let has_predecessor = mark_kmers_with_predecessor(kmers);

    let mut dummies = ByteMatrix::new(k);
    let mut row_buf = vec![DOLLAR; k];
    dummies.push_row(&row_buf); // The root column
    for i in 0..kmers.n_rows() {
        if has_predecessor[i] {
            continue;
        }
        for prefix_len in 1..k {
            row_buf[..k - prefix_len].fill(DOLLAR);
            row_buf[k - prefix_len..].copy_from_slice(&kmers.row(i)[..prefix_len]);
            dummies.push_row(&row_buf);
        }
    }
    dummies.sort_and_dedup();
    dummies
}

// Marks the k-mers that have a predecessor in the set, that is, the k-mers y
// for which some k-mer x fulfills x[1..k) = y[0..k-1). For a fixed last
// character c, the candidates x[1..k)c are colex-sorted when x runs over the
// colex-sorted k-mers, so one forward scan per character suffices.
fn mark_kmers_with_predecessor(kmers: &ByteMatrix) -> util::BitVec {
    let n = kmers.n_rows();
    let k = kmers.width;

    let per_char: Vec<util::BitVec> = (0..DNA_ALPHABET.len())
        .into_par_iter()
        .map(|char_idx| {
            let c = DNA_ALPHABET[char_idx];
            let mut marks = bitvec![u64, Lsb0; 0; n];

            // k-mers ending with c form a contiguous colex range
            let lo = util::binary_search_leftmost(|i| kmers.row(i)[k - 1] >= c, n);
            let hi = util::binary_search_leftmost(|i| kmers.row(i)[k - 1] > c, n);

            let mut pointed_idx = lo;
            let mut candidate = vec![0_u8; k];
            for i in 0..n {
                candidate[..k - 1].copy_from_slice(&kmers.row(i)[1..]);
                candidate[k - 1] = c;
                while pointed_idx < hi && colex_cmp(kmers.row(pointed_idx), &candidate).is_lt() {
                    pointed_idx += 1;
                }
                if pointed_idx < hi && kmers.row(pointed_idx) == candidate.as_slice() {
                    marks.set(pointed_idx, true);
                    pointed_idx += 1;
                }
            }
            marks
        })
        .collect();

    let mut has_predecessor = bitvec![u64, Lsb0; 0; n];
    for marks in per_char {
        for idx in marks.iter_ones() {
            has_predecessor.set(idx, true);
        }
    }
    has_predecessor
}

// Merges the colex-sorted k-mers and dummies into the full column list.
// The inputs cannot share rows: dummy rows contain a dollar, k-mer rows do not.
fn merge_nodes(kmers: ByteMatrix, dummies: ByteMatrix) -> ByteMatrix {
    let k = kmers.width;
    let mut merged = ByteMatrix::new(k);
    merged.data.reserve(kmers.data.len() + dummies.data.len());

    let (mut i, mut j) = (0_usize, 0_usize);
    while i < kmers.n_rows() || j < dummies.n_rows() {
        let take_kmer = j == dummies.n_rows()
            || (i < kmers.n_rows() && colex_cmp(kmers.row(i), dummies.row(j)).is_lt());
        if take_kmer {
            merged.push_row(kmers.row(i));
            i += 1;
        } else {
            merged.push_row(dummies.row(j));
            j += 1;
        }
    }
    merged
}

// Builds the four subset indicator bit vectors over the merged column list.
// Bit c of column x is set iff the column for x[1..k)c exists and x is the
// first column of its suffix group, which implements the rule that only the
// colex-smallest predecessor keeps its edge.
fn build_subset_bit_vectors(nodes: &ByteMatrix) -> [RawVector; 4] {
    let n = nodes.n_rows();
    let k = nodes.width;

    let rows: Vec<RawVector> = (0..DNA_ALPHABET.len())
        .into_par_iter()
        .map(|char_idx| {
            let c = DNA_ALPHABET[char_idx];
            let mut row = RawVector::with_len(n, false);

            // Columns whose label ends with c form a contiguous colex range
            let lo = util::binary_search_leftmost(|i| nodes.row(i)[k - 1] >= c, n);
            let hi = util::binary_search_leftmost(|i| nodes.row(i)[k - 1] > c, n);

            let mut pointed_idx = lo;
            let mut candidate = vec![0_u8; k];
            for i in 0..n {
                candidate[..k - 1].copy_from_slice(&nodes.row(i)[1..]);
                candidate[k - 1] = c;
                while pointed_idx < hi && colex_cmp(nodes.row(pointed_idx), &candidate).is_lt() {
                    pointed_idx += 1;
                }
                if pointed_idx < hi && nodes.row(pointed_idx) == candidate.as_slice() {
                    row.set_bit(i, true);
                    pointed_idx += 1;
                }
            }
            row
        })
        .collect();

    // collect() preserves the character order
    rows.try_into().unwrap()
}

// Marks the first column of every suffix group: a maximal run of columns
// that agree on the last k-1 label characters, dollars included.
fn mark_suffix_group_starts(nodes: &ByteMatrix) -> RawVector {
    let n = nodes.n_rows();
    let mut marks = bitvec![u64, Lsb0; 0; n];
    if n > 0 {
        marks.set(0, true);
    }
    for i in 1..n {
        if nodes.row(i)[1..] != nodes.row(i - 1)[1..] {
            marks.set(i, true);
        }
    }
    util::bitvec_to_raw_vector(&marks)
}

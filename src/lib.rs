//! # sbwt-index
//!
//! A succinct index for sets of k-mers over the DNA alphabet {A,C,G,T},
//! based on the Spectral Burrows-Wheeler Transform (SBWT) of Alanko,
//! Puglisi and Vuohtoniemi. Given a k-mer, the index answers membership and
//! returns the k-mer's rank in a canonical (colex or lex) order of the set,
//! in k subset rank steps. Given a long query string, the streaming search
//! locates every k-mer window with amortized one rank step per character by
//! reusing work between overlapping windows through suffix group marks.
//!
//! The index is immutable after construction and safe to query from any
//! number of threads without synchronization.
//!
//! ```
//! use sbwt_index::{SbwtIndex, SbwtIndexBuilder, SubsetMatrix};
//!
//! let seqs: Vec<&[u8]> = vec![b"AACGTAA", b"TAAAC"];
//! let index: SbwtIndex<SubsetMatrix> =
//!     SbwtIndexBuilder::new().k(3).run_from_slices(&seqs);
//!
//! assert!(index.search(b"ACG") >= 0);
//! assert_eq!(index.search(b"GGG"), -1);
//!
//! // One result per window of the query, -1 for windows not in the index
//! let results = index.streaming_search(b"AACGT").unwrap();
//! assert_eq!(results.len(), 3);
//! assert!(results.iter().all(|&r| r >= 0));
//! ```
//!
//! The subset rank structure is a type parameter of [SbwtIndex]. The crate
//! ships the plain bit matrix implementation [SubsetMatrix]; anything
//! implementing [SubsetRank] plugs in.

pub mod builder;
pub mod sbwt;
pub mod subset_rank;
pub mod util;

pub use builder::BuildConfig;
pub use builder::SbwtIndexBuilder;
pub use sbwt::QueryError;
pub use sbwt::SbwtIndex;
pub use subset_rank::SubsetMatrix;
pub use subset_rank::SubsetRank;

/// A stream of ascii DNA sequences fed to the
/// [SbwtIndexBuilder](crate::SbwtIndexBuilder).
pub trait SeqStream {
    /// The next sequence in the stream, or None at the end.
    fn stream_next(&mut self) -> Option<&[u8]>;
}

/// Creates a [SeqStream] out of a slice of ascii sequences.
pub struct SliceSeqStream<'a> {
    slices: &'a [&'a [u8]],
    cur_slice_idx: usize,
}

impl<'a> SliceSeqStream<'a> {
    /// Creates a [SeqStream] out of a slice of ascii sequences.
    pub fn new(slices: &'a [&'a [u8]]) -> Self {
        Self { slices, cur_slice_idx: 0 }
    }
}

impl SeqStream for SliceSeqStream<'_> {
    fn stream_next(&mut self) -> Option<&[u8]> {
        let s = self.slices.get(self.cur_slice_idx)?;
        self.cur_slice_idx += 1;
        Some(s)
    }
}

/// Creates a [SeqStream] out of a slice of ascii sequence vectors.
pub struct VecSeqStream<'a> {
    seqs: &'a [Vec<u8>],
    cur_seq_idx: usize,
}

impl<'a> VecSeqStream<'a> {
    /// Creates a [SeqStream] out of a slice of ascii sequence vectors.
    pub fn new(seqs: &'a [Vec<u8>]) -> Self {
        Self { seqs, cur_seq_idx: 0 }
    }
}

impl SeqStream for VecSeqStream<'_> {
    fn stream_next(&mut self) -> Option<&[u8]> {
        let s = self.seqs.get(self.cur_seq_idx)?;
        self.cur_seq_idx += 1;
        Some(s)
    }
}

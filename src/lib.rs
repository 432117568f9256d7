//! # nanovec — embeddable vector database
//!
//! ## Architecture Overview
//!
//! ### Memory Layout: Structure of Arrays (SoA)
//!
//! The naive "Array of Structures" layout stores each vector as its own
//! heap allocation (`Vec<Vec<f32>>`). Each search iteration chases a pointer
//! to a random heap address, thrashing the L1/L2 cache with TLB misses.
//!
//! [`storage::SoaStorage`] instead uses a **flat, contiguous `Vec<f32>`**
//! where vector `i` occupies `data[i*dim .. (i+1)*dim]`. The search loop
//! walks this buffer sequentially, loading 256-bit (32-byte) cache lines
//! that feed directly into AVX2 YMM registers.
//!
//! ### Why `unsafe` get_unchecked in the hot path
//!
//! Every `slice[i]` access in safe Rust emits a bounds check: a cmp + jae.
//! In the inner dot-product loop, that is millions of extra branches per
//! query over a large namespace. [`distance`]'s unrolled accumulator proves
//! bounds safety once at the call site and removes them entirely.
//!
//! ## Module map
//!
//! - [`vector`] / [`distance`] / [`topk`]: the shared vector types, distance
//!   kernels, and bounded top-k heap every index builds on.
//! - [`storage`]: SoA storage with tombstones and geometric growth.
//! - [`index`]: the four primary dense indices (flat, KD-tree, IVF-Flat, PQ)
//!   behind one dispatch enum, plus the sparse inverted index.
//! - [`kmeans`]: the k-means routine shared by IVF-Flat training and PQ
//!   codebook training.
//! - [`namespace`] / [`manager`]: namespace configuration/lifecycle and the
//!   namespace manager that owns a process's namespace map.
//! - [`vacuum`]: background and on-demand compaction.
//! - [`snapshot`]: point-in-time snapshots and the bounded version ring.
//! - [`schema`]: the named-vector (multi-field) store.
//! - [`jsonpath`]: the metadata key-path index.
//! - [`persistence`]: binary codecs for every persistable component.
//! - [`filter`]: the predicate interface used by every search path.
//! - [`error`]: the crate-wide error taxonomy.

// Global allocator: mimalloc.
//
// mimalloc uses per-thread heaps with size-segregated free lists, making the
// small, frequent allocations a namespace's metadata lists and index arenas
// produce nearly contention-free. Declared at the crate root so it applies
// to every allocation in the process, including those made by parking_lot.
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub mod distance;
pub mod error;
pub mod filter;
pub mod index;
pub mod jsonpath;
pub mod kmeans;
pub mod manager;
pub mod namespace;
pub mod persistence;
pub mod schema;
pub mod snapshot;
pub mod storage;
pub mod topk;
pub mod vacuum;
pub mod vector;

pub use error::{Error, Result};
pub use manager::{NamespaceHandle, NamespaceManager};
pub use namespace::{IndexType, Namespace, NamespaceConfig, NamespaceStats};
pub use vector::{DenseVector, SparseVector};

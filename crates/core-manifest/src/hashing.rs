//! Streaming multi-digest hashing
//!
//! Every file is read once with a fixed buffer, and each chunk is fed to all
//! requested algorithms. Files are never loaded whole.

use crate::algorithm::ChecksumAlgorithm;
use crate::error::{Error, Result};
use rayon::prelude::*;
use sha2::digest::DynDigest;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const BUFFER_SIZE: usize = 64 * 1024;

/// Hex digests of one file, keyed by algorithm
pub type Digests = BTreeMap<ChecksumAlgorithm, String>;

/// Streaming hasher that feeds several algorithms at once
pub struct MultiHasher {
    hashers: Vec<(ChecksumAlgorithm, Box<dyn DynDigest + Send>)>,
}

impl MultiHasher {
    /// Create a hasher for the given algorithms (duplicates are ignored)
    pub fn new<I>(algorithms: I) -> Self
    where
        I: IntoIterator<Item = ChecksumAlgorithm>,
    {
        let mut hashers: Vec<(ChecksumAlgorithm, Box<dyn DynDigest + Send>)> = Vec::new();
        for alg in algorithms {
            if hashers.iter().all(|(existing, _)| *existing != alg) {
                hashers.push((alg, alg.hasher()));
            }
        }
        Self { hashers }
    }

    /// Update every digest with new data
    pub fn update(&mut self, data: &[u8]) {
        for (_, hasher) in &mut self.hashers {
            hasher.update(data);
        }
    }

    /// Finalize and return lowercase hex digests
    pub fn finalize(self) -> Digests {
        self.hashers
            .into_iter()
            .map(|(alg, hasher)| (alg, hex::encode(hasher.finalize())))
            .collect()
    }
}

/// Hash a single file with every requested algorithm
pub fn hash_file(path: &Path, algorithms: &[ChecksumAlgorithm]) -> Result<Digests> {
    let mut file = BufReader::new(File::open(path)?);
    let mut hasher = MultiHasher::new(algorithms.iter().copied());
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}

/// Hash a list of bag-relative files under `root`
///
/// `workers` above one spreads files over a dedicated thread pool; the call
/// still returns only after every file is hashed. Output order follows the
/// input order.
pub fn hash_files(
    root: &Path,
    relative_paths: &[String],
    algorithms: &[ChecksumAlgorithm],
    workers: usize,
) -> Result<Vec<(String, Digests)>> {
    let hash_one = |rel: &String| -> Result<(String, Digests)> {
        let digests = hash_file(&root.join(rel), algorithms)?;
        Ok((rel.clone(), digests))
    };

    if workers <= 1 {
        return relative_paths.iter().map(hash_one).collect();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| Error::WorkerPool(e.to_string()))?;

    pool.install(|| relative_paths.par_iter().map(hash_one).collect())
}

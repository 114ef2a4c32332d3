//! Mini-batch assembly with optional parallel prefetch
//!
//! Training iterates the source in shuffled mini-batch order, reshuffled
//! every epoch from a seed derived from the run seed, and drops the trailing
//! partial batch for consistent batch shapes. Validation and test iterate in
//! fixed order and keep the remainder.
//!
//! With `num_workers > 0`, decode work fans out to worker threads feeding a
//! bounded channel; the consumer reorders by batch index, so the batch
//! sequence is byte-identical to the synchronous path. Batches are immutable
//! payloads — no parameter state ever crosses the channel.

use ndarray::{Array1, Array3};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::mpsc::{sync_channel, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::source::{SampleMeta, SampleSource};

/// One mini-batch of decoded samples.
pub struct Batch {
    pub images: Vec<Array3<f32>>,
    pub targets: Array1<f32>,
    pub meta: Vec<SampleMeta>,
}

impl Batch {
    /// Number of samples in the batch.
    pub fn size(&self) -> usize {
        self.targets.len()
    }
}

/// Epoch-aware batch iterator factory over one [`SampleSource`].
pub struct BatchLoader {
    source: Arc<SampleSource>,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    num_workers: usize,
    seed: u64,
}

impl BatchLoader {
    /// Create a loader. `shuffle` and `drop_last` are both true for training
    /// and both false for validation/test.
    pub fn new(
        source: Arc<SampleSource>,
        batch_size: usize,
        shuffle: bool,
        drop_last: bool,
        num_workers: usize,
        seed: u64,
    ) -> Self {
        assert!(batch_size > 0, "batch_size must be positive");
        Self {
            source,
            batch_size,
            shuffle,
            drop_last,
            num_workers,
            seed,
        }
    }

    /// Number of batches one epoch yields.
    pub fn num_batches(&self) -> usize {
        let n = self.source.len();
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }

    /// Number of underlying samples.
    pub fn num_samples(&self) -> usize {
        self.source.len()
    }

    /// Iterate the batches of one epoch.
    pub fn iter_epoch(&self, epoch: usize) -> BatchIter {
        let batches = self.batch_indices(epoch);

        if self.num_workers == 0 {
            return BatchIter {
                inner: Inner::Sync {
                    source: Arc::clone(&self.source),
                    batches: batches.into_iter(),
                },
            };
        }

        let total = batches.len();
        let workers = self.num_workers.min(total.max(1));
        // Bounded in-flight queue: decode stays ahead of the training step
        // without buffering the whole epoch.
        let (tx, rx) = sync_channel::<(usize, Batch)>(workers * 2);

        let mut handles = Vec::with_capacity(workers);
        for w in 0..workers {
            let tx = tx.clone();
            let source = Arc::clone(&self.source);
            let assigned: Vec<(usize, Vec<usize>)> = batches
                .iter()
                .enumerate()
                .skip(w)
                .step_by(workers)
                .map(|(i, b)| (i, b.clone()))
                .collect();

            handles.push(std::thread::spawn(move || {
                for (batch_index, indices) in assigned {
                    let batch = decode_batch(&source, &indices);
                    if tx.send((batch_index, batch)).is_err() {
                        // Consumer went away; stop decoding.
                        break;
                    }
                }
            }));
        }
        drop(tx);

        BatchIter {
            inner: Inner::Parallel {
                rx: Some(rx),
                pending: HashMap::new(),
                next_index: 0,
                total,
                handles,
            },
        }
    }

    fn batch_indices(&self, epoch: usize) -> Vec<Vec<usize>> {
        let mut indices: Vec<usize> = (0..self.source.len()).collect();
        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(epoch as u64));
            indices.shuffle(&mut rng);
        }

        let mut batches: Vec<Vec<usize>> = indices
            .chunks(self.batch_size)
            .map(|c| c.to_vec())
            .collect();
        if self.drop_last {
            batches.retain(|b| b.len() == self.batch_size);
        }
        batches
    }
}

fn decode_batch(source: &SampleSource, indices: &[usize]) -> Batch {
    let mut images = Vec::with_capacity(indices.len());
    let mut targets = Vec::with_capacity(indices.len());
    let mut meta = Vec::with_capacity(indices.len());
    for &i in indices {
        let (tensor, target, sample_meta) = source.get(i);
        images.push(tensor);
        targets.push(target);
        meta.push(sample_meta);
    }
    Batch {
        images,
        targets: Array1::from_vec(targets),
        meta,
    }
}

enum Inner {
    Sync {
        source: Arc<SampleSource>,
        batches: std::vec::IntoIter<Vec<usize>>,
    },
    Parallel {
        rx: Option<Receiver<(usize, Batch)>>,
        pending: HashMap<usize, Batch>,
        next_index: usize,
        total: usize,
        handles: Vec<JoinHandle<()>>,
    },
}

/// Iterator over one epoch's batches, in deterministic batch order.
pub struct BatchIter {
    inner: Inner,
}

impl Iterator for BatchIter {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        match &mut self.inner {
            Inner::Sync { source, batches } => {
                let indices = batches.next()?;
                Some(decode_batch(source, &indices))
            }
            Inner::Parallel {
                rx,
                pending,
                next_index,
                total,
                handles,
            } => {
                if *next_index >= *total {
                    return None;
                }
                // Reorder buffer: accept out-of-order completions until the
                // next in-sequence batch arrives.
                while !pending.contains_key(next_index) {
                    match rx.as_ref()?.recv() {
                        Ok((index, batch)) => {
                            pending.insert(index, batch);
                        }
                        Err(_) => return None,
                    }
                }
                let batch = pending.remove(next_index);
                *next_index += 1;
                if *next_index >= *total {
                    // Epoch complete: release the channel and reap workers.
                    rx.take();
                    for handle in handles.drain(..) {
                        let _ = handle.join();
                    }
                }
                batch
            }
        }
    }
}

impl Drop for BatchIter {
    fn drop(&mut self) {
        if let Inner::Parallel { rx, handles, .. } = &mut self.inner {
            // Dropping the receiver unblocks any worker parked on send.
            rx.take();
            for handle in handles.drain(..) {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::records::LabeledExample;
    use crate::data::split::{DatasetSplit, SplitName};
    use crate::model::transform::ImageTransform;
    use image::RgbImage;
    use tempfile::TempDir;

    fn build_source(dir: &TempDir, n: u64) -> Arc<SampleSource> {
        let examples: Vec<LabeledExample> = (0..n)
            .map(|id| {
                RgbImage::new(8, 8)
                    .save(dir.path().join(format!("{id}.jpg")))
                    .unwrap();
                LabeledExample {
                    asset_id: id,
                    votes: [0.1; 10],
                    derived_score: 5.0,
                    target_score: id as f32,
                    total_votes: 1.0,
                }
            })
            .collect();
        let split = DatasetSplit {
            name: SplitName::Train,
            examples,
        };
        Arc::new(SampleSource::new(split, dir.path(), ImageTransform))
    }

    fn batch_ids(loader: &BatchLoader, epoch: usize) -> Vec<Vec<u64>> {
        loader
            .iter_epoch(epoch)
            .map(|b| b.meta.iter().map(|m| m.asset_id).collect())
            .collect()
    }

    #[test]
    fn test_fixed_order_without_shuffle() {
        let dir = TempDir::new().unwrap();
        let source = build_source(&dir, 5);
        let loader = BatchLoader::new(source, 2, false, false, 0, 42);

        assert_eq!(loader.num_batches(), 3);
        let ids = batch_ids(&loader, 0);
        assert_eq!(ids, vec![vec![0, 1], vec![2, 3], vec![4]]);
    }

    #[test]
    fn test_drop_last_removes_partial_batch() {
        let dir = TempDir::new().unwrap();
        let source = build_source(&dir, 5);
        let loader = BatchLoader::new(source, 2, false, true, 0, 42);

        assert_eq!(loader.num_batches(), 2);
        let total: usize = loader.iter_epoch(0).map(|b| b.size()).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn test_shuffle_is_deterministic_per_epoch() {
        let dir = TempDir::new().unwrap();
        let source = build_source(&dir, 12);
        let loader = BatchLoader::new(source, 4, true, true, 0, 7);

        assert_eq!(batch_ids(&loader, 0), batch_ids(&loader, 0));
        assert_ne!(batch_ids(&loader, 0), batch_ids(&loader, 1));
    }

    #[test]
    fn test_parallel_matches_synchronous_order() {
        let dir = TempDir::new().unwrap();
        let source = build_source(&dir, 10);
        let sync_loader = BatchLoader::new(Arc::clone(&source), 3, true, false, 0, 42);
        let par_loader = BatchLoader::new(source, 3, true, false, 3, 42);

        assert_eq!(batch_ids(&sync_loader, 2), batch_ids(&par_loader, 2));
    }

    #[test]
    fn test_parallel_early_drop_does_not_hang() {
        let dir = TempDir::new().unwrap();
        let source = build_source(&dir, 10);
        let loader = BatchLoader::new(source, 2, false, false, 2, 42);

        let mut iter = loader.iter_epoch(0);
        let _first = iter.next().unwrap();
        drop(iter); // workers must unblock and exit
    }

    #[test]
    fn test_batch_targets_match_meta() {
        let dir = TempDir::new().unwrap();
        let source = build_source(&dir, 6);
        let loader = BatchLoader::new(source, 3, false, false, 0, 42);

        for batch in loader.iter_epoch(0) {
            for (i, meta) in batch.meta.iter().enumerate() {
                // target_score was set to the asset id in build_source
                assert_eq!(batch.targets[i], meta.asset_id as f32);
            }
        }
    }
}

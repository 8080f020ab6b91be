// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The Lloyd Authors

//! K-means clustering with Lloyd's algorithm.
//!
//! Each iteration runs an assignment step (every sample goes to the nearest
//! centroid by squared L2 distance, lowest centroid index on ties) followed by an
//! update step (every centroid moves to the mean of its members). A centroid whose
//! cluster is empty keeps its previous position, so there are always `k` centroids.
//!
//! Training stops when the assignment vector stops changing, when no centroid
//! moved more than `tolerance`, or after `max_iters` iterations.

use log::{debug, info, warn};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::SmallRng;
use rayon::prelude::*;
use tracing::instrument;

use crate::distance::{l2_distance_batch, L2};
use crate::kernels::{argmin_float, argmin_value_float};
use crate::matrix::Dataset;
use crate::{Error, Result};

/// Minimal number of rows handed to one rayon task in the assignment step.
const MIN_ROWS_PER_TASK: usize = 512;

/// KMeans initialization method.
#[derive(Debug, Clone, PartialEq)]
pub enum KMeansInit {
    /// Pick `k` distinct samples uniformly at random.
    Random,
    /// k-means++ seeding: each next centroid is drawn with probability
    /// proportional to its squared distance to the closest chosen centroid.
    KMeansPlusPlus,
    /// Start from the given `k x D` centroids. Always trains a single run.
    Centroids(Dataset),
}

/// KMeans Training Parameters
#[derive(Debug, Clone)]
pub struct KMeansParams {
    /// Max number of iterations of a single run.
    pub max_iters: u32,

    /// Stop the training once no centroid moved further than `tolerance`
    /// (Euclidean distance) in an update step.
    pub tolerance: f32,

    /// Run kmeans `n_init` times with independent initializations and keep the
    /// run with the lowest inertia.
    pub n_init: usize,

    /// Init method.
    pub init: KMeansInit,

    /// Seed of the random generator. Draws from OS entropy if `None`.
    pub seed: Option<u64>,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            max_iters: 300,
            tolerance: 1e-4,
            n_init: 1,
            init: KMeansInit::Random,
            seed: None,
        }
    }
}

impl KMeansParams {
    fn validate(&self, k: usize) -> Result<()> {
        if k == 0 {
            return Err(Error::invalid_parameter("KMeans: k must be positive"));
        }
        if self.max_iters == 0 {
            return Err(Error::invalid_parameter(
                "KMeans: max_iters must be positive",
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::invalid_parameter(format!(
                "KMeans: tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if self.n_init == 0 {
            return Err(Error::invalid_parameter("KMeans: n_init must be positive"));
        }
        if let KMeansInit::Centroids(centroids) = &self.init {
            if centroids.num_rows() != k {
                return Err(Error::invalid_parameter(format!(
                    "KMeans: {} initial centroids were given for k={}",
                    centroids.num_rows(),
                    k
                )));
            }
        }
        Ok(())
    }
}

/// Cluster id and squared distance to that centroid, for each sample.
///
/// Distances are kept in `f64`: squared differences of finite `f32` values may
/// overflow `f32`.
struct KMeansMembership {
    cluster_id_and_distances: Vec<(u32, f64)>,
    k: usize,
}

impl KMeansMembership {
    /// Assign every row of `data` to its closest centroid.
    fn compute(centroids: &Dataset, data: &Dataset) -> Self {
        let dimension = data.dimension();
        let centroid_values = centroids.values();
        let cluster_id_and_distances = data
            .values()
            .par_chunks_exact(dimension)
            .with_min_len(MIN_ROWS_PER_TASK)
            .map(|row| {
                // `k >= 1` and f64 distances of finite data are finite.
                argmin_value_float(l2_distance_batch(row, centroid_values, dimension))
                    .unwrap_or((0, f64::INFINITY))
            })
            .collect();
        Self {
            cluster_id_and_distances,
            k: centroids.num_rows(),
        }
    }

    fn labels(&self) -> Vec<u32> {
        self.cluster_id_and_distances
            .iter()
            .map(|(c, _)| *c)
            .collect()
    }

    /// Inertia: the sum of squared distances to the assigned centroids.
    fn distance_sum(&self) -> f64 {
        self.cluster_id_and_distances.iter().map(|(_, d)| *d).sum()
    }

    /// Histogram of the size of each cluster.
    fn histogram(&self) -> Vec<usize> {
        let mut hist = vec![0; self.k];
        for (cluster_id, _) in self.cluster_id_and_distances.iter() {
            hist[*cluster_id as usize] += 1;
        }
        hist
    }

    /// Compute the centroids of this membership.
    ///
    /// Empty clusters keep the centroid they had in `previous`.
    fn to_centroids(&self, previous: &Dataset, data: &Dataset) -> Dataset {
        let dimension = data.dimension();
        let mut cluster_cnts = vec![0_usize; self.k];
        let mut sums = vec![0.0_f64; self.k * dimension];
        for (vector, (cluster_id, _)) in data.iter().zip(self.cluster_id_and_distances.iter()) {
            let cluster_id = *cluster_id as usize;
            cluster_cnts[cluster_id] += 1;
            for (sum, v) in sums[cluster_id * dimension..(cluster_id + 1) * dimension]
                .iter_mut()
                .zip(vector)
            {
                *sum += *v as f64;
            }
        }

        let mut new_centroids = Vec::with_capacity(self.k * dimension);
        for (i, &cnt) in cluster_cnts.iter().enumerate() {
            if cnt == 0 {
                warn!("KMeans: cluster {} is empty, keeping its previous centroid", i);
                new_centroids.extend_from_slice(previous.row(i));
            } else {
                new_centroids.extend(
                    sums[i * dimension..(i + 1) * dimension]
                        .iter()
                        .map(|s| (s / cnt as f64) as f32),
                );
            }
        }
        Dataset::from_values(new_centroids, dimension)
    }
}

/// Largest Euclidean distance any centroid moved between two iterations.
fn max_centroid_shift(old: &Dataset, new: &Dataset) -> f64 {
    old.iter()
        .zip(new.iter())
        .map(|(a, b)| a.l2(b).sqrt())
        .fold(0.0_f64, f64::max)
}

/// Randomly pick `k` distinct samples as the initial centroids.
fn kmeans_random_init(data: &Dataset, k: usize, rng: &mut impl Rng) -> Dataset {
    let chosen = (0..data.num_rows()).choose_multiple(rng, k);
    let mut builder: Vec<f32> = Vec::with_capacity(k * data.dimension());
    for i in chosen {
        builder.extend_from_slice(data.row(i));
    }
    Dataset::from_values(builder, data.dimension())
}

/// Initialize using kmeans++, and returns the centroids of k clusters.
fn kmeans_plusplus(data: &Dataset, k: usize, rng: &mut impl Rng) -> Result<Dataset> {
    let n = data.num_rows();
    let dimension = data.dimension();

    let first_idx = rng.gen_range(0..n);
    let mut chosen = vec![first_idx];
    let mut builder: Vec<f32> = Vec::with_capacity(k * dimension);
    builder.extend_from_slice(data.row(first_idx));

    // Weights in f64 stay finite for any finite input.
    let mut min_dists: Vec<f64> = data
        .values()
        .par_chunks_exact(dimension)
        .map(|row| row.l2(data.row(first_idx)))
        .collect();

    while chosen.len() < k {
        let next = match WeightedIndex::new(&min_dists) {
            Ok(weights) => weights.sample(rng),
            Err(_) => {
                // Every remaining sample duplicates a chosen centroid.
                (0..n)
                    .filter(|i| !chosen.contains(i))
                    .choose(rng)
                    .ok_or_else(|| {
                        Error::invalid_input(format!(
                            "KMeans: can not pick {k} distinct initial centroids from {n} vectors"
                        ))
                    })?
            }
        };
        chosen.push(next);
        let new_centroid = data.row(next);
        builder.extend_from_slice(new_centroid);
        min_dists
            .par_iter_mut()
            .zip(data.values().par_chunks_exact(dimension))
            .for_each(|(dist, row)| *dist = dist.min(row.l2(new_centroid)));
    }
    debug!("KMeans++ picked initial centroids {:?}", chosen);

    Ok(Dataset::from_values(builder, dimension))
}

/// One complete Lloyd run, from initial centroids to convergence or `max_iters`.
#[derive(Debug, Clone)]
struct LloydRun {
    centroids: Dataset,
    labels: Vec<u32>,
    cluster_sizes: Vec<usize>,
    inertia: f64,
    n_iter: u32,
    converged: bool,
    inertia_history: Vec<f64>,
}

#[instrument(level = "debug", skip_all, fields(run = run))]
fn train_once(data: &Dataset, initial: Dataset, params: &KMeansParams, run: usize) -> LloydRun {
    let mut centroids = initial;
    let mut previous_labels: Option<Vec<u32>> = None;
    let mut inertia_history = Vec::new();
    let mut final_membership = None;
    let mut converged = false;
    let mut n_iter = 0;

    for i in 1..=params.max_iters {
        n_iter = i;
        if i % 10 == 0 {
            info!(
                "KMeans training: iteration {} / {}, run={}",
                i, params.max_iters, run
            );
        }

        let membership = KMeansMembership::compute(&centroids, data);
        inertia_history.push(membership.distance_sum());
        let labels = membership.labels();
        if previous_labels.as_ref() == Some(&labels) {
            info!(
                "KMeans training: assignments stable at iteration {} / {}, run={}",
                i, params.max_iters, run
            );
            converged = true;
            final_membership = Some(membership);
            break;
        }

        let new_centroids = membership.to_centroids(&centroids, data);
        let shift = max_centroid_shift(&centroids, &new_centroids);
        centroids = new_centroids;
        previous_labels = Some(labels);
        if shift <= params.tolerance as f64 {
            info!(
                "KMeans training: converged at iteration {} / {}, run={}, shift={}",
                i, params.max_iters, run, shift
            );
            converged = true;
            break;
        }
    }

    if !converged {
        warn!(
            "KMeans training: reached max_iters={} without converging, run={}",
            params.max_iters, run
        );
    }

    // The reported labels always belong to the final centroids.
    let membership = match final_membership {
        Some(membership) => membership,
        None => {
            let membership = KMeansMembership::compute(&centroids, data);
            inertia_history.push(membership.distance_sum());
            membership
        }
    };

    LloydRun {
        labels: membership.labels(),
        cluster_sizes: membership.histogram(),
        inertia: membership.distance_sum(),
        centroids,
        n_iter,
        converged,
        inertia_history,
    }
}

/// K-means clustering engine with a fit / predict interface.
///
/// ```
/// use lloyd_linalg::{kmeans::{KMeans, KMeansInit, KMeansParams}, Dataset};
///
/// let data = Dataset::try_from_rows(&[[1.0, 2.0], [1.5, 1.8], [8.0, 8.0], [9.0, 11.0]])?;
/// let mut kmeans = KMeans::try_new(
///     2,
///     KMeansParams {
///         init: KMeansInit::KMeansPlusPlus,
///         n_init: 4,
///         seed: Some(123),
///         ..Default::default()
///     },
/// )?;
/// kmeans.fit(&data)?;
/// assert_eq!(kmeans.centroids()?.num_rows(), 2);
/// assert_eq!(kmeans.predict(&data)?, kmeans.labels()?);
/// # Ok::<(), lloyd_linalg::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct KMeans {
    /// The number of clusters.
    k: usize,

    params: KMeansParams,

    /// Result of the last successful fit.
    fitted: Option<LloydRun>,
}

impl KMeans {
    /// Create a [`KMeans`] with `k` clusters and default parameters.
    pub fn new(k: usize) -> Result<Self> {
        Self::try_new(k, KMeansParams::default())
    }

    /// Create a [`KMeans`] with full parameters.
    pub fn try_new(k: usize, params: KMeansParams) -> Result<Self> {
        params.validate(k)?;
        Ok(Self {
            k,
            params,
            fitted: None,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn params(&self) -> &KMeansParams {
        &self.params
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn check_data(&self, data: &Dataset) -> Result<()> {
        let n = data.num_rows();
        if n == 0 {
            return Err(Error::invalid_input("KMeans: dataset is empty"));
        }
        if n < self.k {
            return Err(Error::invalid_input(format!(
                "KMeans: training does not have sufficient data points: \
                 n({}) is smaller than k({})",
                n, self.k
            )));
        }
        if let KMeansInit::Centroids(centroids) = &self.params.init {
            if centroids.dimension() != data.dimension() {
                return Err(Error::invalid_input(format!(
                    "KMeans: initial centroids have dimension {}, data has dimension {}",
                    centroids.dimension(),
                    data.dimension()
                )));
            }
        }
        Ok(())
    }

    fn init_centroids(&self, data: &Dataset, rng: &mut impl Rng) -> Result<Dataset> {
        match &self.params.init {
            KMeansInit::Random => Ok(kmeans_random_init(data, self.k, rng)),
            KMeansInit::KMeansPlusPlus => kmeans_plusplus(data, self.k, rng),
            KMeansInit::Centroids(centroids) => Ok(centroids.clone()),
        }
    }

    /// Train the model on `data`.
    ///
    /// Any previous fit is discarded first; if training fails the model is left
    /// unfitted.
    #[instrument(level = "debug", skip_all, fields(k = self.k, num_rows = data.num_rows()))]
    pub fn fit(&mut self, data: &Dataset) -> Result<()> {
        self.fitted = None;
        self.check_data(data)?;

        let mut rng = match self.params.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let n_runs = match self.params.init {
            KMeansInit::Centroids(_) => {
                if self.params.n_init > 1 {
                    warn!(
                        "KMeans: explicit initial centroids given, ignoring n_init={}",
                        self.params.n_init
                    );
                }
                1
            }
            _ => self.params.n_init,
        };
        // Seeds are drawn up front so the result does not depend on scheduling.
        let seeds = (0..n_runs).map(|_| rng.gen::<u64>()).collect::<Vec<_>>();

        let runs = seeds
            .into_par_iter()
            .enumerate()
            .map(|(run, seed)| {
                let mut rng = SmallRng::seed_from_u64(seed);
                let initial = self.init_centroids(data, &mut rng)?;
                Ok(train_once(data, initial, &self.params, run))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut best: Option<(usize, LloydRun)> = None;
        for (run, result) in runs.into_iter().enumerate() {
            debug!(
                "KMeans run {}: inertia={}, iterations={}, converged={}",
                run, result.inertia, result.n_iter, result.converged
            );
            // Ties keep the earlier run.
            let better = match &best {
                Some((_, b)) => result.inertia < b.inertia,
                None => true,
            };
            if better {
                best = Some((run, result));
            }
        }
        if let Some((run, result)) = best {
            if n_runs > 1 {
                info!(
                    "KMeans: keeping run {} of {} with inertia {}",
                    run, n_runs, result.inertia
                );
            }
            self.fitted = Some(result);
        }
        Ok(())
    }

    /// Train the model on `data` and return the cluster of each sample.
    pub fn fit_predict(&mut self, data: &Dataset) -> Result<Vec<u32>> {
        self.fit(data)?;
        Ok(self.labels()?.to_vec())
    }

    fn fitted(&self) -> Result<&LloydRun> {
        self.fitted
            .as_ref()
            .ok_or_else(|| Error::not_fitted("call fit() before using the model"))
    }

    fn check_dimension(&self, data: &Dataset) -> Result<&Dataset> {
        let centroids = &self.fitted()?.centroids;
        if centroids.dimension() != data.dimension() {
            return Err(Error::invalid_input(format!(
                "KMeans: model has dimension {}, data has dimension {}",
                centroids.dimension(),
                data.dimension()
            )));
        }
        Ok(centroids)
    }

    /// Assign each sample of `data` to its nearest centroid.
    pub fn predict(&self, data: &Dataset) -> Result<Vec<u32>> {
        let centroids = self.check_dimension(data)?;
        Ok(compute_partitions(
            centroids.values(),
            data.values(),
            data.dimension(),
        ))
    }

    /// Sum of squared distances from each sample of `data` to its nearest
    /// centroid.
    pub fn inertia_of(&self, data: &Dataset) -> Result<f64> {
        let centroids = self.check_dimension(data)?;
        Ok(KMeansMembership::compute(centroids, data).distance_sum())
    }

    /// Euclidean distance from each sample to each centroid.
    ///
    /// Returns `N * k` values, row-major: the distances of sample `i` are
    /// `[i * k..(i + 1) * k]`.
    pub fn transform(&self, data: &Dataset) -> Result<Vec<f64>> {
        let centroids = self.check_dimension(data)?;
        Ok(data
            .values()
            .par_chunks_exact(data.dimension())
            .with_min_len(MIN_ROWS_PER_TASK)
            .flat_map_iter(|row| {
                l2_distance_batch(row, centroids.values(), data.dimension()).map(f64::sqrt)
            })
            .collect())
    }

    /// Centroids of each of the k clusters.
    pub fn centroids(&self) -> Result<&Dataset> {
        Ok(&self.fitted()?.centroids)
    }

    /// Centroids as a `FixedSizeList<Float32>` array of length k.
    pub fn centroids_array(&self) -> Result<arrow_array::FixedSizeListArray> {
        self.fitted()?.centroids.to_fixed_size_list()
    }

    /// Cluster of each training sample.
    pub fn labels(&self) -> Result<&[u32]> {
        Ok(&self.fitted()?.labels)
    }

    /// Sum of squared distances of the training samples to their centroids.
    pub fn inertia(&self) -> Result<f64> {
        Ok(self.fitted()?.inertia)
    }

    /// Number of Lloyd iterations of the retained run.
    pub fn n_iter(&self) -> Result<u32> {
        Ok(self.fitted()?.n_iter)
    }

    /// Whether the retained run converged before `max_iters`.
    pub fn converged(&self) -> Result<bool> {
        Ok(self.fitted()?.converged)
    }

    /// Inertia after each assignment step of the retained run.
    ///
    /// The sequence is non-increasing and its last value is [`Self::inertia`].
    pub fn inertia_history(&self) -> Result<&[f64]> {
        Ok(&self.fitted()?.inertia_history)
    }

    /// Number of training samples in each cluster.
    pub fn cluster_sizes(&self) -> Result<&[usize]> {
        Ok(&self.fitted()?.cluster_sizes)
    }
}

/// Compute the nearest centroid of each vector in `data`.
///
/// Both `centroids` and `data` are flattened row-major with `dimension` values
/// per vector. Ties go to the lowest centroid index.
pub fn compute_partitions(centroids: &[f32], data: &[f32], dimension: usize) -> Vec<u32> {
    data.par_chunks_exact(dimension)
        .with_min_len(MIN_ROWS_PER_TASK)
        .map(|row| argmin_float(l2_distance_batch(row, centroids, dimension)).unwrap_or(0))
        .collect()
}

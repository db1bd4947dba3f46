//! K-means clustering of scalar index values
//!
//! Unsupervised classification by iteratively partitioning sampled values
//! into k clusters, then labelling every pixel of an index raster with its
//! nearest centroid.
//!
//! A [`KMeans`] starts untrained. [`KMeans::fit`] trains it exactly once and
//! freezes a [`ClusterModel`]; [`KMeans::assign`] needs that model.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::maybe_rayon::*;
use vegscan_core::raster::Raster;
use vegscan_core::{Error, Result};

/// Label written for no-data pixels
pub const NODATA_LABEL: i32 = -1;

/// Samples per work item in the assignment step
const SAMPLE_BLOCK: usize = 4096;

/// Parameters for K-means clustering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KMeansParams {
    /// Number of clusters (default: 4)
    pub k: usize,
    /// Maximum iterations (default: 100)
    pub max_iterations: usize,
    /// Seed for centroid initialization and empty-cluster re-seeding
    pub seed: Option<u64>,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            k: 4,
            max_iterations: 100,
            seed: None,
        }
    }
}

/// Trained centroids, sorted ascending so cluster 0 has the lowest value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterModel {
    centroids: Vec<f64>,
    iterations: usize,
    converged: bool,
}

impl ClusterModel {
    pub fn centroids(&self) -> &[f64] {
        &self.centroids
    }

    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Iterations run before stopping
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// False when fitting stopped at the iteration cap
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Id of the nearest centroid; ties go to the lowest id.
    pub fn nearest(&self, value: f64) -> usize {
        nearest(&self.centroids, value)
    }
}

/// K-means clusterer with an untrained/trained lifecycle
#[derive(Debug, Clone)]
pub struct KMeans {
    params: KMeansParams,
    model: Option<ClusterModel>,
}

impl KMeans {
    pub fn new(params: KMeansParams) -> Result<Self> {
        if params.k == 0 {
            return Err(Error::InvalidParameter {
                name: "k",
                value: "0".into(),
                reason: "at least one cluster is required".into(),
            });
        }
        if params.max_iterations == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iterations",
                value: "0".into(),
                reason: "at least one iteration is required".into(),
            });
        }
        Ok(Self {
            params,
            model: None,
        })
    }

    pub fn params(&self) -> &KMeansParams {
        &self.params
    }

    pub fn model(&self) -> Option<&ClusterModel> {
        self.model.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    /// Fit centroids to `samples`. Non-finite values are ignored.
    ///
    /// # Errors
    /// `ModelAlreadyTrained` on a second call; `InsufficientData` when there
    /// are fewer than k samples. With fewer than k distinct values the model
    /// gets one centroid per distinct value, see [`ClusterModel::k`].
    pub fn fit(&mut self, samples: &[f64]) -> Result<&ClusterModel> {
        if self.model.is_some() {
            return Err(Error::ModelAlreadyTrained);
        }
        let k = self.params.k;

        let values: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
        if values.len() < k {
            return Err(Error::InsufficientData {
                available: values.len(),
                required: k,
                context: "k-means needs at least k samples",
            });
        }

        let mut distinct = values.clone();
        distinct.sort_unstable_by(f64::total_cmp);
        distinct.dedup();
        let k = if distinct.len() < k {
            warn!(
                requested = k,
                distinct = distinct.len(),
                "fewer distinct sample values than clusters; reducing k"
            );
            distinct.len()
        } else {
            k
        };

        let seed = self.params.seed.unwrap_or_else(rand::random);
        if self.params.seed.is_none() {
            info!(seed, "k-means with a generated seed");
        }
        let mut rng = StdRng::seed_from_u64(seed);

        let mut centroids: Vec<f64> = rand::seq::index::sample(&mut rng, distinct.len(), k)
            .into_iter()
            .map(|i| distinct[i])
            .collect();

        let mut labels = vec![usize::MAX; values.len()];
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.params.max_iterations {
            iterations += 1;

            let step = assignment_step(&values, &labels, &centroids);
            labels = step.labels;

            let mut reseeded = 0;
            for (id, centroid) in centroids.clone().iter().enumerate() {
                if step.counts[id] > 0 {
                    centroids[id] = step.sums[id] / step.counts[id] as f64;
                } else if let Some(v) = reseed(&distinct, &centroids, &mut rng) {
                    debug!(cluster = id, old = centroid, new = v, "re-seeded empty cluster");
                    centroids[id] = v;
                    reseeded += 1;
                }
            }

            if step.changed == 0 && reseeded == 0 {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                iterations,
                "k-means stopped at the iteration cap without converging"
            );
        }

        centroids.sort_unstable_by(f64::total_cmp);
        info!(k, iterations, converged, centroids = ?centroids, "k-means fitted");

        Ok(&*self.model.insert(ClusterModel {
            centroids,
            iterations,
            converged,
        }))
    }

    /// Label every pixel of `index` with its nearest centroid.
    ///
    /// No-data pixels get [`NODATA_LABEL`]. The result shares the input's
    /// georeferencing.
    pub fn assign(&self, index: &Raster<f64>) -> Result<Raster<i32>> {
        let model = self.model.as_ref().ok_or(Error::ModelNotTrained)?;
        let (rows, cols) = index.shape();
        let input = index.data();

        let data: Vec<i32> = (0..rows)
            .into_par_iter()
            .flat_map(|row| {
                let mut row_data = vec![NODATA_LABEL; cols];
                for (col, out) in row_data.iter_mut().enumerate() {
                    let v = input[(row, col)];
                    if !index.is_nodata(v) && v.is_finite() {
                        *out = model.nearest(v) as i32;
                    }
                }
                row_data
            })
            .collect();

        index.derive(data, Some(NODATA_LABEL))
    }
}

fn nearest(centroids: &[f64], value: f64) -> usize {
    let mut best_dist = f64::INFINITY;
    let mut best_k = 0;
    for (k, &centroid) in centroids.iter().enumerate() {
        let dist = (value - centroid).abs();
        if dist < best_dist {
            best_dist = dist;
            best_k = k;
        }
    }
    best_k
}

struct Step {
    labels: Vec<usize>,
    sums: Vec<f64>,
    counts: Vec<usize>,
    changed: usize,
}

/// One assignment pass. Blocks are labelled in parallel, each producing
/// partial sums and counts that are merged afterwards.
fn assignment_step(values: &[f64], previous: &[usize], centroids: &[f64]) -> Step {
    let k = centroids.len();
    let partials: Vec<Step> = crate::maybe_rayon::blocks(values.len(), SAMPLE_BLOCK)
        .into_par_iter()
        .map(|(start, end)| {
            let mut part = Step {
                labels: Vec::with_capacity(end - start),
                sums: vec![0.0; k],
                counts: vec![0; k],
                changed: 0,
            };
            for i in start..end {
                let id = nearest(centroids, values[i]);
                part.sums[id] += values[i];
                part.counts[id] += 1;
                if previous[i] != id {
                    part.changed += 1;
                }
                part.labels.push(id);
            }
            part
        })
        .collect();

    let mut merged = Step {
        labels: Vec::with_capacity(values.len()),
        sums: vec![0.0; k],
        counts: vec![0; k],
        changed: 0,
    };
    for part in partials {
        merged.labels.extend(part.labels);
        for id in 0..k {
            merged.sums[id] += part.sums[id];
            merged.counts[id] += part.counts[id];
        }
        merged.changed += part.changed;
    }
    merged
}

/// A random sample value not currently used as a centroid.
fn reseed(distinct: &[f64], centroids: &[f64], rng: &mut StdRng) -> Option<f64> {
    let unused: Vec<f64> = distinct
        .iter()
        .copied()
        .filter(|v| !centroids.contains(v))
        .collect();
    if unused.is_empty() {
        return None;
    }
    Some(unused[rng.gen_range(0..unused.len())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use vegscan_core::GeoTransform;

    fn trained(k: usize, samples: &[f64]) -> KMeans {
        let mut km = KMeans::new(KMeansParams {
            k,
            seed: Some(11),
            ..Default::default()
        })
        .unwrap();
        km.fit(samples).unwrap();
        km
    }

    #[test]
    fn test_kmeans_two_groups() {
        let mut samples = vec![10.0; 50];
        samples.extend(vec![100.0; 50]);
        let km = trained(2, &samples);
        let model = km.model().unwrap();

        assert_eq!(model.centroids(), &[10.0, 100.0]);
        assert!(model.converged());
        assert_eq!(model.nearest(12.0), 0);
        assert_eq!(model.nearest(90.0), 1);
    }

    #[test]
    fn test_k_one_converges_to_mean() {
        let samples = [0.1, 0.4, -0.2, 0.9, 0.3, 0.5];
        let km = trained(1, &samples);
        let model = km.model().unwrap();

        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!(model.converged());
        assert_relative_eq!(model.centroids()[0], mean, epsilon = 1e-12);
    }

    #[test]
    fn test_too_few_samples() {
        let mut km = KMeans::new(KMeansParams {
            k: 3,
            seed: Some(1),
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(
            km.fit(&[0.1, 0.2]),
            Err(Error::InsufficientData { available: 2, required: 3, .. })
        ));
        assert!(!km.is_trained());
    }

    #[test]
    fn test_few_distinct_values_reduce_k() {
        let mut km = KMeans::new(KMeansParams {
            k: 4,
            seed: Some(1),
            ..Default::default()
        })
        .unwrap();
        let model = km.fit(&[0.1, 0.1, 0.5, 0.5, 0.8, 0.8, 0.8, 0.8]).unwrap();

        assert_eq!(model.k(), 3);
        for (got, want) in model.centroids().iter().zip([0.1, 0.5, 0.8]) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
        assert!(model.converged());
        assert_eq!(km.params().k, 4);

        let r = Raster::from_vec(vec![0.12, 0.49, 0.79, f64::NAN], 2, 2).unwrap();
        let labels = km.assign(&r).unwrap();
        assert_eq!(labels.data().iter().copied().collect::<Vec<_>>(), vec![0, 1, 2, -1]);
    }

    #[test]
    fn test_assign_before_fit() {
        let km = KMeans::new(KMeansParams::default()).unwrap();
        let r = Raster::filled(2, 2, 0.3);
        assert!(matches!(km.assign(&r), Err(Error::ModelNotTrained)));
    }

    #[test]
    fn test_fit_is_one_shot() {
        let mut km = trained(2, &[0.0, 1.0, 2.0]);
        assert!(matches!(km.fit(&[5.0, 6.0]), Err(Error::ModelAlreadyTrained)));
    }

    #[test]
    fn test_zero_k_rejected() {
        assert!(KMeans::new(KMeansParams {
            k: 0,
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_assign_labels_and_nodata() {
        let km = trained(2, &[0.1, 0.15, 0.8, 0.85]);
        let mut r = Raster::from_vec(vec![0.12, f64::NAN, 0.9, 0.5], 2, 2).unwrap();
        r.set_transform(GeoTransform::new(500.0, 20.0, 10.0, -10.0));

        let labels = km.assign(&r).unwrap();
        assert_eq!(labels.get(0, 0).unwrap(), 0);
        assert_eq!(labels.get(0, 1).unwrap(), NODATA_LABEL);
        assert_eq!(labels.get(1, 0).unwrap(), 1);
        assert_eq!(labels.nodata(), Some(NODATA_LABEL));
        assert_eq!(labels.transform(), r.transform());

        let again = km.assign(&r).unwrap();
        assert_eq!(labels.data(), again.data());
    }

    #[test]
    fn test_ties_go_to_lowest_id() {
        assert_eq!(nearest(&[0.0, 1.0], 0.5), 0);
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let samples: Vec<f64> = (0..200).map(|i| ((i * 37) % 101) as f64 / 100.0).collect();
        let a = trained(3, &samples);
        let b = trained(3, &samples);
        assert_eq!(a.model(), b.model());
    }
}

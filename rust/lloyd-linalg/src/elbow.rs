// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The Lloyd Authors

//! Elbow method: inertia as a function of the number of clusters.

use log::info;

use crate::kmeans::{KMeans, KMeansInit, KMeansParams};
use crate::matrix::Dataset;
use crate::{Error, Result};

/// Outcome of fitting one `k` in an elbow sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElbowPoint {
    pub k: usize,
    pub inertia: f64,
    pub n_iter: u32,
    pub converged: bool,
}

/// Fit a fresh [`KMeans`] for every `k` in `ks` and collect the inertia of each.
///
/// Every fit uses the same `params` (including the seed). Points are returned in
/// the order of `ks`. Explicit initial centroids can not be used, since they fix
/// a single `k`.
pub fn inertia_curve(
    data: &Dataset,
    ks: impl IntoIterator<Item = usize>,
    params: &KMeansParams,
) -> Result<Vec<ElbowPoint>> {
    if matches!(params.init, KMeansInit::Centroids(_)) {
        return Err(Error::invalid_parameter(
            "Elbow: a sweep over k needs a sampling init, not explicit centroids",
        ));
    }
    let ks = ks.into_iter().collect::<Vec<_>>();
    if ks.is_empty() {
        return Err(Error::invalid_parameter("Elbow: no k to evaluate"));
    }

    ks.into_iter()
        .map(|k| {
            let mut kmeans = KMeans::try_new(k, params.clone())?;
            kmeans.fit(data)?;
            let point = ElbowPoint {
                k,
                inertia: kmeans.inertia()?,
                n_iter: kmeans.n_iter()?,
                converged: kmeans.converged()?,
            };
            info!("Elbow: k={} inertia={}", k, point.inertia);
            Ok(point)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use lloyd_testing::datagen::generate_blobs;

    fn params() -> KMeansParams {
        KMeansParams {
            init: KMeansInit::KMeansPlusPlus,
            n_init: 4,
            seed: Some(768797),
            ..Default::default()
        }
    }

    #[test]
    fn test_inertia_curve_bends_at_true_k() {
        let blobs = generate_blobs(
            &[vec![0.0, 0.0], vec![30.0, 0.0], vec![0.0, 30.0], vec![30.0, 30.0]],
            25,
            1.0,
            7,
        );
        let data = Dataset::try_new(blobs.values, blobs.dimension).unwrap();
        let curve = inertia_curve(&data, 1..=6, &params()).unwrap();

        assert_eq!(curve.iter().map(|p| p.k).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
        assert!(curve.iter().all(|p| p.converged));
        // The drop up to the true k dwarfs the drop after it.
        let drop_to_4 = curve[0].inertia - curve[3].inertia;
        let drop_after_4 = curve[3].inertia - curve[5].inertia;
        assert!(drop_to_4 > 20.0 * drop_after_4);
    }

    #[test]
    fn test_inertia_curve_errors() {
        let data = Dataset::try_from_rows(&[[0.0], [1.0], [2.0]]).unwrap();
        assert!(matches!(
            inertia_curve(&data, 1..1, &params()),
            Err(Error::InvalidParameter { .. })
        ));
        // k larger than the number of samples fails the fit.
        assert!(matches!(
            inertia_curve(&data, 1..=4, &params()),
            Err(Error::InvalidInput { .. })
        ));
        let init = KMeansParams {
            init: KMeansInit::Centroids(data.clone()),
            ..Default::default()
        };
        assert!(matches!(
            inertia_curve(&data, [3], &init),
            Err(Error::InvalidParameter { .. })
        ));
    }
}

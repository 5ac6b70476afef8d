//! Palette quantization: k-means++ initialization and k-means refinement in
//! CIELAB.
//!
//! Clustering runs on an (optionally) strided sample of the pixels; the final
//! assignment and member counts always cover every input pixel. Centroids are
//! LAB means, never RGB averages.

use crate::color_space::LabColor;
use crate::error::QuantizeError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct QuantizeOptions {
    /// Hard cap on refinement iterations
    pub max_iterations: usize,
    /// Stop once total centroid movement (ΔE) drops below this
    pub convergence_threshold: f64,
    /// Fixed seed for reproducible runs; fresh entropy when `None`
    pub seed: Option<u64>,
    /// Maximum number of pixels used to train centroids
    pub sample_limit: Option<usize>,
}

impl Default for QuantizeOptions {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            convergence_threshold: 0.1,
            seed: None,
            sample_limit: Some(50_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteCluster {
    pub centroid: LabColor,
    pub member_count: usize,
}

/// Result of [`quantize`]: exactly `k` clusters plus, for every input pixel,
/// the index of its cluster.
#[derive(Debug, Clone)]
pub struct Quantization {
    pub clusters: Vec<PaletteCluster>,
    pub assignments: Vec<usize>,
    pub iterations: usize,
}

/// Stride `pixels` down to at most `limit` samples.
pub fn sample_pixels(pixels: &[LabColor], limit: Option<usize>) -> Vec<LabColor> {
    let step = match limit {
        Some(limit) if limit > 0 => pixels.len().div_ceil(limit).max(1),
        _ => 1,
    };
    pixels.iter().step_by(step).copied().collect()
}

/// Index of the nearest centroid; ties go to the lower index.
#[inline]
pub fn nearest_centroid(pixel: &LabColor, centroids: &[LabColor]) -> usize {
    let mut best_idx = 0usize;
    let mut best_dist = f64::INFINITY;
    for (idx, c) in centroids.iter().enumerate() {
        let d = pixel.distance_sq(c);
        if d < best_dist {
            best_dist = d;
            best_idx = idx;
        }
    }
    best_idx
}

fn assign(pixels: &[LabColor], centroids: &[LabColor]) -> Vec<usize> {
    pixels
        .par_iter()
        .map(|p| nearest_centroid(p, centroids))
        .collect()
}

/// K-means++ initialization: choose centroids with probability proportional
/// to squared distance from the nearest existing centroid. Always returns
/// `k` centroids; when every sample is already covered, picks uniformly.
fn kmeans_plusplus_init(samples: &[LabColor], k: usize, rng: &mut StdRng) -> Vec<LabColor> {
    let n = samples.len();
    if n == 0 || k == 0 {
        return Vec::new();
    }

    let mut centroids = Vec::with_capacity(k);
    centroids.push(samples[rng.gen_range(0..n)]);

    let mut distances = vec![f64::INFINITY; n];

    while centroids.len() < k {
        let newest = centroids[centroids.len() - 1];
        let mut total_dist = 0.0f64;
        for (i, sample) in samples.iter().enumerate() {
            let d = sample.distance_sq(&newest);
            if d < distances[i] {
                distances[i] = d;
            }
            total_dist += distances[i];
        }

        if total_dist <= 0.0 {
            centroids.push(samples[rng.gen_range(0..n)]);
            continue;
        }

        let mut rand_val = rng.r#gen::<f64>() * total_dist;
        let mut chosen = None;
        for (i, &dist) in distances.iter().enumerate() {
            rand_val -= dist;
            if rand_val <= 0.0 && dist > 0.0 {
                chosen = Some(i);
                break;
            }
        }
        // Float drift can leave rand_val marginally positive
        let idx = chosen.unwrap_or_else(|| farthest_index(&distances));
        centroids.push(samples[idx]);
    }

    centroids
}

/// Index of the largest value; ties go to the lower index.
fn farthest_index(distances: &[f64]) -> usize {
    let mut best = 0usize;
    for (i, &d) in distances.iter().enumerate() {
        if d > distances[best] {
            best = i;
        }
    }
    best
}

/// Sample farthest from every centroid in `anchors`.
fn farthest_sample(samples: &[LabColor], anchors: &[LabColor]) -> LabColor {
    let distances: Vec<f64> = samples
        .par_iter()
        .map(|s| {
            anchors
                .iter()
                .map(|a| s.distance_sq(a))
                .fold(f64::INFINITY, f64::min)
        })
        .collect();
    samples[farthest_index(&distances)]
}

/// Reduce `pixels` to `k` representative LAB colours.
///
/// Returns exactly `k` clusters whose member counts sum to `pixels.len()`.
/// Terminates after at most `options.max_iterations` refinement passes.
pub fn quantize(
    pixels: &[LabColor],
    k: usize,
    options: &QuantizeOptions,
) -> Result<Quantization, QuantizeError> {
    if pixels.is_empty() {
        return Err(QuantizeError::EmptyInput);
    }
    if k == 0 {
        return Err(QuantizeError::ZeroClusters);
    }

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let samples = sample_pixels(pixels, options.sample_limit);
    let mut centroids = kmeans_plusplus_init(&samples, k, &mut rng);

    let mut iterations = 0;
    while iterations < options.max_iterations {
        iterations += 1;
        let labels = assign(&samples, &centroids);

        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for (s, &label) in samples.iter().zip(labels.iter()) {
            sums[label][0] += s.l;
            sums[label][1] += s.a;
            sums[label][2] += s.b;
            counts[label] += 1;
        }

        let mut movement = 0.0f64;
        let mut next = centroids.clone();
        for j in 0..k {
            if counts[j] == 0 {
                continue;
            }
            let n = counts[j] as f64;
            let c = LabColor::new(sums[j][0] / n, sums[j][1] / n, sums[j][2] / n);
            movement += centroids[j].delta_e(&c);
            next[j] = c;
        }

        // Re-seed starving clusters at the sample farthest from the live ones
        let mut anchors: Vec<LabColor> = (0..k).filter(|&j| counts[j] > 0).map(|j| next[j]).collect();
        for j in (0..k).filter(|&j| counts[j] == 0) {
            let seed_point = farthest_sample(&samples, &anchors);
            log::debug!("Re-seeding empty cluster {} at iteration {}", j, iterations);
            movement += centroids[j].delta_e(&seed_point);
            next[j] = seed_point;
            anchors.push(seed_point);
        }

        centroids = next;
        if movement < options.convergence_threshold {
            break;
        }
    }

    log::debug!(
        "K-means converged after {} iterations ({} samples, k={})",
        iterations,
        samples.len(),
        k
    );

    let assignments = assign(pixels, &centroids);
    let mut member_counts = vec![0usize; k];
    for &a in &assignments {
        member_counts[a] += 1;
    }

    let clusters = centroids
        .into_iter()
        .zip(member_counts)
        .map(|(centroid, member_count)| PaletteCluster {
            centroid,
            member_count,
        })
        .collect();

    Ok(Quantization {
        clusters,
        assignments,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_space::{rgb_to_lab, RgbColor};

    fn seeded(seed: u64) -> QuantizeOptions {
        QuantizeOptions {
            seed: Some(seed),
            ..Default::default()
        }
    }

    fn gradient(n: usize) -> Vec<LabColor> {
        (0..n)
            .map(|i| rgb_to_lab(RgbColor::new((i * 7 % 256) as u8, (i * 3 % 256) as u8, 90)))
            .collect()
    }

    #[test]
    fn test_quantize_returns_exactly_k_clusters() {
        let pixels = gradient(500);
        for k in [1, 2, 5, 16] {
            let q = quantize(&pixels, k, &seeded(7)).unwrap();
            assert_eq!(q.clusters.len(), k);
            let total: usize = q.clusters.iter().map(|c| c.member_count).sum();
            assert_eq!(total, pixels.len());
            assert_eq!(q.assignments.len(), pixels.len());
            assert!(q.assignments.iter().all(|&a| a < k));
        }
    }

    #[test]
    fn test_k_larger_than_pixel_count() {
        let pixels = vec![
            rgb_to_lab(RgbColor::new(255, 0, 0)),
            rgb_to_lab(RgbColor::new(0, 0, 255)),
        ];
        let q = quantize(&pixels, 6, &seeded(1)).unwrap();
        assert_eq!(q.clusters.len(), 6);
        let total: usize = q.clusters.iter().map(|c| c.member_count).sum();
        assert_eq!(total, 2);
        assert_ne!(q.assignments[0], q.assignments[1]);
    }

    #[test]
    fn test_uniform_pixels_single_populated_cluster() {
        let lab = rgb_to_lab(RgbColor::new(128, 128, 128));
        let pixels = vec![lab; 64];
        let q = quantize(&pixels, 3, &seeded(3)).unwrap();
        assert_eq!(q.clusters.len(), 3);
        let populated: Vec<_> = q.clusters.iter().filter(|c| c.member_count > 0).collect();
        assert_eq!(populated.len(), 1);
        assert_eq!(populated[0].member_count, 64);
        assert!(populated[0].centroid.delta_e(&lab) < 1e-9);
    }

    #[test]
    fn test_two_groups_separate_cleanly() {
        let red = rgb_to_lab(RgbColor::new(250, 10, 10));
        let blue = rgb_to_lab(RgbColor::new(10, 10, 250));
        let mut pixels = vec![red; 40];
        pixels.extend(vec![blue; 60]);
        let q = quantize(&pixels, 2, &seeded(11)).unwrap();
        let red_cluster = q.assignments[0];
        let blue_cluster = q.assignments[99];
        assert_ne!(red_cluster, blue_cluster);
        assert_eq!(q.clusters[red_cluster].member_count, 40);
        assert_eq!(q.clusters[blue_cluster].member_count, 60);
        assert!(q.clusters[red_cluster].centroid.delta_e(&red) < 1e-6);
    }

    #[test]
    fn test_centroids_are_lab_means() {
        let a = LabColor::new(40.0, 10.0, 10.0);
        let b = LabColor::new(42.0, 12.0, 8.0);
        let far = LabColor::new(95.0, -40.0, 60.0);
        let pixels = vec![a, b, far];
        let q = quantize(&pixels, 2, &seeded(5)).unwrap();
        let c = &q.clusters[q.assignments[0]];
        assert_eq!(c.member_count, 2);
        assert!(c.centroid.delta_e(&LabColor::new(41.0, 11.0, 9.0)) < 1e-9);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let pixels = gradient(300);
        let q1 = quantize(&pixels, 6, &seeded(42)).unwrap();
        let q2 = quantize(&pixels, 6, &seeded(42)).unwrap();
        assert_eq!(q1.clusters, q2.clusters);
        assert_eq!(q1.assignments, q2.assignments);
    }

    #[test]
    fn test_iteration_cap_respected() {
        let pixels = gradient(400);
        let options = QuantizeOptions {
            max_iterations: 2,
            convergence_threshold: 0.0,
            seed: Some(9),
            sample_limit: None,
        };
        let q = quantize(&pixels, 8, &options).unwrap();
        assert!(q.iterations <= 2);
        assert_eq!(q.clusters.len(), 8);
    }

    #[test]
    fn test_sampling_still_assigns_every_pixel() {
        let pixels = gradient(1000);
        let options = QuantizeOptions {
            sample_limit: Some(50),
            seed: Some(2),
            ..Default::default()
        };
        let q = quantize(&pixels, 4, &options).unwrap();
        let total: usize = q.clusters.iter().map(|c| c.member_count).sum();
        assert_eq!(total, 1000);
        assert_eq!(q.assignments.len(), 1000);
    }

    #[test]
    fn test_sample_pixels_limit() {
        let pixels = gradient(1000);
        assert_eq!(sample_pixels(&pixels, Some(100)).len(), 100);
        assert_eq!(sample_pixels(&pixels, Some(300)).len(), 250);
        assert_eq!(sample_pixels(&pixels, None).len(), 1000);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            quantize(&[], 3, &QuantizeOptions::default()).unwrap_err(),
            QuantizeError::EmptyInput
        );
        let pixels = gradient(10);
        assert_eq!(
            quantize(&pixels, 0, &QuantizeOptions::default()).unwrap_err(),
            QuantizeError::ZeroClusters
        );
    }

    #[test]
    fn test_kmeans_plusplus_init_returns_k_centroids() {
        let mut rng = StdRng::seed_from_u64(1);
        let samples = gradient(100);
        assert_eq!(kmeans_plusplus_init(&samples, 8, &mut rng).len(), 8);
        assert!(kmeans_plusplus_init(&[], 5, &mut rng).is_empty());
    }
}

//! Gaussian mixture colour model used by GrabCut.

/// Number of Gaussian components per model.
pub const COMPONENTS: usize = 5;

/// Variance added to the diagonal of a singular covariance matrix.
const DIAGONAL_REGULARIZATION: f64 = 0.01;

const KMEANS_ITERATIONS: usize = 10;

pub type Color = [f64; 3];
type Mat3 = [[f64; 3]; 3];

#[derive(Debug, Clone, Copy, Default)]
struct Component {
    weight: f64,
    mean: Color,
    inverse_covariance: Mat3,
    /// 1 / sqrt(det(covariance))
    norm: f64,
}

impl Component {
    fn density(&self, color: &Color) -> f64 {
        if self.weight <= 0.0 {
            return 0.0;
        }
        let d = [
            color[0] - self.mean[0],
            color[1] - self.mean[1],
            color[2] - self.mean[2],
        ];
        let inv = &self.inverse_covariance;
        let mut mahalanobis = 0.0;
        for (i, row) in inv.iter().enumerate() {
            mahalanobis += d[i] * (row[0] * d[0] + row[1] * d[1] + row[2] * d[2]);
        }
        self.norm * (-0.5 * mahalanobis).exp()
    }
}

/// Running sums for one component while learning.
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    count: usize,
    sum: Color,
    prod: Mat3,
}

impl Accumulator {
    fn add(&mut self, c: &Color) {
        self.count += 1;
        for i in 0..3 {
            self.sum[i] += c[i];
            for j in 0..3 {
                self.prod[i][j] += c[i] * c[j];
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Gmm {
    components: [Component; COMPONENTS],
}

fn determinant(m: &Mat3) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn inverse(m: &Mat3, det: f64) -> Mat3 {
    let inv_det = 1.0 / det;
    [
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
        ],
    ]
}

fn squared_distance(a: &Color, b: &Color) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

impl Gmm {
    /// Fit a model to `samples` from a deterministic k-means clustering.
    /// Returns `None` when there are fewer samples than components.
    pub fn fit(samples: &[Color]) -> Option<Self> {
        if samples.len() < COMPONENTS {
            return None;
        }
        let labels = kmeans(samples, COMPONENTS);
        let mut gmm = Self {
            components: [Component::default(); COMPONENTS],
        };
        gmm.learn(samples.iter().zip(labels.iter().copied()));
        Some(gmm)
    }

    /// Weighted mixture density at `color`.
    pub fn density(&self, color: &Color) -> f64 {
        self.components.iter().map(|c| c.weight * c.density(color)).sum()
    }

    /// Index of the component most likely to have produced `color`.
    pub fn most_likely_component(&self, color: &Color) -> usize {
        let mut best = 0;
        let mut best_p = f64::NEG_INFINITY;
        for (k, comp) in self.components.iter().enumerate() {
            let p = comp.density(color);
            if p > best_p {
                best_p = p;
                best = k;
            }
        }
        best
    }

    /// Re-estimate weights, means and covariances from labelled samples.
    pub fn learn<'a>(&mut self, labelled: impl Iterator<Item = (&'a Color, usize)>) {
        let mut acc = [Accumulator::default(); COMPONENTS];
        let mut total = 0usize;
        for (color, k) in labelled {
            acc[k.min(COMPONENTS - 1)].add(color);
            total += 1;
        }

        for (comp, a) in self.components.iter_mut().zip(acc.iter()) {
            if a.count == 0 || total == 0 {
                *comp = Component::default();
                continue;
            }
            let n = a.count as f64;
            let mean = [a.sum[0] / n, a.sum[1] / n, a.sum[2] / n];
            let mut cov = [[0.0; 3]; 3];
            for i in 0..3 {
                for j in 0..3 {
                    cov[i][j] = a.prod[i][j] / n - mean[i] * mean[j];
                }
            }
            let mut det = determinant(&cov);
            if det <= f64::EPSILON {
                for (i, row) in cov.iter_mut().enumerate() {
                    row[i] += DIAGONAL_REGULARIZATION;
                }
                det = determinant(&cov);
            }
            *comp = Component {
                weight: n / total as f64,
                mean,
                inverse_covariance: inverse(&cov, det),
                norm: 1.0 / det.sqrt(),
            };
        }
    }
}

/// Deterministic k-means: farthest-point seeding, then Lloyd iterations.
/// Duplicate seeds simply leave components empty.
fn kmeans(samples: &[Color], k: usize) -> Vec<usize> {
    let mut centers: Vec<Color> = Vec::with_capacity(k);
    centers.push(samples[0]);
    let mut nearest: Vec<f64> = samples
        .iter()
        .map(|s| squared_distance(s, &samples[0]))
        .collect();
    while centers.len() < k {
        let (idx, _) = nearest
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, &d)| {
                if d > best.1 { (i, d) } else { best }
            });
        let c = samples[idx];
        centers.push(c);
        for (d, s) in nearest.iter_mut().zip(samples.iter()) {
            *d = d.min(squared_distance(s, &c));
        }
    }

    let mut labels = vec![0usize; samples.len()];
    for _ in 0..KMEANS_ITERATIONS {
        let mut changed = false;
        for (label, s) in labels.iter_mut().zip(samples.iter()) {
            let mut best = 0;
            let mut best_d = f64::INFINITY;
            for (j, c) in centers.iter().enumerate() {
                let d = squared_distance(s, c);
                if d < best_d {
                    best_d = d;
                    best = j;
                }
            }
            if *label != best {
                *label = best;
                changed = true;
            }
        }

        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for (s, &l) in samples.iter().zip(labels.iter()) {
            counts[l] += 1;
            for i in 0..3 {
                sums[l][i] += s[i];
            }
        }
        for j in 0..k {
            if counts[j] > 0 {
                let n = counts[j] as f64;
                centers[j] = [sums[j][0] / n, sums[j][1] / n, sums[j][2] / n];
            }
        }
        if !changed {
            break;
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_few_samples() {
        let samples = vec![[0.0, 0.0, 0.0]; COMPONENTS - 1];
        assert!(Gmm::fit(&samples).is_none());
    }

    #[test]
    fn test_uniform_samples_are_regularized() {
        let samples = vec![[200.0, 40.0, 40.0]; 50];
        let gmm = Gmm::fit(&samples).unwrap();
        let p = gmm.density(&[200.0, 40.0, 40.0]);
        assert!(p.is_finite() && p > 0.0);
        assert!(gmm.density(&[0.0, 0.0, 0.0]) < p);
    }

    #[test]
    fn test_two_clusters_are_separated() {
        let mut samples = vec![[250.0, 250.0, 250.0]; 40];
        samples.extend(vec![[200.0, 30.0, 30.0]; 40]);
        let gmm = Gmm::fit(&samples).unwrap();
        let white = gmm.most_likely_component(&[250.0, 250.0, 250.0]);
        let red = gmm.most_likely_component(&[200.0, 30.0, 30.0]);
        assert_ne!(white, red);
    }

    #[test]
    fn test_kmeans_groups_nearby_points() {
        let samples = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [100.0, 100.0, 100.0],
            [101.0, 100.0, 100.0],
        ];
        let labels = kmeans(&samples, 2);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_determinant_and_inverse() {
        let m = [[2.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 4.0]];
        let det = determinant(&m);
        assert!((det - 24.0).abs() < 1e-12);
        let inv = inverse(&m, det);
        assert!((inv[0][0] - 0.5).abs() < 1e-12);
        assert!((inv[2][2] - 0.25).abs() < 1e-12);
    }
}

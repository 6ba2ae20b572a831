//! Linear value-function baseline.

use crate::trajectory::{discount_cumsum, Path};

const OBS_CLIP: f64 = 10.0;
const MAX_REG_ATTEMPTS: usize = 5;

/// Least-squares fit of discounted returns on hand-crafted per-step
/// features: clipped observations, their squares, a cubic in time, and a
/// bias.
#[derive(Clone, Debug)]
pub struct LinearFeatureBaseline {
    coeffs: Option<Vec<f64>>,
    reg_coeff: f64,
}

impl Default for LinearFeatureBaseline {
    fn default() -> Self {
        Self::new(1e-5)
    }
}

impl LinearFeatureBaseline {
    #[must_use]
    pub fn new(reg_coeff: f64) -> Self {
        Self {
            coeffs: None,
            reg_coeff,
        }
    }

    fn features(path: &Path) -> Vec<Vec<f64>> {
        path.observations
            .iter()
            .enumerate()
            .map(|(t, obs)| {
                let o: Vec<f64> = obs.iter().map(|&v| f64::from(v).clamp(-OBS_CLIP, OBS_CLIP)).collect();
                let al = t as f64 / 100.0;
                let mut f = Vec::with_capacity(2 * o.len() + 4);
                f.extend_from_slice(&o);
                f.extend(o.iter().map(|v| v * v));
                f.extend([al, al * al, al * al * al, 1.0]);
                f
            })
            .collect()
    }

    /// Refits the coefficients on `paths`, escalating the ridge term when
    /// the solve is ill-conditioned.
    pub fn fit(&mut self, paths: &[Path], discount: f32) {
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for path in paths {
            rows.extend(Self::features(path));
            targets.extend(discount_cumsum(&path.rewards, discount).into_iter().map(f64::from));
        }
        let Some(n) = rows.first().map(Vec::len) else {
            return;
        };

        let mut ata = vec![vec![0.0; n]; n];
        let mut aty = vec![0.0; n];
        for (row, &y) in rows.iter().zip(&targets) {
            for i in 0..n {
                aty[i] += row[i] * y;
                for j in 0..n {
                    ata[i][j] += row[i] * row[j];
                }
            }
        }

        let mut reg = self.reg_coeff;
        for _ in 0..MAX_REG_ATTEMPTS {
            let mut a = ata.clone();
            for (i, r) in a.iter_mut().enumerate() {
                r[i] += reg;
            }
            if let Some(c) = solve(a, aty.clone()) {
                if c.iter().all(|v| v.is_finite()) {
                    self.coeffs = Some(c);
                    return;
                }
            }
            reg *= 10.0;
        }
        tracing::warn!("linear baseline fit failed; keeping previous coefficients");
    }

    /// Predicted value per step; zeros before the first fit.
    #[must_use]
    pub fn predict(&self, path: &Path) -> Vec<f32> {
        match &self.coeffs {
            None => vec![0.0; path.len()],
            Some(c) => Self::features(path)
                .iter()
                .map(|f| f.iter().zip(c).map(|(a, b)| a * b).sum::<f64>() as f32)
                .collect(),
        }
    }
}

/// Gaussian elimination with partial pivoting. `None` for singular systems.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

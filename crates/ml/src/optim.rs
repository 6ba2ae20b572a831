use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OptimError {
    #[error("optimiser was built for {expected} parameter groups, got {params} parameters and {grads} gradients")]
    GroupCount { expected: usize, params: usize, grads: usize },
    #[error("group {group}: expected {expected} values, got {params} parameters and {grads} gradients")]
    GroupLength {
        group: usize,
        expected: usize,
        params: usize,
        grads: usize,
    },
}

/// Adam optimiser over a fixed list of parameter slices.
#[derive(Clone, Debug)]
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    eps: f32,
    t: u32,
    m: Vec<Vec<f32>>,
    v: Vec<Vec<f32>>,
}

impl Adam {
    /// `sizes` lists the length of every parameter slice passed to [`Adam::step`].
    pub fn new(sizes: &[usize], lr: f32) -> Self {
        Self {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            t: 0,
            m: sizes.iter().map(|&n| vec![0.0; n]).collect(),
            v: sizes.iter().map(|&n| vec![0.0; n]).collect(),
        }
    }

    pub fn learning_rate(&self) -> f32 {
        self.lr
    }

    fn check_shapes(&self, params: &[&mut [f32]], grads: &[&[f32]]) -> Result<(), OptimError> {
        if params.len() != self.m.len() || grads.len() != self.m.len() {
            return Err(OptimError::GroupCount {
                expected: self.m.len(),
                params: params.len(),
                grads: grads.len(),
            });
        }
        for (group, ((p, g), m)) in params.iter().zip(grads).zip(&self.m).enumerate() {
            if p.len() != m.len() || g.len() != m.len() {
                return Err(OptimError::GroupLength {
                    group,
                    expected: m.len(),
                    params: p.len(),
                    grads: g.len(),
                });
            }
        }
        Ok(())
    }

    /// One descent step: `params -= lr * m̂ / (√v̂ + ε)`.
    ///
    /// # Errors
    ///
    /// Rejects parameter or gradient groups shaped differently from the
    /// sizes given to [`Adam::new`]; nothing is updated in that case.
    pub fn step(&mut self, params: &mut [&mut [f32]], grads: &[&[f32]]) -> Result<(), OptimError> {
        self.check_shapes(params, grads)?;
        self.t += 1;
        let t = i32::try_from(self.t).unwrap_or(i32::MAX);
        let lr_t = self.lr * (1.0 - self.beta2.powi(t)).sqrt() / (1.0 - self.beta1.powi(t));

        for (i, (p, grad)) in params.iter_mut().zip(grads).enumerate() {
            for j in 0..p.len() {
                let g = grad[j];
                self.m[i][j] = self.beta1 * self.m[i][j] + (1.0 - self.beta1) * g;
                self.v[i][j] = self.beta2 * self.v[i][j] + (1.0 - self.beta2) * g * g;
                p[j] -= lr_t * self.m[i][j] / (self.v[i][j].sqrt() + self.eps);
            }
        }
        Ok(())
    }
}

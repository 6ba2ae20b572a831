//! Small networks with a hand-written backward pass: a dense layer and a
//! gated recurrent unit unrolled over whole sequences.

use rand::Rng;
use rand_distr::Uniform;

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// A fully connected neural network layer.
#[derive(Clone, Debug)]
pub struct Dense {
    /// Row-major `[out_dim, in_dim]` weight matrix.
    pub w: Vec<f32>,
    /// The bias vector for the layer.
    pub b: Vec<f32>,
    /// The number of input dimensions.
    pub in_dim: usize,
    /// The number of output dimensions.
    pub out_dim: usize,
}

impl Dense {
    /// Glorot-uniform weights, zero bias.
    pub fn xavier(in_dim: usize, out_dim: usize, rng: &mut impl Rng) -> Self {
        let limit = (6.0f32 / (in_dim as f32 + out_dim as f32)).sqrt();
        let dist = Uniform::new(-limit, limit);
        Self {
            w: (0..in_dim * out_dim).map(|_| rng.sample(dist)).collect(),
            b: vec![0.0; out_dim],
            in_dim,
            out_dim,
        }
    }

    pub fn forward(&self, x: &[f32]) -> Vec<f32> {
        debug_assert_eq!(x.len(), self.in_dim);
        (0..self.out_dim)
            .map(|o| {
                let row = &self.w[o * self.in_dim..(o + 1) * self.in_dim];
                self.b[o] + row.iter().zip(x).map(|(w, x)| w * x).sum::<f32>()
            })
            .collect()
    }

    /// Accumulates parameter gradients into `grads` and returns `dL/dx`.
    pub fn backward(&self, x: &[f32], grad_out: &[f32], grads: &mut DenseGrads) -> Vec<f32> {
        let mut grad_in = vec![0.0; self.in_dim];
        for (o, &g) in grad_out.iter().enumerate() {
            if g == 0.0 {
                continue;
            }
            grads.b[o] += g;
            let row = o * self.in_dim;
            for i in 0..self.in_dim {
                grads.w[row + i] += g * x[i];
                grad_in[i] += g * self.w[row + i];
            }
        }
        grad_in
    }

    #[must_use]
    pub fn zero_grads(&self) -> DenseGrads {
        DenseGrads {
            w: vec![0.0; self.w.len()],
            b: vec![0.0; self.b.len()],
        }
    }
}

/// Gradient buffers shaped like a [`Dense`] layer.
#[derive(Clone, Debug)]
pub struct DenseGrads {
    pub w: Vec<f32>,
    pub b: Vec<f32>,
}

/// Gated recurrent unit.
///
/// Gates are stacked `[update, reset, candidate]` in both projections:
///
/// ```text
/// z  = σ(Wz x + bz + Uz h + cz)
/// r  = σ(Wr x + br + Ur h + cr)
/// n  = tanh(Wn x + bn + r ⊙ (Un h + cn))
/// h' = (1 - z) ⊙ n + z ⊙ h
/// ```
#[derive(Clone, Debug)]
pub struct Gru {
    input: Dense,
    recurrent: Dense,
    hidden_dim: usize,
}

/// Intermediate values of one GRU step kept for backpropagation.
#[derive(Clone, Debug)]
pub struct GruStep {
    x: Vec<f32>,
    h_prev: Vec<f32>,
    /// `Un h + cn`, needed for the reset-gate gradient.
    h_cand: Vec<f32>,
    z: Vec<f32>,
    r: Vec<f32>,
    n: Vec<f32>,
    h: Vec<f32>,
}

impl GruStep {
    /// Hidden state after this step.
    #[must_use]
    pub fn hidden(&self) -> &[f32] {
        &self.h
    }
}

impl Gru {
    pub fn new(in_dim: usize, hidden_dim: usize, rng: &mut impl Rng) -> Self {
        let input = Dense::xavier(in_dim, 3 * hidden_dim, rng);
        let mut recurrent = Dense::xavier(hidden_dim, 3 * hidden_dim, rng);
        // bias the update gate open so early training keeps its memory
        for b in &mut recurrent.b[..hidden_dim] {
            *b = 1.0;
        }
        Self {
            input,
            recurrent,
            hidden_dim,
        }
    }

    #[must_use]
    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    #[must_use]
    pub fn in_dim(&self) -> usize {
        self.input.in_dim
    }

    /// Advances the hidden state by one input and keeps the activations.
    #[must_use]
    pub fn step(&self, x: &[f32], h_prev: &[f32]) -> GruStep {
        let hd = self.hidden_dim;
        let gx = self.input.forward(x);
        let gh = self.recurrent.forward(h_prev);
        let z: Vec<f32> = (0..hd).map(|i| sigmoid(gx[i] + gh[i])).collect();
        let r: Vec<f32> = (0..hd).map(|i| sigmoid(gx[hd + i] + gh[hd + i])).collect();
        let h_cand = gh[2 * hd..].to_vec();
        let n: Vec<f32> = (0..hd).map(|i| (gx[2 * hd + i] + r[i] * h_cand[i]).tanh()).collect();
        let h = (0..hd).map(|i| (1.0 - z[i]) * n[i] + z[i] * h_prev[i]).collect();
        GruStep {
            x: x.to_vec(),
            h_prev: h_prev.to_vec(),
            h_cand,
            z,
            r,
            n,
            h,
        }
    }

    /// Backpropagates `dh` (dL/dh' of `step`) and returns dL/dh of the
    /// previous hidden state.
    pub fn backward_step(&self, step: &GruStep, dh: &[f32], grads: &mut GruGrads) -> Vec<f32> {
        let hd = self.hidden_dim;
        let mut d_gx = vec![0.0; 3 * hd];
        let mut d_gh = vec![0.0; 3 * hd];
        let mut dh_prev = vec![0.0; hd];
        for i in 0..hd {
            let (z, r, n) = (step.z[i], step.r[i], step.n[i]);
            let dn = dh[i] * (1.0 - z);
            let dz = dh[i] * (step.h_prev[i] - n);
            dh_prev[i] = dh[i] * z;

            let da_n = dn * (1.0 - n * n);
            let da_r = da_n * step.h_cand[i] * r * (1.0 - r);
            let da_z = dz * z * (1.0 - z);

            d_gx[i] = da_z;
            d_gx[hd + i] = da_r;
            d_gx[2 * hd + i] = da_n;
            d_gh[i] = da_z;
            d_gh[hd + i] = da_r;
            d_gh[2 * hd + i] = da_n * r;
        }
        self.input.backward(&step.x, &d_gx, &mut grads.input);
        let through_gates = self.recurrent.backward(&step.h_prev, &d_gh, &mut grads.recurrent);
        for (d, g) in dh_prev.iter_mut().zip(through_gates) {
            *d += g;
        }
        dh_prev
    }

    #[must_use]
    pub fn zero_grads(&self) -> GruGrads {
        GruGrads {
            input: self.input.zero_grads(),
            recurrent: self.recurrent.zero_grads(),
        }
    }

    /// Parameter slices in a fixed order matching [`GruGrads::slices`].
    pub fn params_mut(&mut self) -> Vec<&mut [f32]> {
        vec![
            self.input.w.as_mut_slice(),
            self.input.b.as_mut_slice(),
            self.recurrent.w.as_mut_slice(),
            self.recurrent.b.as_mut_slice(),
        ]
    }

    #[must_use]
    pub fn param_sizes(&self) -> Vec<usize> {
        vec![
            self.input.w.len(),
            self.input.b.len(),
            self.recurrent.w.len(),
            self.recurrent.b.len(),
        ]
    }
}

#[derive(Clone, Debug)]
pub struct GruGrads {
    input: DenseGrads,
    recurrent: DenseGrads,
}

impl GruGrads {
    #[must_use]
    pub fn slices(&self) -> Vec<&[f32]> {
        vec![
            self.input.w.as_slice(),
            self.input.b.as_slice(),
            self.recurrent.w.as_slice(),
            self.recurrent.b.as_slice(),
        ]
    }
}

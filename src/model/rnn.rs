//! Single-layer LSTM / GRU sequence classifiers: recurrent layer → dense(1) → sigmoid.
//!
//! Timesteps whose values all equal the mask value are skipped, so left padding
//! leaves the hidden state at zero until the first real observation.

use super::{Algorithm, SequenceModel};
use crate::config::TrainingConfig;
use crate::error::ModelError;
use crate::features::SequenceBatch;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayView3};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

fn sigmoid_vec(x: Array1<f32>) -> Array1<f32> {
    x.mapv_into(sigmoid)
}

fn tanh_vec(x: Array1<f32>) -> Array1<f32> {
    x.mapv_into(f32::tanh)
}

fn uniform<R: Rng + ?Sized>(rows: usize, cols: usize, limit: f32, rng: &mut R) -> Array2<f32> {
    let dist = Uniform::new_inclusive(-limit, limit);
    Array2::from_shape_fn((rows, cols), |_| dist.sample(rng))
}

fn binary_cross_entropy(p: f32, y: f32) -> f32 {
    let p = p.clamp(1e-7, 1.0 - 1e-7);
    -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
}

/// One recurrent step function.
pub trait RecurrentCell {
    type State;

    fn init<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self
    where
        Self: Sized;

    fn input_size(&self) -> usize;

    fn hidden_size(&self) -> usize;

    fn zero_state(&self) -> Self::State;

    fn step(&self, x: ArrayView1<'_, f32>, state: &Self::State) -> Self::State;

    /// Hidden vector exposed to the output layer.
    fn hidden<'s>(&self, state: &'s Self::State) -> &'s Array1<f32>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmCell {
    input_size: usize,
    hidden_size: usize,
    // input gate
    w_ii: Array2<f32>,
    w_hi: Array2<f32>,
    b_i: Array1<f32>,
    // forget gate
    w_if: Array2<f32>,
    w_hf: Array2<f32>,
    b_f: Array1<f32>,
    // cell candidate
    w_ig: Array2<f32>,
    w_hg: Array2<f32>,
    b_g: Array1<f32>,
    // output gate
    w_io: Array2<f32>,
    w_ho: Array2<f32>,
    b_o: Array1<f32>,
}

impl RecurrentCell for LstmCell {
    /// (h, c)
    type State = (Array1<f32>, Array1<f32>);

    fn init<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let limit = (1.0 / hidden_size.max(1) as f32).sqrt();
        Self {
            input_size,
            hidden_size,
            w_ii: uniform(hidden_size, input_size, limit, rng),
            w_hi: uniform(hidden_size, hidden_size, limit, rng),
            b_i: Array1::zeros(hidden_size),
            w_if: uniform(hidden_size, input_size, limit, rng),
            w_hf: uniform(hidden_size, hidden_size, limit, rng),
            b_f: Array1::from_elem(hidden_size, 1.0),
            w_ig: uniform(hidden_size, input_size, limit, rng),
            w_hg: uniform(hidden_size, hidden_size, limit, rng),
            b_g: Array1::zeros(hidden_size),
            w_io: uniform(hidden_size, input_size, limit, rng),
            w_ho: uniform(hidden_size, hidden_size, limit, rng),
            b_o: Array1::zeros(hidden_size),
        }
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn zero_state(&self) -> Self::State {
        (
            Array1::zeros(self.hidden_size),
            Array1::zeros(self.hidden_size),
        )
    }

    fn step(&self, x: ArrayView1<'_, f32>, state: &Self::State) -> Self::State {
        let (h_prev, c_prev) = state;
        let i = sigmoid_vec(self.w_ii.dot(&x) + self.w_hi.dot(h_prev) + &self.b_i);
        let f = sigmoid_vec(self.w_if.dot(&x) + self.w_hf.dot(h_prev) + &self.b_f);
        let g = tanh_vec(self.w_ig.dot(&x) + self.w_hg.dot(h_prev) + &self.b_g);
        let o = sigmoid_vec(self.w_io.dot(&x) + self.w_ho.dot(h_prev) + &self.b_o);

        let c = &f * c_prev + &i * &g;
        let h = &o * &c.mapv(f32::tanh);
        (h, c)
    }

    fn hidden<'s>(&self, state: &'s Self::State) -> &'s Array1<f32> {
        &state.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GruCell {
    input_size: usize,
    hidden_size: usize,
    // update gate
    w_iz: Array2<f32>,
    w_hz: Array2<f32>,
    b_z: Array1<f32>,
    // reset gate
    w_ir: Array2<f32>,
    w_hr: Array2<f32>,
    b_r: Array1<f32>,
    // candidate
    w_in: Array2<f32>,
    w_hn: Array2<f32>,
    b_n: Array1<f32>,
}

impl RecurrentCell for GruCell {
    type State = Array1<f32>;

    fn init<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let limit = (1.0 / hidden_size.max(1) as f32).sqrt();
        Self {
            input_size,
            hidden_size,
            w_iz: uniform(hidden_size, input_size, limit, rng),
            w_hz: uniform(hidden_size, hidden_size, limit, rng),
            b_z: Array1::zeros(hidden_size),
            w_ir: uniform(hidden_size, input_size, limit, rng),
            w_hr: uniform(hidden_size, hidden_size, limit, rng),
            b_r: Array1::zeros(hidden_size),
            w_in: uniform(hidden_size, input_size, limit, rng),
            w_hn: uniform(hidden_size, hidden_size, limit, rng),
            b_n: Array1::zeros(hidden_size),
        }
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn zero_state(&self) -> Self::State {
        Array1::zeros(self.hidden_size)
    }

    fn step(&self, x: ArrayView1<'_, f32>, h_prev: &Self::State) -> Self::State {
        let z = sigmoid_vec(self.w_iz.dot(&x) + self.w_hz.dot(h_prev) + &self.b_z);
        let r = sigmoid_vec(self.w_ir.dot(&x) + self.w_hr.dot(h_prev) + &self.b_r);
        let n = tanh_vec(self.w_in.dot(&x) + self.w_hn.dot(&(&r * h_prev)) + &self.b_n);

        let keep = z.mapv(|v| 1.0 - v);
        &keep * &n + &z * h_prev
    }

    fn hidden<'s>(&self, state: &'s Self::State) -> &'s Array1<f32> {
        state
    }
}

/// Logistic output unit over the final hidden state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub weights: Array1<f32>,
    pub bias: f32,
}

impl Dense {
    fn init<R: Rng + ?Sized>(input_size: usize, rng: &mut R) -> Self {
        let limit = (6.0 / (input_size as f32 + 1.0)).sqrt();
        let dist = Uniform::new_inclusive(-limit, limit);
        Self {
            weights: Array1::from_shape_fn(input_size, |_| dist.sample(rng)),
            bias: 0.0,
        }
    }

    pub fn probability(&self, hidden: &Array1<f32>) -> f32 {
        sigmoid(self.weights.dot(hidden) + self.bias)
    }
}

/// Loss history of one `fit` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub samples: usize,
    pub positives: usize,
    /// Mean (class-weighted) cross-entropy per epoch
    pub losses: Vec<f32>,
}

impl TrainingSummary {
    pub fn final_loss(&self) -> Option<f32> {
        self.losses.last().copied()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceClassifier<C> {
    cell: C,
    series_len: usize,
    mask_value: f32,
    output: Dense,
}

impl<C: RecurrentCell> SequenceClassifier<C> {
    pub fn new(
        n_features: usize,
        series_len: usize,
        mask_value: f32,
        hidden_size: usize,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let cell = C::init(n_features, hidden_size, &mut rng);
        let output = Dense::init(hidden_size, &mut rng);
        Self {
            cell,
            series_len,
            mask_value,
            output,
        }
    }

    pub fn input_shape(&self) -> (usize, usize) {
        (self.series_len, self.cell.input_size())
    }

    fn check_shape(&self, sequences: &ArrayView3<'_, f32>) -> Result<(), ModelError> {
        let shape = sequences.shape();
        let (expected_len, expected_features) = self.input_shape();
        if shape[1] != expected_len || shape[2] != expected_features {
            return Err(ModelError::ShapeMismatch {
                expected_len,
                expected_features,
                found_len: shape[1],
                found_features: shape[2],
            });
        }
        Ok(())
    }

    /// Final hidden state for one `[series_len, n_features]` sample.
    fn encode(&self, sample: ArrayView2<'_, f32>) -> Array1<f32> {
        let mut state = self.cell.zero_state();
        for row in sample.outer_iter() {
            if row.iter().all(|&v| v == self.mask_value) {
                continue;
            }
            state = self.cell.step(row, &state);
        }
        self.cell.hidden(&state).clone()
    }

    pub fn predict(&self, sequences: ArrayView3<'_, f32>) -> Result<Vec<f32>, ModelError> {
        self.check_shape(&sequences)?;
        Ok(sequences
            .outer_iter()
            .map(|sample| self.output.probability(&self.encode(sample)))
            .collect())
    }

    /// Fits the output unit by mini-batch gradient descent on binary
    /// cross-entropy; the recurrent weights stay at their seeded values.
    pub fn fit(
        &mut self,
        batch: &SequenceBatch,
        training: &TrainingConfig,
    ) -> Result<TrainingSummary, ModelError> {
        self.check_shape(&batch.sequences.view())?;
        let n = batch.len();
        if n == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }

        let encoded: Vec<Array1<f32>> = batch
            .sequences
            .outer_iter()
            .map(|sample| self.encode(sample))
            .collect();

        let positives = batch.positives();
        let (w_neg, w_pos) = if training.balance_classes && positives > 0 && positives < n {
            (
                n as f32 / (2.0 * (n - positives) as f32),
                n as f32 / (2.0 * positives as f32),
            )
        } else {
            (1.0, 1.0)
        };

        let mut rng = StdRng::seed_from_u64(training.seed.wrapping_add(1));
        let mut order: Vec<usize> = (0..n).collect();
        let batch_size = training.batch_size.max(1);
        let mut losses = Vec::with_capacity(training.epochs);

        for epoch in 0..training.epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0f64;

            for chunk in order.chunks(batch_size) {
                let mut grad_w = Array1::<f32>::zeros(self.output.weights.len());
                let mut grad_b = 0.0f32;
                for &i in chunk {
                    let y = f32::from(batch.labels[i]);
                    let weight = if batch.labels[i] == 1 { w_pos } else { w_neg };
                    let p = self.output.probability(&encoded[i]);
                    epoch_loss += f64::from(weight * binary_cross_entropy(p, y));
                    let err = weight * (p - y);
                    grad_w.scaled_add(err, &encoded[i]);
                    grad_b += err;
                }
                let step = training.learning_rate / chunk.len() as f32;
                self.output.weights.scaled_add(-step, &grad_w);
                self.output.bias -= step * grad_b;
            }

            let loss = (epoch_loss / n as f64) as f32;
            if !loss.is_finite() {
                return Err(ModelError::Diverged { epoch });
            }
            tracing::debug!(epoch, loss, "epoch complete");
            losses.push(loss);
        }

        Ok(TrainingSummary {
            samples: n,
            positives,
            losses,
        })
    }
}

/// Persisted model, tagged by algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "lowercase")]
pub enum RecurrentModel {
    Lstm(SequenceClassifier<LstmCell>),
    Gru(SequenceClassifier<GruCell>),
}

impl RecurrentModel {
    /// Untrained model with seeded weights.
    pub fn build(
        algorithm: Algorithm,
        n_features: usize,
        series_len: usize,
        mask_value: f32,
        training: &TrainingConfig,
    ) -> Self {
        let (hidden, seed) = (training.hidden_size, training.seed);
        match algorithm {
            Algorithm::Lstm => RecurrentModel::Lstm(SequenceClassifier::new(
                n_features, series_len, mask_value, hidden, seed,
            )),
            Algorithm::Gru => RecurrentModel::Gru(SequenceClassifier::new(
                n_features, series_len, mask_value, hidden, seed,
            )),
        }
    }

    pub fn fit(
        &mut self,
        batch: &SequenceBatch,
        training: &TrainingConfig,
    ) -> Result<TrainingSummary, ModelError> {
        match self {
            RecurrentModel::Lstm(m) => m.fit(batch, training),
            RecurrentModel::Gru(m) => m.fit(batch, training),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let io_err = |source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush().map_err(io_err)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::MissingArtifact {
                path: path.to_path_buf(),
            });
        }
        let data = std::fs::read(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_slice(&data)?)
    }
}

impl SequenceModel for RecurrentModel {
    fn algorithm(&self) -> Algorithm {
        match self {
            RecurrentModel::Lstm(_) => Algorithm::Lstm,
            RecurrentModel::Gru(_) => Algorithm::Gru,
        }
    }

    fn input_shape(&self) -> (usize, usize) {
        match self {
            RecurrentModel::Lstm(m) => m.input_shape(),
            RecurrentModel::Gru(m) => m.input_shape(),
        }
    }

    fn predict(&self, sequences: ArrayView3<'_, f32>) -> Result<Vec<f32>, ModelError> {
        match self {
            RecurrentModel::Lstm(m) => m.predict(sequences),
            RecurrentModel::Gru(m) => m.predict(sequences),
        }
    }
}

//! Applies filler specs to tensor payloads.

use anyhow::Result;
use rand::Rng;

use tensorspace::{FillerKind, Shape, Tensor};

const TRUNCATED_SAMPLE_TRIES: usize = 16;

/// Populates `tensor` at `shape` according to `kind`. Variable and
/// placeholder fillers zero the payload; the external component that later
/// writes real values finds allocated storage waiting.
pub fn apply_filler(tensor: &Tensor, shape: Shape, kind: &FillerKind) -> Result<()> {
    match kind {
        FillerKind::Variable | FillerKind::Placeholder => tensor.fill_f32(shape, 0.0),
        FillerKind::Constant { value } => tensor.fill_f32(shape, *value),
        FillerKind::Uniform { low, high } => {
            let mut rng = rand::thread_rng();
            let values: Vec<f32> = (0..shape.num_elements())
                .map(|_| rng.gen::<f32>() * (high - low) + low)
                .collect();
            tensor.write_f32(shape, &values)
        }
        FillerKind::Normal { mean, std } => {
            let mut rng = rand::thread_rng();
            let len = shape.num_elements();
            let mut values = Vec::with_capacity(len);
            while values.len() < len {
                let (z0, z1) = box_muller(&mut rng);
                values.push(mean + z0 * std);
                if values.len() < len {
                    values.push(mean + z1 * std);
                }
            }
            tensor.write_f32(shape, &values)
        }
        FillerKind::TruncatedNormal {
            mean,
            std,
            low,
            high,
        } => {
            let mut rng = rand::thread_rng();
            let values: Vec<f32> = (0..shape.num_elements())
                .map(|_| truncated_sample(&mut rng, *mean, *std, *low, *high))
                .collect();
            tensor.write_f32(shape, &values)
        }
    }
}

/// Samples `N(0, 1)` pairs via the Box-Muller transform.
fn box_muller(rng: &mut impl Rng) -> (f32, f32) {
    let u1: f32 = rng.gen::<f32>().max(f32::MIN_POSITIVE);
    let u2: f32 = rng.gen::<f32>();
    let r = (-2.0 * u1.ln()).sqrt();
    let theta = 2.0 * std::f32::consts::PI * u2;
    (r * theta.cos(), r * theta.sin())
}

/// Resamples until the value lands inside `[low, high]`, clamping after a
/// bounded number of tries so pathological bounds cannot spin forever.
fn truncated_sample(rng: &mut impl Rng, mean: f32, std: f32, low: f32, high: f32) -> f32 {
    for _ in 0..TRUNCATED_SAMPLE_TRIES {
        let (z0, _) = box_muller(rng);
        let value = mean + z0 * std;
        if value >= low && value <= high {
            return value;
        }
    }
    mean.clamp(low, high)
}

//! Host-backed tensor storage with a stable name and resettable payload.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;

use anyhow::{bail, Result};

use super::{DType, Shape};

/// Named mutable data resource owned by a workspace registry.
///
/// Handles are `Arc<Tensor>` and stay valid for the lifetime of the owning
/// workspace. [`Tensor::reset`] drops the backing payload without
/// invalidating the handle or the registry entry; a reader that held on to a
/// handle across a reset observes empty storage, not a dangling reference.
#[derive(Debug)]
pub struct Tensor {
    name: String,
    storage: Mutex<TensorStorage>,
    resets: AtomicU64,
}

#[derive(Debug, Default)]
struct TensorStorage {
    shape: Option<Shape>,
    dtype: DType,
    data: Vec<u8>,
}

impl Tensor {
    /// Creates an empty tensor bound to `name`. Storage is allocated on the
    /// first write.
    pub fn new(name: impl Into<String>) -> Self {
        Tensor {
            name: name.into(),
            storage: Mutex::new(TensorStorage::default()),
            resets: AtomicU64::new(0),
        }
    }

    /// Returns the storage name the registry knows this tensor by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Releases the backing payload while keeping the tensor (and any
    /// outstanding handles) alive.
    pub fn reset(&self) {
        let mut storage = self.storage.lock().expect("tensor storage poisoned");
        *storage = TensorStorage::default();
        self.resets.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Number of times [`Tensor::reset`] has run against this tensor.
    pub fn reset_count(&self) -> u64 {
        self.resets.load(AtomicOrdering::Relaxed)
    }

    /// Reports whether the tensor currently holds a payload.
    pub fn is_allocated(&self) -> bool {
        self.storage
            .lock()
            .expect("tensor storage poisoned")
            .shape
            .is_some()
    }

    /// Returns the current shape, if any payload is allocated.
    pub fn shape(&self) -> Option<Shape> {
        self.storage
            .lock()
            .expect("tensor storage poisoned")
            .shape
            .clone()
    }

    /// Returns the dtype of the current payload.
    pub fn dtype(&self) -> DType {
        self.storage.lock().expect("tensor storage poisoned").dtype
    }

    /// Replaces the payload with `values`, validating the length against the
    /// shape.
    pub fn write_f32(&self, shape: Shape, values: &[f32]) -> Result<()> {
        if values.len() != shape.num_elements() {
            bail!(
                "tensor `{}` data length ({}) does not match shape {:?}",
                self.name,
                values.len(),
                shape.dims()
            );
        }
        let mut data = Vec::with_capacity(values.len() * DType::F32.size_in_bytes());
        for value in values {
            data.extend_from_slice(&value.to_le_bytes());
        }
        let mut storage = self.storage.lock().expect("tensor storage poisoned");
        *storage = TensorStorage {
            shape: Some(shape),
            dtype: DType::F32,
            data,
        };
        Ok(())
    }

    /// Fills the tensor with `shape.num_elements()` copies of `value`.
    pub fn fill_f32(&self, shape: Shape, value: f32) -> Result<()> {
        let values = vec![value; shape.num_elements()];
        self.write_f32(shape, &values)
    }

    /// Copies the payload out as `f32` values.
    pub fn read_f32(&self) -> Result<Vec<f32>> {
        let storage = self.storage.lock().expect("tensor storage poisoned");
        if storage.shape.is_none() {
            bail!("tensor `{}` has no allocated payload", self.name);
        }
        if storage.dtype != DType::F32 {
            bail!(
                "tensor `{}` holds {:?} data, not F32",
                self.name,
                storage.dtype
            );
        }
        Ok(storage
            .data
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_validates_length_against_shape() {
        let tensor = Tensor::new("t");
        let err = tensor
            .write_f32(Shape::new([2, 2]), &[1.0, 2.0, 3.0])
            .unwrap_err();
        assert!(err.to_string().contains("does not match shape"));
    }

    #[test]
    fn reset_drops_payload_and_bumps_count() {
        let tensor = Tensor::new("t");
        tensor.write_f32(Shape::new([2]), &[1.0, 2.0]).unwrap();
        assert!(tensor.is_allocated());
        assert_eq!(tensor.reset_count(), 0);

        tensor.reset();
        assert!(!tensor.is_allocated());
        assert_eq!(tensor.reset_count(), 1);
        assert!(tensor.read_f32().is_err());
    }

    #[test]
    fn payload_round_trips() {
        let tensor = Tensor::new("t");
        tensor
            .write_f32(Shape::new([3]), &[1.0, -2.5, 0.0])
            .unwrap();
        assert_eq!(tensor.read_f32().unwrap(), vec![1.0, -2.5, 0.0]);
        assert_eq!(tensor.shape().unwrap().dims(), &[3]);
    }
}

//! Sinusoidal positional encoding.

use crate::error::{SwipeError, SwipeResult};
use candle_core::{Device, Tensor};

/// Fixed table: even channels sin(pos / 10000^(2i/d)), odd channels cos of the same angle.
#[derive(Clone, Debug)]
pub struct PositionalEncoding {
    table: Tensor,
    max_len: usize,
}

impl PositionalEncoding {
    pub fn new(d_model: usize, max_len: usize, device: &Device) -> SwipeResult<Self> {
        let mut data = vec![0.0f32; max_len * d_model];
        let log_base = -(10000.0f64).ln() / d_model as f64;
        for pos in 0..max_len {
            for i in (0..d_model).step_by(2) {
                let angle = pos as f64 * (i as f64 * log_base).exp();
                data[pos * d_model + i] = angle.sin() as f32;
                if i + 1 < d_model {
                    data[pos * d_model + i + 1] = angle.cos() as f32;
                }
            }
        }
        Ok(PositionalEncoding {
            table: Tensor::from_vec(data, (max_len, d_model), device)?,
            max_len,
        })
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Add the first T rows of the table to x of shape (B, T, d_model).
    pub fn forward(&self, x: &Tensor) -> SwipeResult<Tensor> {
        let (_, len, _) = x.dims3()?;
        if len > self.max_len {
            return Err(SwipeError::SequenceTooLong {
                len,
                max: self.max_len,
            });
        }
        Ok(x.broadcast_add(&self.table.narrow(0, 0, len)?)?)
    }
}

//! Sequence cross-entropy that ignores PAD targets.

use super::ops::log_softmax;
use crate::error::{SwipeError, SwipeResult};
use crate::vocab::PAD_TOKEN;
use candle_core::{DType, Tensor};

/// Mean negative log-likelihood of `targets` (B, T) under `logits`
/// (B, T, V), averaged over non-PAD positions only.
pub fn sequence_loss(logits: &Tensor, targets: &Tensor) -> SwipeResult<Tensor> {
    let (batch, len, vocab) = logits.dims3()?;
    let logits = logits.reshape((batch * len, vocab))?;
    let targets = targets.flatten_all()?;

    let keep = targets.ne(PAD_TOKEN)?.to_dtype(DType::F32)?;
    let count = keep.sum_all()?.to_scalar::<f32>()?;
    if count == 0.0 {
        return Err(SwipeError::Config("loss batch has no non-PAD targets".into()));
    }

    let picked = log_softmax(&logits)?
        .gather(&targets.unsqueeze(1)?, 1)?
        .squeeze(1)?;
    let total = (picked * keep)?.sum_all()?;
    Ok((total.neg()? / count as f64)?)
}

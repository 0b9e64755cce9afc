//! Op validation and sequential interpretation.

use std::sync::Arc;

use anyhow::{bail, Result};

use tensorspace::{FillerSpec, OpDef, Shape, Tensor, Workspace};

use crate::{fill, RefEngine, SCRATCH_CATEGORY};

/// Structural checks applied at compile time so `run` failures are limited
/// to data problems.
pub(crate) fn validate(op: &OpDef) -> Result<()> {
    match op.kind.as_str() {
        "Fill" => {
            expect_arity(op, 0, 1)?;
            match &op.shape {
                Some(dims) if !dims.is_empty() => {}
                Some(_) => bail!("Fill shape must have at least one dimension"),
                None => bail!("Fill requires a shape attribute"),
            }
        }
        "Copy" => expect_arity(op, 1, 1)?,
        "Add" => expect_arity(op, 2, 1)?,
        "Scale" => expect_arity(op, 1, 1)?,
        other => bail!("unknown op kind `{other}`"),
    }
    Ok(())
}

fn expect_arity(op: &OpDef, inputs: usize, outputs: usize) -> Result<()> {
    if op.inputs.len() != inputs {
        bail!(
            "{} expects {} input(s), got {}",
            op.kind,
            inputs,
            op.inputs.len()
        );
    }
    if op.outputs.len() != outputs {
        bail!(
            "{} expects {} output(s), got {}",
            op.kind,
            outputs,
            op.outputs.len()
        );
    }
    Ok(())
}

pub(crate) fn execute(workspace: &Arc<Workspace<RefEngine>>, op: &OpDef) -> Result<()> {
    match op.kind.as_str() {
        "Fill" => run_fill(workspace, op),
        "Copy" => run_copy(workspace, op),
        "Add" => run_add(workspace, op),
        "Scale" => run_scale(workspace, op),
        other => bail!("unknown op kind `{other}`"),
    }
}

/// Creates the output tensor and applies its registered filler, defaulting
/// to zeros when no spec was defined.
fn run_fill(workspace: &Arc<Workspace<RefEngine>>, op: &OpDef) -> Result<()> {
    let output = &op.outputs[0];
    let dims = op.shape.clone().expect("validated at compile time");
    let spec = workspace
        .lookup_filler(output)
        .unwrap_or_else(|| FillerSpec::constant(output.clone(), 0.0));
    let tensor = workspace.create_tensor(output);
    fill::apply_filler(&tensor, Shape::new(dims), &spec.kind)
}

fn run_copy(workspace: &Arc<Workspace<RefEngine>>, op: &OpDef) -> Result<()> {
    let input = workspace.get_tensor(&op.inputs[0], true)?;
    let (shape, values) = read_payload(&input)?;
    let output = workspace.create_tensor(&op.outputs[0]);
    output.write_f32(shape, &values)
}

/// Element-wise sum staged through a pooled scratch buffer, the
/// steady-state temporary-storage pattern the pool exists for.
fn run_add(workspace: &Arc<Workspace<RefEngine>>, op: &OpDef) -> Result<()> {
    let lhs = workspace.get_tensor(&op.inputs[0], true)?;
    let rhs = workspace.get_tensor(&op.inputs[1], true)?;
    let (shape, left) = read_payload(&lhs)?;
    let (rhs_shape, right) = read_payload(&rhs)?;
    if shape != rhs_shape {
        bail!(
            "Add inputs disagree on shape: {:?} vs {:?}",
            shape.dims(),
            rhs_shape.dims()
        );
    }
    let sum: Vec<f32> = left
        .iter()
        .zip(right.iter())
        .map(|(a, b)| a + b)
        .collect();

    let scratch = workspace.acquire_buffer(SCRATCH_CATEGORY)?;
    let staged = stage_through(&scratch, &shape, &sum, workspace, &op.outputs[0]);
    // Return the buffer to the pool before surfacing any staging error.
    workspace.release_buffer(&scratch, SCRATCH_CATEGORY, false)?;
    staged
}

fn stage_through(
    scratch: &Arc<Tensor>,
    shape: &Shape,
    values: &[f32],
    workspace: &Arc<Workspace<RefEngine>>,
    output: &str,
) -> Result<()> {
    scratch.write_f32(shape.clone(), values)?;
    let staged = scratch.read_f32()?;
    let tensor = workspace.create_tensor(output);
    tensor.write_f32(shape.clone(), &staged)
}

fn run_scale(workspace: &Arc<Workspace<RefEngine>>, op: &OpDef) -> Result<()> {
    let factor = op.value.unwrap_or(1.0);
    let input = workspace.get_tensor(&op.inputs[0], true)?;
    let (shape, values) = read_payload(&input)?;
    let scaled: Vec<f32> = values.iter().map(|v| v * factor).collect();
    let output = workspace.create_tensor(&op.outputs[0]);
    output.write_f32(shape, &scaled)
}

fn read_payload(tensor: &Arc<Tensor>) -> Result<(Shape, Vec<f32>)> {
    let values = tensor.read_f32()?;
    let shape = match tensor.shape() {
        Some(shape) => shape,
        None => bail!("tensor `{}` has no allocated payload", tensor.name()),
    };
    Ok((shape, values))
}

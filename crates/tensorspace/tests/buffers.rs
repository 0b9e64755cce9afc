use std::sync::Arc;

use anyhow::Result;
use tensorspace::config::COMMON_BUFFERS;
use tensorspace::{Error, Shape, Workspace};
use tensorspace_engine_ref::RefEngine;

fn workspace(name: &str) -> Arc<Workspace<RefEngine>> {
    Workspace::new(name, RefEngine::new())
}

#[test]
fn common_pool_cycles_at_its_seed_capacity() -> Result<()> {
    let ws = workspace("W");
    assert_eq!(ws.pooled_buffers(COMMON_BUFFERS), 2);

    let first = ws.acquire_buffer(COMMON_BUFFERS)?;
    let second = ws.acquire_buffer(COMMON_BUFFERS)?;
    assert_eq!(ws.pooled_buffers(COMMON_BUFFERS), 0);

    let err = ws.acquire_buffer(COMMON_BUFFERS).unwrap_err();
    assert!(matches!(err, Error::PoolExhausted { .. }));
    assert!(err.is_fatal());

    ws.release_buffer(&first, COMMON_BUFFERS, false)?;
    ws.release_buffer(&second, COMMON_BUFFERS, false)?;
    assert_eq!(ws.pooled_buffers(COMMON_BUFFERS), 2);
    Ok(())
}

#[test]
fn release_at_capacity_fully_resets_instead_of_pooling() -> Result<()> {
    let ws = workspace("W");
    let first = ws.acquire_buffer(COMMON_BUFFERS)?;
    let second = ws.acquire_buffer(COMMON_BUFFERS)?;
    ws.release_buffer(&first, COMMON_BUFFERS, false)?;
    ws.release_buffer(&second, COMMON_BUFFERS, false)?;

    // The pool is back at capacity; an extra local tensor returned to it
    // must be reset outright rather than grow the stack.
    let extra = ws.create_tensor("steady_state_extra");
    extra.write_f32(Shape::new([2]), &[1.0, 2.0])?;
    ws.release_buffer(&extra, COMMON_BUFFERS, false)?;

    assert_eq!(extra.reset_count(), 1);
    assert!(!extra.is_allocated());
    assert_eq!(ws.pooled_buffers(COMMON_BUFFERS), 2);
    Ok(())
}

#[test]
fn recycled_buffers_keep_their_payload() -> Result<()> {
    let ws = workspace("W");
    let buffer = ws.acquire_buffer(COMMON_BUFFERS)?;
    buffer.write_f32(Shape::new([2]), &[3.0, 4.0])?;

    ws.release_buffer(&buffer, COMMON_BUFFERS, false)?;
    assert_eq!(buffer.reset_count(), 0);

    let reacquired = ws.acquire_buffer(COMMON_BUFFERS)?;
    assert!(Arc::ptr_eq(&buffer, &reacquired));
    assert_eq!(reacquired.read_f32()?, vec![3.0, 4.0]);
    Ok(())
}

#[test]
fn forced_release_resets_below_capacity() -> Result<()> {
    let ws = workspace("W");
    let buffer = ws.acquire_buffer(COMMON_BUFFERS)?;
    buffer.write_f32(Shape::new([1]), &[9.0])?;

    ws.release_buffer(&buffer, COMMON_BUFFERS, true)?;
    assert_eq!(buffer.reset_count(), 1);
    assert_eq!(ws.pooled_buffers(COMMON_BUFFERS), 1);
    Ok(())
}

#[test]
fn custom_categories_register_their_tensors() -> Result<()> {
    let ws = workspace("W");
    ws.create_buffer_category("Aux", 3)?;
    for index in 1..=3 {
        assert!(ws.exists(&format!("_t_Aux_buffer_{index}"), false));
    }
    assert_eq!(ws.pooled_buffers("Aux"), 3);

    let err = ws.create_buffer_category("Aux", 1).unwrap_err();
    assert!(matches!(err, Error::DuplicateCategory { .. }));
    Ok(())
}

#[test]
fn empty_config_seeds_no_pools() -> Result<()> {
    let ws = Workspace::with_config("bare", RefEngine::new(), tensorspace::WorkspaceConfig::empty())?;
    assert!(matches!(
        ws.acquire_buffer(COMMON_BUFFERS),
        Err(Error::UnknownCategory { .. })
    ));

    ws.create_buffer_category(COMMON_BUFFERS, 1)?;
    let buffer = ws.acquire_buffer(COMMON_BUFFERS)?;
    assert_eq!(buffer.name(), "_t_Common_buffer_1");
    Ok(())
}

#[test]
fn operations_on_unknown_categories_are_fatal() {
    let ws = workspace("W");
    let err = ws.acquire_buffer("Nope").unwrap_err();
    assert!(matches!(err, Error::UnknownCategory { .. }));
    assert!(err.is_fatal());

    let tensor = ws.create_tensor("t");
    let err = ws.release_buffer(&tensor, "Nope", false).unwrap_err();
    assert!(matches!(err, Error::UnknownCategory { .. }));
}

#[test]
fn overflow_release_of_a_foreign_tensor_is_rejected() {
    let parent = workspace("A");
    let child = workspace("B");
    let foreign = child.create_tensor("x");
    parent.attach(Arc::clone(&child));

    // The destructive-release path goes through local ownership checks;
    // a remote-owned tensor cannot be reset from here.
    let err = parent
        .release_buffer(&foreign, COMMON_BUFFERS, true)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidOwnership { .. }));
}

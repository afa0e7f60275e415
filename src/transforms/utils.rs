//! Small helpers shared by the passes.

use crate::{
    il::{IlFunction, NodeId},
    transforms::TransformContext,
    Result,
};

/// Removes the instruction at `index` of `block` and immediately runs the inliner at the
/// vacated position.
///
/// Returns the number of instructions the inliner consumed in front of `index`. The
/// instruction that followed the removed one now sits at `index - count`.
pub(crate) fn remove_and_inline(
    function: &mut IlFunction,
    block: NodeId,
    index: usize,
    ctx: &TransformContext,
) -> Result<usize> {
    function.remove_at(block, index)?;
    ctx.inliner
        .inline_into(function, block, index, ctx.settings.inlining, ctx)
}

/// Adjusts a block cursor after `remove_and_inline` removed the instruction at `removed` and
/// the inliner consumed `inlined` instructions in front of it.
///
/// The original positions `removed - inlined ..= removed` are gone. A cursor past that range
/// shifts down by its length; a cursor inside it lands on the first surviving instruction
/// after it.
pub(crate) fn rewind_cursor(cursor: usize, removed: usize, inlined: usize) -> usize {
    let first = removed.saturating_sub(inlined);
    if cursor > removed {
        cursor - (inlined + 1)
    } else if cursor >= first {
        first
    } else {
        cursor
    }
}

//! Virtual address layout.
//!
//! Assigns each output region its base virtual address before relocations are
//! patched. The metadata tables sit in page 0 right after the headers, so
//! their sizes feed into where `.text` starts; placeholder tables are built
//! here purely to measure them (entry counts decide the size, values do not).

use crate::output::{build_dynsym, build_hash, file_layout};
use crate::types::{Layout, LinkContext};

/// Compute the base virtual address of every output region. Must run before
/// symbol values are finalized, and again whenever the size of the runtime
/// fixup table changes.
pub fn compute_layout(ctx: &mut LinkContext) {
    let (dynsym, dynstr, _) = build_dynsym(ctx);
    let hash = build_hash(&dynsym, &dynstr);
    let fl = file_layout(ctx, dynsym.len() as u64, dynstr.len() as u64, hash.len() as u64);

    let base = ctx.base_addr;
    ctx.layout = Layout {
        text_vaddr: base + fl.text_off,
        rodata_vaddr: base + fl.rodata_off,
        data_vaddr: base + fl.data_off,
        dynamic_vaddr: base + fl.dyn_off,
        bss_vaddr: base + fl.bss_off,
    };
}

//! Section classification and merging.
//!
//! Every allocatable PROGBITS/NOBITS input section is bucketed into one of
//! four output classes (text, rodata, data, bss) and concatenated into the
//! per-class output buffer, aligned to the input section's own requirement.
//! Zero-fill sections only advance a size cursor; they carry no file bytes.

use crate::elf::*;
use crate::types::{align_up, buf_align, LinkContext, OutClass};

/// Classify an input section by name and flags.
///
/// Evaluated in order: non-allocated sections are dropped, then debug/unwind/
/// note/comment/group sections regardless of flags, then a fixed set of name
/// prefixes, then a flag-based fallback for anything else allocated.
pub fn classify_section(name: &str, flags: u64) -> OutClass {
    if flags & SHF_ALLOC == 0 {
        return OutClass::None;
    }

    // Discard debug and unwind info
    if name == ".eh_frame" || name == ".eh_frame_hdr" {
        return OutClass::None;
    }
    if name.starts_with(".debug") || name.starts_with(".note") {
        return OutClass::None;
    }
    if name == ".comment" || name == ".group" {
        return OutClass::None;
    }

    // Code
    if name.starts_with(".text") {
        return OutClass::Text;
    }
    if name.starts_with(".init") && flags & SHF_WRITE == 0 {
        return OutClass::Text;
    }

    // Read-only data (.data.rel.ro must be tested before .data)
    if name.starts_with(".rodata") || name.starts_with(".data.rel.ro") {
        return OutClass::Rodata;
    }

    // Writable data
    if name.starts_with(".data")
        || name.starts_with(".init_array")
        || name.starts_with(".fini_array")
        || name.starts_with(".got")
        || name.starts_with(".tdata")
    {
        return OutClass::Data;
    }

    // Zero-fill
    if name.starts_with(".bss") || name.starts_with(".tbss") {
        return OutClass::Bss;
    }

    // Unknown allocated section: classify by flags
    if flags & SHF_EXECINSTR != 0 {
        return OutClass::Text;
    }
    if flags & SHF_WRITE != 0 {
        return OutClass::Data;
    }
    OutClass::Rodata
}

/// Merge all input sections into the output buffers, walking objects in
/// input order and sections in header order. Records each section's
/// `{class, merged offset}` in its object's section map.
pub fn merge_sections(ctx: &mut LinkContext) {
    for i in 0..ctx.objects.len() {
        for j in 0..ctx.objects[i].shdrs.len() {
            let (sh_type, flags, offset, size, addralign, name) = {
                let sh = &ctx.objects[i].shdrs[j];
                (sh.sh_type, sh.flags, sh.offset, sh.size, sh.addralign, sh.name.clone())
            };

            // Only PROGBITS and NOBITS sections carry mergeable content
            if sh_type != SHT_PROGBITS && sh_type != SHT_NOBITS {
                continue;
            }

            let class = classify_section(&name, flags);
            if class == OutClass::None {
                continue;
            }

            let align = addralign.max(1);

            if class == OutClass::Bss || sh_type == SHT_NOBITS {
                // Zero-fill: advance the cursor, no file bytes
                let aligned = align_up(ctx.bss_size, align);
                ctx.objects[i].sec_map[j].out_class = OutClass::Bss;
                ctx.objects[i].sec_map[j].out_off = aligned;
                ctx.bss_size = aligned + size;
                if align > ctx.bss_align {
                    ctx.bss_align = align;
                }
            } else {
                let target = match class {
                    OutClass::Text => &mut ctx.text,
                    OutClass::Rodata => &mut ctx.rodata,
                    OutClass::Data => &mut ctx.data,
                    _ => continue,
                };
                buf_align(target, align);
                let out_off = target.len() as u64;
                let (start, end) = (offset as usize, (offset + size) as usize);
                let bytes = &ctx.objects[i].data[start..end];
                match class {
                    OutClass::Text => ctx.text.extend_from_slice(bytes),
                    OutClass::Rodata => ctx.rodata.extend_from_slice(bytes),
                    OutClass::Data => ctx.data.extend_from_slice(bytes),
                    _ => unreachable!(),
                }
                ctx.objects[i].sec_map[j].out_class = class;
                ctx.objects[i].sec_map[j].out_off = out_off;
            }
        }
    }
}

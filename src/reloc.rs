//! Relocation collection and patching.
//!
//! Relocations are translated into merged-buffer coordinates when collected,
//! then patched in place once symbol addresses are final. Absolute relocations
//! additionally emit runtime fixup entries into `.rela.dyn` so the dynamic
//! loader can rebase the image. Because those entries occupy space in the
//! metadata region, the fixup buffer is pre-sized with placeholders, layout is
//! recomputed, and the buffer is rebuilt with real content during patching.
//!
//! With no GOT in the output, GOT-relative loads are relaxed to direct
//! address computation (x86-64 `mov` → `lea`, AArch64 `LDR` → `ADD`).

use crate::elf::*;
use crate::layout::compute_layout;
use crate::types::{LinkContext, OutClass, Reloc};

/// Translate every `SHT_RELA` entry in every object into a [`Reloc`] against
/// the merged output buffers, mapping symbol indices through each object's
/// symbol map. Entries against dropped sections are discarded.
pub fn collect_relocs(ctx: &mut LinkContext) {
    for i in 0..ctx.objects.len() {
        for j in 0..ctx.objects[i].shdrs.len() {
            let (sh_type, info, offset, size) = {
                let sh = &ctx.objects[i].shdrs[j];
                (sh.sh_type, sh.info, sh.offset, sh.size)
            };
            if sh_type != SHT_RELA {
                continue;
            }

            // sh_info names the section being relocated
            let target = info as usize;
            if target >= ctx.objects[i].shdrs.len() {
                continue;
            }
            let out_class = ctx.objects[i].sec_map[target].out_class;
            let sec_base = ctx.objects[i].sec_map[target].out_off;
            if out_class == OutClass::None {
                continue;
            }

            let nrela = (size / RELA_SIZE as u64) as usize;
            for k in 0..nrela {
                let ent = offset as usize + k * RELA_SIZE;
                let data = &ctx.objects[i].data;
                let r_offset = read_u64(data, ent);
                let r_info = read_u64(data, ent + 8);
                let r_addend = read_i64(data, ent + 16);
                let sym_idx = (r_info >> 32) as u32;
                let rtype = r_info as u32;

                if rtype == R_X86_64_NONE {
                    continue;
                }

                let gsym = ctx.objects[i]
                    .sym_map
                    .get(sym_idx as usize)
                    .copied()
                    .unwrap_or(0);

                ctx.relocs.push(Reloc {
                    out_class,
                    offset: sec_base + r_offset,
                    rtype,
                    addend: r_addend,
                    sym_idx: gsym,
                });
            }
        }
    }
}

/// Assign every symbol its final virtual address. Undefined (weak) symbols
/// get 0, absolute symbols keep their raw value, everything else is
/// class base + merged section offset + intra-section offset.
pub fn finalize_symbol_values(ctx: &mut LinkContext) {
    for i in 0..ctx.symbols.len() {
        let (defined, sym_type, out_class, obj_idx, sec_idx, sec_off) = {
            let s = &ctx.symbols[i];
            (s.defined, s.sym_type, s.out_class, s.obj_idx, s.sec_idx, s.sec_off)
        };

        if !defined {
            ctx.symbols[i].value = 0;
            continue;
        }

        let merged_off = ctx
            .objects
            .get(obj_idx)
            .and_then(|o| o.sec_map.get(sec_idx))
            .map(|m| m.out_off)
            .unwrap_or(0);

        if sym_type == STT_SECTION {
            ctx.symbols[i].value = ctx.class_vaddr(out_class) + merged_off;
            continue;
        }

        if out_class == OutClass::None {
            // Absolute symbol (or one in an unmerged section): raw value
            ctx.symbols[i].value = sec_off;
            continue;
        }

        ctx.symbols[i].value = ctx.class_vaddr(out_class) + merged_off + sec_off;
    }
}

fn patch_u32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
}

fn patch_u64(buf: &mut [u8], off: usize, v: u64) {
    buf[off..off + 8].copy_from_slice(&v.to_le_bytes());
}

fn push_rela(rela_dyn: &mut Vec<u8>, nrela_dyn: &mut usize, offset: u64, rtype: u32, addend: i64) {
    rela_dyn.extend_from_slice(&offset.to_le_bytes());
    rela_dyn.extend_from_slice(&(rtype as u64).to_le_bytes());
    rela_dyn.extend_from_slice(&addend.to_le_bytes());
    *nrela_dyn += 1;
}

/// Bytes the relocation writes at its target offset.
fn patch_width(rtype: u32) -> usize {
    match rtype {
        R_X86_64_64 | R_X86_64_PC64 | R_AARCH64_ABS64 | R_AARCH64_PREL64 => 8,
        _ => 4,
    }
}

fn in_i32(v: i64) -> bool {
    v >= i32::MIN as i64 && v <= i32::MAX as i64
}

/// Rewrite a GOT load `mov reg, [rip+disp]` into `lea reg, [rip+disp]`.
/// The opcode byte sits two bytes before the displacement, ahead of ModRM.
/// Anything that is not a mov (and not already a lea) cannot be relaxed and
/// gets a best-effort displacement patch with a warning.
fn relax_x86_got_load(buf: &mut [u8], off: usize, sym: &str) {
    if off < 2 {
        return;
    }
    match buf[off - 2] {
        0x8b => buf[off - 2] = 0x8d, // mov -> lea
        0x8d => {}
        op => eprintln!(
            "solink: warning: GOT-relative access with opcode 0x{:02x} for '{}' (cannot relax)",
            op, sym
        ),
    }
}

/// Rewrite `LDR Xd, [Xn, #off]` into `ADD Xd, Xn, #imm`, keeping Rd/Rn.
fn relax_a64_got_load(insn: u32) -> u32 {
    (insn & 0x003F_FFFF) | 0x9100_0000
}

fn apply_relocs(ctx: &mut LinkContext) -> Result<(), String> {
    let mut errors: Vec<String> = Vec::new();

    let layout = ctx.layout;
    let LinkContext {
        text,
        rodata,
        data,
        rela_dyn,
        nrela_dyn,
        relocs,
        symbols,
        ..
    } = ctx;

    for r in relocs.iter() {
        let sname = symbols
            .get(r.sym_idx as usize)
            .map(|s| s.name.as_str())
            .unwrap_or("?");
        let s_val = symbols.get(r.sym_idx as usize).map(|s| s.value).unwrap_or(0);
        let a = r.addend;

        let (buf, vbase): (&mut [u8], u64) = match r.out_class {
            OutClass::Text => (text.as_mut_slice(), layout.text_vaddr),
            OutClass::Rodata => (rodata.as_mut_slice(), layout.rodata_vaddr),
            OutClass::Data => (data.as_mut_slice(), layout.data_vaddr),
            _ => continue,
        };

        let off = r.offset as usize;
        let p = vbase + r.offset;
        if off + patch_width(r.rtype) > buf.len() {
            errors.push(format!(
                "relocation offset 0x{:x} out of bounds ({:?})",
                r.offset, r.out_class
            ));
            continue;
        }

        match r.rtype {
            // S + A, absolute 64-bit; needs a runtime rebase entry
            R_X86_64_64 | R_AARCH64_ABS64 => {
                let val = s_val.wrapping_add_signed(a);
                patch_u64(buf, off, val);
                let rel = if r.rtype == R_X86_64_64 { R_X86_64_RELATIVE } else { R_AARCH64_RELATIVE };
                push_rela(rela_dyn, nrela_dyn, p, rel, val as i64);
            }

            // S + A - P, PC-relative 32-bit
            R_X86_64_PC32 | R_X86_64_PLT32 | R_AARCH64_PREL32 => {
                let val = s_val as i64 + a - p as i64;
                if !in_i32(val) {
                    errors.push(format!(
                        "PC32 relocation overflow for '{}' (value=0x{:x})",
                        sname, val
                    ));
                }
                patch_u32(buf, off, val as u32);
            }

            // S + A, zero-extended 32-bit
            R_X86_64_32 => {
                let val = s_val.wrapping_add_signed(a);
                if val > 0xFFFF_FFFF {
                    errors.push(format!(
                        "32-bit absolute relocation overflow for '{}' (value=0x{:x})",
                        sname, val
                    ));
                }
                patch_u32(buf, off, val as u32);
                push_rela(rela_dyn, nrela_dyn, p, R_X86_64_32, val as i64);
            }

            // S + A, sign-extended 32-bit
            R_X86_64_32S => {
                let val = s_val as i64 + a;
                if !in_i32(val) {
                    errors.push(format!(
                        "32-bit signed relocation overflow for '{}' (value=0x{:x})",
                        sname, val
                    ));
                }
                patch_u32(buf, off, val as u32);
                push_rela(rela_dyn, nrela_dyn, p, R_X86_64_32S, val);
            }

            R_AARCH64_ABS32 => {
                let val = s_val as i64 + a;
                if val < 0 || val > 0xFFFF_FFFF {
                    errors.push(format!(
                        "32-bit absolute relocation overflow for '{}' (value=0x{:x})",
                        sname, val
                    ));
                }
                patch_u32(buf, off, val as u32);
                push_rela(rela_dyn, nrela_dyn, p, R_AARCH64_ABS32, val);
            }

            // S + A - P, 64-bit
            R_X86_64_PC64 | R_AARCH64_PREL64 => {
                let val = s_val as i64 + a - p as i64;
                patch_u64(buf, off, val as u64);
            }

            // GOT-relative load relaxed to a direct lea
            R_X86_64_GOTPCREL | R_X86_64_GOTPCRELX | R_X86_64_REX_GOTPCRELX => {
                relax_x86_got_load(buf, off, sname);
                let val = s_val as i64 + a - p as i64;
                if !in_i32(val) {
                    errors.push(format!(
                        "GOT-relative relocation overflow for '{}' (value=0x{:x})",
                        sname, val
                    ));
                }
                patch_u32(buf, off, val as u32);
            }

            // S + A - P as imm26 in B/BL
            R_AARCH64_CALL26 | R_AARCH64_JUMP26 => {
                let val = s_val as i64 + a - p as i64;
                if val < -(1 << 27) || val >= (1 << 27) {
                    errors.push(format!(
                        "branch relocation overflow for '{}' (value=0x{:x})",
                        sname, val
                    ));
                }
                let insn = read_u32(buf, off);
                let insn = (insn & 0xFC00_0000) | (((val >> 2) as u32) & 0x03FF_FFFF);
                patch_u32(buf, off, insn);
            }

            // Page(S+A) - Page(P) in ADRP: immlo at [30:29], immhi at [23:5].
            // ADR_GOT_PAGE has no GOT to point at, so it degrades to a
            // direct page reference.
            R_AARCH64_ADR_PREL_PG_HI21 | R_AARCH64_ADR_GOT_PAGE => {
                let val = ((s_val.wrapping_add_signed(a)) & !0xFFF) as i64 - (p & !0xFFF) as i64;
                let imm = val >> 12;
                if imm < -(1 << 20) || imm >= (1 << 20) {
                    errors.push(format!(
                        "page-relative relocation overflow for '{}' (value=0x{:x})",
                        sname, val
                    ));
                }
                let insn = read_u32(buf, off);
                let immlo = ((imm as u32) & 0x3) << 29;
                let immhi = (((imm >> 2) as u32) & 0x7_FFFF) << 5;
                let insn = (insn & 0x9F00_001F) | immlo | immhi;
                patch_u32(buf, off, insn);
            }

            // (S + A) & 0xFFF into imm12 [21:10], scaled by the access size
            R_AARCH64_ADD_ABS_LO12_NC
            | R_AARCH64_LDST8_ABS_LO12_NC
            | R_AARCH64_LDST16_ABS_LO12_NC
            | R_AARCH64_LDST32_ABS_LO12_NC
            | R_AARCH64_LDST64_ABS_LO12_NC
            | R_AARCH64_LDST128_ABS_LO12_NC => {
                let lo = (s_val.wrapping_add_signed(a)) & 0xFFF;
                let shift = match r.rtype {
                    R_AARCH64_LDST16_ABS_LO12_NC => 1,
                    R_AARCH64_LDST32_ABS_LO12_NC => 2,
                    R_AARCH64_LDST64_ABS_LO12_NC => 3,
                    R_AARCH64_LDST128_ABS_LO12_NC => 4,
                    _ => 0,
                };
                let lo12 = (lo >> shift) as u32;
                let insn = read_u32(buf, off);
                let insn = (insn & 0xFFC0_03FF) | (lo12 << 10);
                patch_u32(buf, off, insn);
            }

            // GOT load becomes a direct address computation, with the low
            // 12 bits of the symbol address as the immediate
            R_AARCH64_LD64_GOT_LO12_NC => {
                let insn = relax_a64_got_load(read_u32(buf, off));
                let lo12 = ((s_val.wrapping_add_signed(a)) & 0xFFF) as u32;
                let insn = (insn & 0xFFC0_03FF) | (lo12 << 10);
                patch_u32(buf, off, insn);
            }

            other => {
                errors.push(format!(
                    "unsupported relocation type {} at {:?} offset 0x{:x}",
                    other, r.out_class, r.offset
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("\n"))
    }
}

/// Full relocation pipeline: collect, pre-size the runtime fixup table so
/// layout accounts for it, finalize symbol addresses, then patch.
pub fn apply_relocations(ctx: &mut LinkContext) -> Result<(), String> {
    collect_relocs(ctx);

    // Absolute relocations each produce one runtime fixup entry. Layout must
    // see that space before offsets are final, so reserve placeholders,
    // recompute, then rebuild the buffer for real during patching.
    let nabs = ctx
        .relocs
        .iter()
        .filter(|r| {
            matches!(
                r.rtype,
                R_X86_64_64 | R_X86_64_32 | R_X86_64_32S | R_AARCH64_ABS64 | R_AARCH64_ABS32
            )
        })
        .count();
    if nabs > 0 {
        ctx.rela_dyn.resize(nabs * RELA_SIZE, 0);
        compute_layout(ctx);
        ctx.rela_dyn.clear();
        ctx.nrela_dyn = 0;
    }

    finalize_symbol_values(ctx);
    apply_relocs(ctx)
}

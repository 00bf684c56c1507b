//! Symbol collection, resolution and export marking.
//!
//! All symbols from all inputs are folded into one link-wide table. Global and
//! weak symbols are deduplicated by name; locals and section symbols always get
//! fresh entries. Two strong definitions of the same name are a hard failure,
//! reported in aggregate so one run surfaces every conflict.

use crate::elf::*;
use crate::types::{LinkContext, OutClass, Symbol};

fn find_global(ctx: &LinkContext, name: &str) -> Option<usize> {
    // Linear search, fine for typical library sizes
    ctx.symbols
        .iter()
        .position(|s| s.bind != STB_LOCAL && s.name == name)
}

fn add_symbol(ctx: &mut LinkContext, sym: Symbol) -> usize {
    ctx.symbols.push(sym);
    ctx.symbols.len() - 1
}

/// Fold every input symbol table into the global table, filling each object's
/// symbol index map. Fails if any name has two strong definitions; all
/// conflicts found are reported together.
pub fn collect_symbols(ctx: &mut LinkContext) -> Result<(), String> {
    let mut duplicates: Vec<String> = Vec::new();

    for i in 0..ctx.objects.len() {
        for j in 0..ctx.objects[i].symtab.len() {
            let (name, bind, sym_type, shndx, value, size) = {
                let s = &ctx.objects[i].symtab[j];
                (s.name.clone(), s.binding(), s.sym_type(), s.shndx, s.value, s.size)
            };

            // Entry 0 is the reserved null symbol
            if j == 0 {
                ctx.objects[i].sym_map[j] = 0;
                continue;
            }
            if sym_type == STT_FILE {
                ctx.objects[i].sym_map[j] = 0;
                continue;
            }

            let defined = shndx != SHN_UNDEF && shndx != SHN_COMMON;
            let is_abs = shndx == SHN_ABS;

            let mut out_class = OutClass::None;
            if defined && !is_abs && (shndx as usize) < ctx.objects[i].shdrs.len() {
                out_class = ctx.objects[i].sec_map[shndx as usize].out_class;
            }

            // Section symbols stand for the section itself
            if sym_type == STT_SECTION {
                if (shndx as usize) < ctx.objects[i].shdrs.len() {
                    let gsym = add_symbol(ctx, Symbol {
                        name,
                        bind,
                        sym_type,
                        defined,
                        obj_idx: i,
                        sec_idx: shndx as usize,
                        sec_off: 0,
                        size: 0,
                        out_class,
                        value: 0,
                        is_export: false,
                    });
                    ctx.objects[i].sym_map[j] = gsym as u32;
                } else {
                    ctx.objects[i].sym_map[j] = 0;
                }
                continue;
            }

            // Locals never participate in cross-object resolution
            if bind == STB_LOCAL {
                let gsym = add_symbol(ctx, Symbol {
                    name,
                    bind,
                    sym_type,
                    defined,
                    obj_idx: i,
                    sec_idx: shndx as usize,
                    sec_off: value,
                    size,
                    out_class: if defined && !is_abs { out_class } else { OutClass::None },
                    value: 0,
                    is_export: false,
                });
                ctx.objects[i].sym_map[j] = gsym as u32;
                continue;
            }

            // Global / weak: resolve against an existing entry
            if let Some(existing) = find_global(ctx, &name) {
                if defined {
                    let es = &ctx.symbols[existing];
                    if es.defined && bind == STB_GLOBAL && es.bind == STB_GLOBAL {
                        duplicates.push(format!(
                            "duplicate symbol '{}'\n  defined in: {}\n  also in:    {}",
                            name,
                            ctx.objects[es.obj_idx].name,
                            ctx.objects[i].name
                        ));
                        ctx.objects[i].sym_map[j] = existing as u32;
                        continue;
                    }
                    // New definition wins over a weak or undefined one
                    if !es.defined || es.bind == STB_WEAK {
                        let es = &mut ctx.symbols[existing];
                        es.defined = true;
                        es.bind = bind;
                        es.sym_type = sym_type;
                        es.obj_idx = i;
                        es.sec_idx = shndx as usize;
                        es.sec_off = value;
                        es.size = size;
                        es.out_class = out_class;
                    }
                }
                ctx.objects[i].sym_map[j] = existing as u32;
            } else {
                let gsym = add_symbol(ctx, Symbol {
                    name,
                    bind,
                    sym_type,
                    defined,
                    obj_idx: i,
                    sec_idx: shndx as usize,
                    sec_off: value,
                    size,
                    out_class: if defined && !is_abs { out_class } else { OutClass::None },
                    value: 0,
                    is_export: false,
                });
                ctx.objects[i].sym_map[j] = gsym as u32;
            }
        }
    }

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(duplicates.join("\n"))
    }
}

/// Verify that every strong undefined reference found a definition. Weak
/// undefined symbols are fine; they resolve to address 0. All missing names
/// are reported in one error.
pub fn resolve_symbols(ctx: &LinkContext) -> Result<(), String> {
    let missing: Vec<&str> = ctx
        .symbols
        .iter()
        .filter(|s| !s.defined && s.bind == STB_GLOBAL && !s.name.is_empty())
        .map(|s| s.name.as_str())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing
            .iter()
            .map(|n| format!("undefined symbol '{}'", n))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// Flag the symbols that go into the dynamic symbol table. With an explicit
/// export list only the named symbols are flagged, and a name that never
/// resolved to a definition gets a warning. Without one, every defined
/// non-section global is exported.
pub fn mark_exports(ctx: &mut LinkContext) {
    if ctx.exports.is_empty() {
        for s in ctx.symbols.iter_mut() {
            if s.defined && s.bind == STB_GLOBAL && s.sym_type != STT_SECTION && !s.name.is_empty() {
                s.is_export = true;
            }
        }
        return;
    }

    let exports = std::mem::take(&mut ctx.exports);
    for name in &exports {
        let mut found = false;
        for s in ctx.symbols.iter_mut() {
            if s.bind != STB_LOCAL && s.defined && s.name == *name {
                s.is_export = true;
                found = true;
                break;
            }
        }
        if !found {
            eprintln!("solink: warning: exported symbol '{}' not defined", name);
        }
    }
    ctx.exports = exports;
}

//! solink — a minimal ELF64 shared-object linker.
//!
//! Consumes relocatable objects (`.o`) and System-V `ar` archives (`.a`) and
//! produces an `ET_DYN` shared object with a dynamic symbol table, SysV hash
//! table and runtime rebase relocations. Supports x86-64 and AArch64 inputs;
//! GOT-relative accesses are relaxed to direct addressing since the output
//! carries no GOT or PLT.
//!
//! The pipeline is strictly sequential over one [`types::LinkContext`]:
//! load → merge → resolve → relocate → layout → write.

pub mod elf;
pub mod exports;
pub mod input;
pub mod layout;
pub mod merge;
pub mod output;
pub mod reloc;
pub mod symbols;
pub mod types;

#[cfg(test)]
pub(crate) mod testobj;

use types::LinkContext;

/// Everything the command line hands to a link.
pub struct LinkOptions {
    pub output_path: String,
    pub base_addr: u64,
    pub def_path: Option<String>,
    pub verbose: bool,
    pub inputs: Vec<String>,
}

/// Run a complete link. On error the output file is never created.
pub fn run_link(opts: &LinkOptions) -> Result<(), String> {
    let mut ctx = LinkContext::new(&opts.output_path, opts.base_addr);
    ctx.verbose = opts.verbose;

    if let Some(ref def_path) = opts.def_path {
        let (exports, lib_name) = exports::parse_def_file(def_path)?;
        ctx.exports = exports;
        ctx.lib_name = lib_name;
        if ctx.verbose {
            println!("solink: {} explicit exports", ctx.exports.len());
        }
    }

    for path in &opts.inputs {
        input::load_input(&mut ctx, path)?;
    }
    if ctx.objects.is_empty() {
        return Err("no input objects".to_string());
    }
    if ctx.verbose {
        println!("solink: {} objects loaded", ctx.objects.len());
    }

    merge::merge_sections(&mut ctx);
    if ctx.verbose {
        println!("solink: merged sections:");
        println!("  .text:   {} bytes", ctx.text.len());
        println!("  .rodata: {} bytes", ctx.rodata.len());
        println!("  .data:   {} bytes", ctx.data.len());
        println!("  .bss:    {} bytes", ctx.bss_size);
    }

    symbols::collect_symbols(&mut ctx)?;
    if ctx.verbose {
        println!("solink: {} global symbols", ctx.symbols.len());
    }
    symbols::resolve_symbols(&ctx)?;
    symbols::mark_exports(&mut ctx);

    layout::compute_layout(&mut ctx);
    reloc::apply_relocations(&mut ctx)?;
    if ctx.verbose {
        println!("solink: {} relocations applied", ctx.relocs.len());
    }

    output::write_output(&ctx)
}

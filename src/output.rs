//! ELF64 ET_DYN output generation.
//!
//! File layout:
//!
//! ```text
//!   File Offset    Virtual Address     Content
//!   ─────────────────────────────────────────────────────
//!   0x0000         base+0x0000         ELF header + PHDRs
//!   0x00E8+        base+0x00E8+        .dynsym, .dynstr, .hash, .rela.dyn
//!   pad to 0x1000  base+0x1000         .text
//!   after text                         .rodata (16-byte aligned)
//!   pad to page    base+N*0x1000       .data
//!   after data                         .dynamic
//!                                      .bss (memsz only)
//!   after loaded   (not loaded)        Section Header Table
//!                                      .shstrtab
//! ```
//!
//! The whole image is rendered into one byte buffer and written with a single
//! filesystem call, so a failed link never leaves a partial file behind.

use crate::elf::*;
use crate::types::{align_up, LinkContext, OutClass};

// Section indices in the output ELF
const SHIDX_TEXT: u16 = 1;
const SHIDX_RODATA: u16 = 2;
const SHIDX_DATA: u16 = 3;
const SHIDX_BSS: u16 = 4;
const SHIDX_DYNSYM: u32 = 5;
const SHIDX_DYNSTR: u32 = 6;
const SHIDX_SHSTRTAB: u16 = 10;
const NUM_SECTIONS: usize = 11;

const NUM_PHDRS: usize = 3; // PT_LOAD (RX), PT_LOAD (RW), PT_DYNAMIC

/// Upper bound on dynamic-array entries, used to place `.bss` before the
/// real array is built. Must stay consistent between layout and rendering.
const DYN_MAX_ENTRIES: u64 = 11;

/// File offsets shared between the layout pass and the final rendering.
/// Both must agree exactly or patched addresses would be wrong.
pub(crate) struct FileLayout {
    pub dynsym_off: u64,
    pub dynstr_off: u64,
    pub hash_off: u64,
    pub reladyn_off: u64,
    pub text_off: u64,
    pub rodata_off: u64,
    pub rx_end: u64,
    pub data_off: u64,
    pub dyn_off: u64,
    /// Page after the estimated end of the RW file content.
    pub bss_off: u64,
}

pub(crate) fn file_layout(ctx: &LinkContext, dynsym_size: u64, dynstr_size: u64, hash_size: u64) -> FileLayout {
    let meta_off = (EHDR_SIZE + NUM_PHDRS * PHDR_SIZE) as u64;

    let dynsym_off = align_up(meta_off, 8);
    let dynstr_off = dynsym_off + dynsym_size;
    let hash_off = align_up(dynstr_off + dynstr_size, 4);
    let reladyn_off = align_up(hash_off + hash_size, 8);
    let meta_end = reladyn_off + ctx.rela_dyn.len() as u64;

    let text_off = page_align(meta_end);
    let rodata_off = align_up(text_off + ctx.text.len() as u64, 16);
    let rx_end = rodata_off + ctx.rodata.len() as u64;

    let data_off = page_align(rx_end);
    let dyn_off = align_up(data_off + ctx.data.len() as u64, 8);
    let bss_off = page_align(dyn_off + DYN_MAX_ENTRIES * DYN_SIZE as u64);

    FileLayout {
        dynsym_off,
        dynstr_off,
        hash_off,
        reladyn_off,
        text_off,
        rodata_off,
        rx_end,
        data_off,
        dyn_off,
        bss_off,
    }
}

// ── Dynamic table builders ───────────────────────────────────────────────────

/// Build `.dynsym` and `.dynstr` from the exported symbols. Entry 0 is the
/// null symbol; when a library name is set it is the first string in
/// `.dynstr` (offset 1) so `DT_SONAME` can point at it. Returns the two
/// buffers plus the symbol count.
pub(crate) fn build_dynsym(ctx: &LinkContext) -> (Vec<u8>, Vec<u8>, usize) {
    let mut dynsym = vec![0u8; SYM_SIZE];
    let mut dynstr = vec![0u8];
    let mut count = 1;

    if let Some(ref name) = ctx.lib_name {
        if !name.is_empty() {
            dynstr.extend_from_slice(name.as_bytes());
            dynstr.push(0);
        }
    }

    for s in &ctx.symbols {
        if !s.is_export || !s.defined {
            continue;
        }

        let shndx = match s.out_class {
            OutClass::Text => SHIDX_TEXT,
            OutClass::Rodata => SHIDX_RODATA,
            OutClass::Data => SHIDX_DATA,
            OutClass::Bss => SHIDX_BSS,
            OutClass::None => SHN_ABS,
        };

        dynsym.extend_from_slice(&(dynstr.len() as u32).to_le_bytes());
        dynsym.push(st_info(STB_GLOBAL, s.sym_type));
        dynsym.push(STV_DEFAULT);
        dynsym.extend_from_slice(&shndx.to_le_bytes());
        dynsym.extend_from_slice(&s.value.to_le_bytes());
        dynsym.extend_from_slice(&s.size.to_le_bytes());

        dynstr.extend_from_slice(s.name.as_bytes());
        dynstr.push(0);
        count += 1;
    }

    (dynsym, dynstr, count)
}

/// Build the classic two-array `.hash` table over the dynamic symbols:
/// `[nbuckets][nchain][buckets...][chains...]`. The bucket count is kept odd
/// and near the symbol count.
pub(crate) fn build_hash(dynsym: &[u8], dynstr: &[u8]) -> Vec<u8> {
    let nchain = (dynsym.len() / SYM_SIZE) as u32;
    let nbuckets: u32 = if nchain < 4 { 3 } else { nchain | 1 };

    let mut buckets = vec![0u32; nbuckets as usize];
    let mut chains = vec![0u32; nchain as usize];

    for i in 1..nchain {
        let name_off = read_u32(dynsym, i as usize * SYM_SIZE) as usize;
        let name = read_cstr(dynstr, name_off);
        let h = elf_hash(&name) % nbuckets;
        chains[i as usize] = buckets[h as usize];
        buckets[h as usize] = i;
    }

    let mut out = Vec::with_capacity(8 + 4 * (nbuckets + nchain) as usize);
    out.extend_from_slice(&nbuckets.to_le_bytes());
    out.extend_from_slice(&nchain.to_le_bytes());
    for b in &buckets {
        out.extend_from_slice(&b.to_le_bytes());
    }
    for c in &chains {
        out.extend_from_slice(&c.to_le_bytes());
    }
    out
}

fn push_dyn(buf: &mut Vec<u8>, tag: i64, val: u64) {
    buf.extend_from_slice(&tag.to_le_bytes());
    buf.extend_from_slice(&val.to_le_bytes());
}

/// Build the `.dynamic` array: table pointers and sizes, the optional fixup
/// table triple, the optional soname, and the null terminator.
pub(crate) fn build_dynamic(
    ctx: &LinkContext,
    dynsym_vaddr: u64,
    dynstr_vaddr: u64,
    dynstr_size: u64,
    hash_vaddr: u64,
    rela_vaddr: u64,
) -> Vec<u8> {
    let mut buf = Vec::new();

    push_dyn(&mut buf, DT_HASH, hash_vaddr);
    push_dyn(&mut buf, DT_STRTAB, dynstr_vaddr);
    push_dyn(&mut buf, DT_SYMTAB, dynsym_vaddr);
    push_dyn(&mut buf, DT_STRSZ, dynstr_size);
    push_dyn(&mut buf, DT_SYMENT, SYM_SIZE as u64);

    if ctx.nrela_dyn > 0 {
        push_dyn(&mut buf, DT_RELA, rela_vaddr);
        push_dyn(&mut buf, DT_RELASZ, ctx.rela_dyn.len() as u64);
        push_dyn(&mut buf, DT_RELAENT, RELA_SIZE as u64);
        push_dyn(&mut buf, DT_RELACOUNT, ctx.nrela_dyn as u64);
    }

    if ctx.lib_name.as_deref().map_or(false, |n| !n.is_empty()) {
        // The soname is the first string in .dynstr, right after the NUL
        push_dyn(&mut buf, DT_SONAME, 1);
    }

    push_dyn(&mut buf, DT_NULL, 0);
    buf
}

// ── Rendering ────────────────────────────────────────────────────────────────

struct ShstrOffsets {
    text: u32,
    rodata: u32,
    data: u32,
    bss: u32,
    dynsym: u32,
    dynstr: u32,
    hash: u32,
    reladyn: u32,
    dynamic: u32,
    shstrtab: u32,
}

fn build_shstrtab() -> (Vec<u8>, ShstrOffsets) {
    let mut tab = vec![0u8];
    let mut add = |name: &str| -> u32 {
        let off = tab.len() as u32;
        tab.extend_from_slice(name.as_bytes());
        tab.push(0);
        off
    };
    let offs = ShstrOffsets {
        text: add(".text"),
        rodata: add(".rodata"),
        data: add(".data"),
        bss: add(".bss"),
        dynsym: add(".dynsym"),
        dynstr: add(".dynstr"),
        hash: add(".hash"),
        reladyn: add(".rela.dyn"),
        dynamic: add(".dynamic"),
        shstrtab: add(".shstrtab"),
    };
    (tab, offs)
}

fn pad_to(out: &mut Vec<u8>, target: u64) {
    if (out.len() as u64) < target {
        out.resize(target as usize, 0);
    }
}

#[allow(clippy::too_many_arguments)]
fn push_phdr(out: &mut Vec<u8>, p_type: u32, flags: u32, offset: u64, vaddr: u64, filesz: u64, memsz: u64, align: u64) {
    out.extend_from_slice(&p_type.to_le_bytes());
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&offset.to_le_bytes());
    out.extend_from_slice(&vaddr.to_le_bytes());
    out.extend_from_slice(&vaddr.to_le_bytes()); // p_paddr
    out.extend_from_slice(&filesz.to_le_bytes());
    out.extend_from_slice(&memsz.to_le_bytes());
    out.extend_from_slice(&align.to_le_bytes());
}

#[allow(clippy::too_many_arguments)]
fn push_shdr(
    out: &mut Vec<u8>,
    name: u32,
    sh_type: u32,
    flags: u64,
    addr: u64,
    offset: u64,
    size: u64,
    link: u32,
    info: u32,
    align: u64,
    entsize: u64,
) {
    out.extend_from_slice(&name.to_le_bytes());
    out.extend_from_slice(&sh_type.to_le_bytes());
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&addr.to_le_bytes());
    out.extend_from_slice(&offset.to_le_bytes());
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(&link.to_le_bytes());
    out.extend_from_slice(&info.to_le_bytes());
    out.extend_from_slice(&align.to_le_bytes());
    out.extend_from_slice(&entsize.to_le_bytes());
}

/// Render the complete shared object into one byte buffer. Returns the image
/// and the exported-symbol count for the statistics report.
fn render_output(ctx: &LinkContext) -> (Vec<u8>, usize) {
    let base = ctx.base_addr;

    let (dynsym, dynstr, dynsym_count) = build_dynsym(ctx);
    let hash = build_hash(&dynsym, &dynstr);
    let fl = file_layout(ctx, dynsym.len() as u64, dynstr.len() as u64, hash.len() as u64);

    let dynamic = build_dynamic(
        ctx,
        base + fl.dynsym_off,
        base + fl.dynstr_off,
        dynstr.len() as u64,
        base + fl.hash_off,
        base + fl.reladyn_off,
    );

    let rw_file_end = fl.dyn_off + dynamic.len() as u64;
    let sht_off = align_up(rw_file_end, 8);
    let shstrtab_file_off = sht_off + (NUM_SECTIONS * SHDR_SIZE) as u64;
    let (shstrtab, so) = build_shstrtab();

    let mut out = Vec::with_capacity(shstrtab_file_off as usize + shstrtab.len());

    // ELF header
    out.extend_from_slice(&ELF_MAGIC);
    out.push(ELFCLASS64);
    out.push(ELFDATA2LSB);
    out.push(EV_CURRENT);
    out.push(ELFOSABI_NONE);
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&ET_DYN.to_le_bytes());
    out.extend_from_slice(&ctx.e_machine.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes()); // e_version
    out.extend_from_slice(&0u64.to_le_bytes()); // e_entry: none for a library
    out.extend_from_slice(&(EHDR_SIZE as u64).to_le_bytes()); // e_phoff
    out.extend_from_slice(&sht_off.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // e_flags
    out.extend_from_slice(&(EHDR_SIZE as u16).to_le_bytes());
    out.extend_from_slice(&(PHDR_SIZE as u16).to_le_bytes());
    out.extend_from_slice(&(NUM_PHDRS as u16).to_le_bytes());
    out.extend_from_slice(&(SHDR_SIZE as u16).to_le_bytes());
    out.extend_from_slice(&(NUM_SECTIONS as u16).to_le_bytes());
    out.extend_from_slice(&SHIDX_SHSTRTAB.to_le_bytes());

    // Program headers: RX load, RW load, dynamic
    push_phdr(&mut out, PT_LOAD, PF_R | PF_X, 0, base, fl.rx_end, fl.rx_end, PAGE_SIZE);
    push_phdr(
        &mut out,
        PT_LOAD,
        PF_R | PF_W,
        fl.data_off,
        base + fl.data_off,
        rw_file_end - fl.data_off,
        (fl.bss_off + ctx.bss_size) - fl.data_off,
        PAGE_SIZE,
    );
    push_phdr(
        &mut out,
        PT_DYNAMIC,
        PF_R | PF_W,
        fl.dyn_off,
        base + fl.dyn_off,
        dynamic.len() as u64,
        dynamic.len() as u64,
        8,
    );

    // Metadata tables, then the loaded content
    pad_to(&mut out, fl.dynsym_off);
    out.extend_from_slice(&dynsym);
    pad_to(&mut out, fl.dynstr_off);
    out.extend_from_slice(&dynstr);
    pad_to(&mut out, fl.hash_off);
    out.extend_from_slice(&hash);
    pad_to(&mut out, fl.reladyn_off);
    out.extend_from_slice(&ctx.rela_dyn);

    pad_to(&mut out, fl.text_off);
    out.extend_from_slice(&ctx.text);
    pad_to(&mut out, fl.rodata_off);
    out.extend_from_slice(&ctx.rodata);
    pad_to(&mut out, fl.data_off);
    out.extend_from_slice(&ctx.data);
    pad_to(&mut out, fl.dyn_off);
    out.extend_from_slice(&dynamic);

    // Section header table (not loaded), for tooling
    pad_to(&mut out, sht_off);
    push_shdr(&mut out, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0);
    push_shdr(
        &mut out, so.text, SHT_PROGBITS, SHF_ALLOC | SHF_EXECINSTR,
        ctx.layout.text_vaddr, fl.text_off, ctx.text.len() as u64, 0, 0, 16, 0,
    );
    push_shdr(
        &mut out, so.rodata, SHT_PROGBITS, SHF_ALLOC,
        ctx.layout.rodata_vaddr, fl.rodata_off, ctx.rodata.len() as u64, 0, 0, 16, 0,
    );
    push_shdr(
        &mut out, so.data, SHT_PROGBITS, SHF_ALLOC | SHF_WRITE,
        ctx.layout.data_vaddr, fl.data_off, ctx.data.len() as u64, 0, 0, 8, 0,
    );
    push_shdr(
        &mut out, so.bss, SHT_NOBITS, SHF_ALLOC | SHF_WRITE,
        ctx.layout.bss_vaddr, rw_file_end, ctx.bss_size, 0, 0,
        if ctx.bss_align > 0 { ctx.bss_align } else { 8 }, 0,
    );
    push_shdr(
        &mut out, so.dynsym, SHT_DYNSYM, SHF_ALLOC,
        base + fl.dynsym_off, fl.dynsym_off, dynsym.len() as u64,
        SHIDX_DYNSTR, 1, 8, SYM_SIZE as u64,
    );
    push_shdr(
        &mut out, so.dynstr, SHT_STRTAB, SHF_ALLOC,
        base + fl.dynstr_off, fl.dynstr_off, dynstr.len() as u64, 0, 0, 1, 0,
    );
    push_shdr(
        &mut out, so.hash, SHT_HASH, SHF_ALLOC,
        base + fl.hash_off, fl.hash_off, hash.len() as u64, SHIDX_DYNSYM, 0, 4, 4,
    );
    push_shdr(
        &mut out, so.reladyn, SHT_RELA, SHF_ALLOC,
        base + fl.reladyn_off, fl.reladyn_off, ctx.rela_dyn.len() as u64,
        SHIDX_DYNSYM, 0, 8, RELA_SIZE as u64,
    );
    push_shdr(
        &mut out, so.dynamic, SHT_DYNAMIC, SHF_ALLOC | SHF_WRITE,
        ctx.layout.dynamic_vaddr, fl.dyn_off, dynamic.len() as u64,
        SHIDX_DYNSTR, 0, 8, DYN_SIZE as u64,
    );
    push_shdr(
        &mut out, so.shstrtab, SHT_STRTAB, 0, 0, shstrtab_file_off,
        shstrtab.len() as u64, 0, 0, 1, 0,
    );

    out.extend_from_slice(&shstrtab);
    (out, dynsym_count - 1)
}

/// Render the shared object and write it in one shot.
pub fn write_output(ctx: &LinkContext) -> Result<(), String> {
    let (image, nexports) = render_output(ctx);
    std::fs::write(&ctx.output_path, &image)
        .map_err(|e| format!("cannot create '{}': {}", ctx.output_path, e))?;

    if ctx.verbose {
        println!("solink: '{}' created", ctx.output_path);
        println!("  base:     0x{:x}", ctx.base_addr);
        println!("  .text:    {} bytes at 0x{:x}", ctx.text.len(), ctx.layout.text_vaddr);
        println!("  .rodata:  {} bytes at 0x{:x}", ctx.rodata.len(), ctx.layout.rodata_vaddr);
        println!("  .data:    {} bytes at 0x{:x}", ctx.data.len(), ctx.layout.data_vaddr);
        println!("  .bss:     {} bytes at 0x{:x}", ctx.bss_size, ctx.layout.bss_vaddr);
        println!("  exports:  {} symbols", nexports);
        if ctx.nrela_dyn > 0 {
            println!("  relocs:   {} relative entries", ctx.nrela_dyn);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::parse_object;
    use crate::layout::compute_layout;
    use crate::merge::merge_sections;
    use crate::reloc::apply_relocations;
    use crate::symbols::{collect_symbols, mark_exports, resolve_symbols};
    use crate::testobj::{ObjBuilder, TestSection, TestSym};

    fn linked_ctx() -> LinkContext {
        let a = ObjBuilder::new(EM_X86_64)
            .section(TestSection::progbits(".text", SHF_ALLOC | SHF_EXECINSTR, vec![0xc3; 8], 16))
            .symbol(TestSym::global_func("alpha", 1, 0, 4))
            .symbol(TestSym::global_func("beta", 1, 4, 4))
            .section(TestSection::progbits(".data", SHF_ALLOC | SHF_WRITE, vec![1, 2, 3, 4], 4))
            .section(TestSection::nobits(".bss", 16, 8))
            .build();

        let mut ctx = LinkContext::new("out.so", 0x0400_0000);
        parse_object(&mut ctx, "a.o", a).unwrap();
        merge_sections(&mut ctx);
        collect_symbols(&mut ctx).unwrap();
        resolve_symbols(&ctx).unwrap();
        mark_exports(&mut ctx);
        compute_layout(&mut ctx);
        apply_relocations(&mut ctx).unwrap();
        ctx
    }

    #[test]
    fn test_dynsym_null_entry_plus_exports() {
        let ctx = linked_ctx();
        let (dynsym, dynstr, count) = build_dynsym(&ctx);
        assert_eq!(count, 3);
        assert_eq!(dynsym.len(), 3 * SYM_SIZE);
        assert_eq!(&dynsym[..SYM_SIZE], &[0u8; SYM_SIZE]);
        // Both names present in .dynstr
        let names = String::from_utf8_lossy(&dynstr);
        assert!(names.contains("alpha"));
        assert!(names.contains("beta"));
    }

    #[test]
    fn test_hash_bucket_count_is_odd() {
        for nsyms in [1usize, 2, 3, 4, 5, 6, 10, 17] {
            let dynsym = vec![0u8; nsyms * SYM_SIZE];
            let dynstr = vec![0u8];
            let hash = build_hash(&dynsym, &dynstr);
            let nbuckets = read_u32(&hash, 0);
            let nchain = read_u32(&hash, 4);
            assert_eq!(nbuckets % 2, 1, "nsyms={}", nsyms);
            assert_eq!(nchain as usize, nsyms);
            assert_eq!(hash.len(), 8 + 4 * (nbuckets as usize + nsyms));
        }
    }

    #[test]
    fn test_hash_lookup_finds_every_export() {
        let ctx = linked_ctx();
        let (dynsym, dynstr, count) = build_dynsym(&ctx);
        let hash = build_hash(&dynsym, &dynstr);
        let nbuckets = read_u32(&hash, 0);

        for i in 1..count {
            let name_off = read_u32(&dynsym, i * SYM_SIZE) as usize;
            let name = read_cstr(&dynstr, name_off);
            let h = elf_hash(&name) % nbuckets;
            // Walk the chain from the bucket until we hit symbol i
            let mut cur = read_u32(&hash, 8 + 4 * h as usize);
            let mut found = false;
            while cur != 0 {
                if cur as usize == i {
                    found = true;
                    break;
                }
                cur = read_u32(&hash, 8 + 4 * nbuckets as usize + 4 * cur as usize);
            }
            assert!(found, "symbol '{}' not reachable through .hash", name);
        }
    }

    #[test]
    fn test_dynamic_terminated_and_soname_optional() {
        let mut ctx = linked_ctx();
        let dynamic = build_dynamic(&ctx, 0x100, 0x200, 0x40, 0x300, 0x400);
        let tags: Vec<i64> = (0..dynamic.len() / DYN_SIZE)
            .map(|i| read_i64(&dynamic, i * DYN_SIZE))
            .collect();
        assert_eq!(*tags.last().unwrap(), DT_NULL);
        assert!(!tags.contains(&DT_SONAME));

        ctx.lib_name = Some("libdemo.so".to_string());
        let dynamic = build_dynamic(&ctx, 0x100, 0x200, 0x40, 0x300, 0x400);
        let tags: Vec<i64> = (0..dynamic.len() / DYN_SIZE)
            .map(|i| read_i64(&dynamic, i * DYN_SIZE))
            .collect();
        assert!(tags.contains(&DT_SONAME));
    }

    #[test]
    fn test_soname_is_first_dynstr_entry() {
        let mut ctx = linked_ctx();
        ctx.lib_name = Some("libdemo.so".to_string());
        let (_, dynstr, _) = build_dynsym(&ctx);
        assert_eq!(read_cstr(&dynstr, 1), "libdemo.so");
    }

    #[test]
    fn test_rendered_header_fields() {
        let ctx = linked_ctx();
        let (image, _) = render_output(&ctx);

        assert_eq!(&image[..4], &ELF_MAGIC);
        assert_eq!(image[4], ELFCLASS64);
        assert_eq!(read_u16(&image, 16), ET_DYN);
        assert_eq!(read_u16(&image, 18), EM_X86_64);
        assert_eq!(read_u16(&image, 56), NUM_PHDRS as u16);
        assert_eq!(read_u16(&image, 60), NUM_SECTIONS as u16);
        assert_eq!(read_u16(&image, 62), SHIDX_SHSTRTAB);

        // .text content lands at its file offset
        let fl = {
            let (dynsym, dynstr, _) = build_dynsym(&ctx);
            let hash = build_hash(&dynsym, &dynstr);
            file_layout(&ctx, dynsym.len() as u64, dynstr.len() as u64, hash.len() as u64)
        };
        assert_eq!(&image[fl.text_off as usize..fl.text_off as usize + 8], &ctx.text[..]);
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let ctx = linked_ctx();
        let (first, _) = render_output(&ctx);
        let (second, _) = render_output(&ctx);
        assert_eq!(first, second);
    }

    #[test]
    fn test_text_starts_on_page_boundary() {
        let ctx = linked_ctx();
        let (dynsym, dynstr, _) = build_dynsym(&ctx);
        let hash = build_hash(&dynsym, &dynstr);
        let fl = file_layout(&ctx, dynsym.len() as u64, dynstr.len() as u64, hash.len() as u64);
        assert_eq!(fl.text_off % PAGE_SIZE, 0);
        assert_eq!(fl.data_off % PAGE_SIZE, 0);
        assert!(fl.rodata_off % 16 == 0);
        assert!(fl.dyn_off % 8 == 0);
    }
}

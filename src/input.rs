//! Input loading: ELF64 relocatable objects and `ar` static archives.
//!
//! Objects are validated (magic, class, endianness, type, machine) and parsed
//! into [`InputObject`] values that own their byte buffers. Archive members
//! are copied into independent buffers before parsing so the archive's own
//! buffer can be dropped once scanning finishes.

use crate::elf::*;
use crate::types::{ElfSym, InputObject, LinkContext, SecMap, SectionHeader};

/// Parse one ELF64 relocatable object and append it to the context.
///
/// The first object loaded fixes the expected machine for the whole link;
/// any later object with a different `e_machine` is rejected.
pub fn parse_object(ctx: &mut LinkContext, name: &str, data: Vec<u8>) -> Result<(), String> {
    if data.len() < EHDR_SIZE {
        return Err(format!("{}: too small for ELF header", name));
    }
    if data[0..4] != ELF_MAGIC {
        return Err(format!("{}: not an ELF file", name));
    }
    if data[4] != ELFCLASS64 {
        return Err(format!("{}: not ELF64 (class={})", name, data[4]));
    }
    if data[5] != ELFDATA2LSB {
        return Err(format!("{}: not little-endian", name));
    }
    let e_type = read_u16(&data, 16);
    if e_type != ET_REL {
        return Err(format!("{}: not a relocatable object (type={})", name, e_type));
    }
    let e_machine = read_u16(&data, 18);
    if e_machine != EM_X86_64 && e_machine != EM_AARCH64 {
        return Err(format!("{}: unsupported architecture (machine={})", name, e_machine));
    }
    if ctx.objects.is_empty() {
        ctx.e_machine = e_machine;
    } else if ctx.e_machine != e_machine {
        return Err(format!(
            "{}: architecture mismatch (machine={}, expected={})",
            name, e_machine, ctx.e_machine
        ));
    }

    let e_shoff = read_u64(&data, 40) as usize;
    let e_shentsize = read_u16(&data, 58) as usize;
    let e_shnum = read_u16(&data, 60) as usize;
    let e_shstrndx = read_u16(&data, 62) as usize;

    if e_shoff == 0 || e_shnum == 0 {
        return Err(format!("{}: no section headers", name));
    }
    if e_shentsize < SHDR_SIZE {
        return Err(format!("{}: bad section header entry size {}", name, e_shentsize));
    }

    // Section headers (names resolved below once shstrtab is known)
    let mut shdrs = Vec::with_capacity(e_shnum);
    for i in 0..e_shnum {
        let off = e_shoff + i * e_shentsize;
        if off + SHDR_SIZE > data.len() {
            return Err(format!("{}: section header {} out of bounds", name, i));
        }
        shdrs.push(SectionHeader {
            name: String::new(),
            sh_type: read_u32(&data, off + 4),
            flags: read_u64(&data, off + 8),
            offset: read_u64(&data, off + 24),
            size: read_u64(&data, off + 32),
            link: read_u32(&data, off + 40),
            info: read_u32(&data, off + 44),
            addralign: read_u64(&data, off + 48),
            entsize: read_u64(&data, off + 56),
        });
    }

    // Validate each section's data range up front; later stages slice
    // `data[offset..offset+size]` without re-checking, including for
    // zero-size sections.
    for (i, sh) in shdrs.iter().enumerate() {
        if sh.sh_type != SHT_NOBITS {
            let end = sh.offset.checked_add(sh.size).unwrap_or(u64::MAX);
            if end > data.len() as u64 {
                return Err(format!("{}: section {} data out of bounds", name, i));
            }
        }
    }

    // Resolve section names from the section-name string table
    if e_shstrndx < shdrs.len() {
        let str_off = shdrs[e_shstrndx].offset as usize;
        let str_size = shdrs[e_shstrndx].size as usize;
        if str_off + str_size <= data.len() {
            let shstrtab = &data[str_off..str_off + str_size];
            let name_idxs: Vec<u32> = (0..e_shnum)
                .map(|i| read_u32(&data, e_shoff + i * e_shentsize))
                .collect();
            for (sh, &nidx) in shdrs.iter_mut().zip(&name_idxs) {
                sh.name = read_cstr(shstrtab, nidx as usize);
            }
        }
    }

    // Locate the symbol table and its linked string table (one per object)
    let mut symtab = Vec::new();
    for sh in &shdrs {
        if sh.sh_type != SHT_SYMTAB {
            continue;
        }
        let strtab: &[u8] = if (sh.link as usize) < shdrs.len() {
            let st = &shdrs[sh.link as usize];
            let (o, s) = (st.offset as usize, st.size as usize);
            if o + s <= data.len() { &data[o..o + s] } else { &[] }
        } else {
            &[]
        };

        let sym_off = sh.offset as usize;
        let sym_count = (sh.size as usize) / SYM_SIZE;
        for j in 0..sym_count {
            let off = sym_off + j * SYM_SIZE;
            if off + SYM_SIZE > data.len() {
                return Err(format!("{}: symbol table truncated", name));
            }
            let name_idx = read_u32(&data, off);
            symtab.push(ElfSym {
                name: read_cstr(strtab, name_idx as usize),
                info: data[off + 4],
                shndx: read_u16(&data, off + 6),
                value: read_u64(&data, off + 8),
                size: read_u64(&data, off + 16),
            });
        }
        break;
    }

    let nshdr = shdrs.len();
    let nsym = symtab.len();
    ctx.objects.push(InputObject {
        name: name.to_string(),
        data,
        shdrs,
        symtab,
        sec_map: vec![SecMap::default(); nshdr],
        sym_map: vec![0; nsym.max(1)],
    });
    Ok(())
}

/// Read one object file from disk into the context.
pub fn read_object_file(ctx: &mut LinkContext, path: &str) -> Result<(), String> {
    let data = std::fs::read(path).map_err(|e| format!("cannot read '{}': {}", path, e))?;
    parse_object(ctx, path, data)
}

/// Load one command-line input, sniffing archive vs object by content
/// rather than by file extension.
pub fn load_input(ctx: &mut LinkContext, path: &str) -> Result<(), String> {
    let data = std::fs::read(path).map_err(|e| format!("cannot read '{}': {}", path, e))?;
    if is_archive(&data) {
        read_archive(ctx, path)
    } else if is_elf_object(&data) {
        parse_object(ctx, path, data)
    } else {
        Err(format!("'{}': unrecognized file format", path))
    }
}

/// Parse a space-padded ASCII decimal field from an `ar` member header.
fn parse_ar_decimal(field: &[u8]) -> Option<usize> {
    std::str::from_utf8(field).ok()?.trim().parse().ok()
}

/// Read a System-V `ar` archive, parsing every ELF member as an independent
/// object named `archive(member)`.
///
/// Handles the GNU extended-filename member (`//`) and skips the symbol-index
/// member (`/`). Each ELF member's bytes are copied into a fresh buffer, so
/// the archive buffer itself is released when this function returns.
pub fn read_archive(ctx: &mut LinkContext, path: &str) -> Result<(), String> {
    let ar_data = std::fs::read(path).map_err(|e| format!("cannot read '{}': {}", path, e))?;

    if ar_data.len() < AR_MAGIC.len() || &ar_data[0..8] != AR_MAGIC {
        return Err(format!("{}: not an AR archive", path));
    }

    let mut long_names: Option<Vec<u8>> = None;
    let mut pos = AR_MAGIC.len();

    while pos + AR_HDR_SIZE <= ar_data.len() {
        let hdr = &ar_data[pos..pos + AR_HDR_SIZE];

        if hdr[58] != b'`' || hdr[59] != b'\n' {
            return Err(format!("{}: corrupt ar header at offset {}", path, pos));
        }

        let member_size = parse_ar_decimal(&hdr[48..58])
            .ok_or_else(|| format!("{}: bad member size at offset {}", path, pos))?;
        let name_field = &hdr[0..16];
        pos += AR_HDR_SIZE;

        if pos + member_size > ar_data.len() {
            return Err(format!("{}: truncated member at offset {}", path, pos));
        }
        let member_data = &ar_data[pos..pos + member_size];

        if name_field.starts_with(b"// ") {
            // GNU long filename table
            long_names = Some(member_data.to_vec());
        } else if name_field.starts_with(b"/ ") {
            // Archive symbol index — not needed
        } else {
            let member_name = decode_member_name(name_field, long_names.as_deref());

            // Only process ELF members; anything else is skipped
            if member_size >= 4 && member_data[0..4] == ELF_MAGIC {
                let full_name = format!("{}({})", path, member_name);
                // Private copy: the member must outlive the archive buffer
                parse_object(ctx, &full_name, member_data.to_vec())?;
            }
        }

        pos += member_size;
        if pos % 2 != 0 {
            pos += 1; // members are 2-byte aligned
        }
    }

    Ok(())
}

/// Decode an `ar` member name: either `/<offset>` into the long-name table,
/// or a short name terminated by `/`, space, or NUL.
fn decode_member_name(field: &[u8], long_names: Option<&[u8]>) -> String {
    if field[0] == b'/' && field[1].is_ascii_digit() {
        let off_str = String::from_utf8_lossy(&field[1..]);
        let off: usize = off_str.trim().parse().unwrap_or(0);
        if let Some(tab) = long_names {
            if off < tab.len() {
                let end = tab[off..]
                    .iter()
                    .position(|&b| b == b'/' || b == b'\n')
                    .unwrap_or(tab.len() - off);
                return String::from_utf8_lossy(&tab[off..off + end]).into_owned();
            }
        }
        return String::new();
    }
    let end = field
        .iter()
        .position(|&b| b == b'/' || b == b' ' || b == 0)
        .unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Content sniffing for the command-line loop.
pub fn is_archive(data: &[u8]) -> bool {
    data.len() >= 8 && &data[0..8] == AR_MAGIC
}

pub fn is_elf_object(data: &[u8]) -> bool {
    data.len() >= 4 && data[0..4] == ELF_MAGIC
}

//! Test-only builders for synthetic ELF64 relocatable objects and archives.
//!
//! Tests drive the linker with real byte buffers rather than mocked parse
//! results, so the loader's validation paths are exercised too. The builder
//! emits the minimum a relocatable object needs: a NULL section, the caller's
//! sections, `.symtab`/`.strtab`/`.shstrtab`, and one `.rela.*` section per
//! input section that carries relocations.

use crate::elf::*;

pub struct TestRela {
    pub offset: u64,
    pub rtype: u32,
    /// Symbol-table index (builder symbol `i` lands at symtab index `i + 1`).
    pub sym: u32,
    pub addend: i64,
}

pub struct TestSection {
    pub name: String,
    pub sh_type: u32,
    pub flags: u64,
    pub data: Vec<u8>,
    pub align: u64,
    pub relas: Vec<TestRela>,
}

impl TestSection {
    pub fn progbits(name: &str, flags: u64, data: Vec<u8>, align: u64) -> Self {
        TestSection {
            name: name.to_string(),
            sh_type: SHT_PROGBITS,
            flags,
            data,
            align,
            relas: Vec::new(),
        }
    }

    pub fn nobits(name: &str, size: u64, align: u64) -> Self {
        TestSection {
            name: name.to_string(),
            sh_type: SHT_NOBITS,
            flags: SHF_ALLOC | SHF_WRITE,
            data: vec![0; size as usize],
            align,
            relas: Vec::new(),
        }
    }

    pub fn rela(mut self, offset: u64, rtype: u32, sym: u32, addend: i64) -> Self {
        self.relas.push(TestRela { offset, rtype, sym, addend });
        self
    }
}

pub struct TestSym {
    pub name: String,
    pub info: u8,
    /// Final ELF section index: caller's section `i` (0-based) is index `i+1`.
    pub shndx: u16,
    pub value: u64,
    pub size: u64,
}

impl TestSym {
    pub fn global_func(name: &str, shndx: u16, value: u64, size: u64) -> Self {
        TestSym { name: name.to_string(), info: st_info(STB_GLOBAL, 2), shndx, value, size }
    }

    pub fn global_data(name: &str, shndx: u16, value: u64, size: u64) -> Self {
        TestSym { name: name.to_string(), info: st_info(STB_GLOBAL, 1), shndx, value, size }
    }

    pub fn weak_func(name: &str, shndx: u16, value: u64, size: u64) -> Self {
        TestSym { name: name.to_string(), info: st_info(STB_WEAK, 2), shndx, value, size }
    }

    pub fn local(name: &str, shndx: u16, value: u64, size: u64) -> Self {
        TestSym { name: name.to_string(), info: st_info(STB_LOCAL, 1), shndx, value, size }
    }

    pub fn undef(name: &str) -> Self {
        TestSym { name: name.to_string(), info: st_info(STB_GLOBAL, 0), shndx: SHN_UNDEF, value: 0, size: 0 }
    }

    pub fn weak_undef(name: &str) -> Self {
        TestSym { name: name.to_string(), info: st_info(STB_WEAK, 0), shndx: SHN_UNDEF, value: 0, size: 0 }
    }
}

pub struct ObjBuilder {
    machine: u16,
    sections: Vec<TestSection>,
    symbols: Vec<TestSym>,
}

impl ObjBuilder {
    pub fn new(machine: u16) -> Self {
        ObjBuilder { machine, sections: Vec::new(), symbols: Vec::new() }
    }

    pub fn section(mut self, sec: TestSection) -> Self {
        self.sections.push(sec);
        self
    }

    pub fn symbol(mut self, sym: TestSym) -> Self {
        self.symbols.push(sym);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let nuser = self.sections.len();

        // String tables
        let mut shstrtab = vec![0u8];
        let mut shname_offs = Vec::new();
        for sec in &self.sections {
            shname_offs.push(shstrtab.len() as u32);
            shstrtab.extend_from_slice(sec.name.as_bytes());
            shstrtab.push(0);
        }
        let add_name = |tab: &mut Vec<u8>, s: &str| -> u32 {
            let off = tab.len() as u32;
            tab.extend_from_slice(s.as_bytes());
            tab.push(0);
            off
        };
        let symtab_name = add_name(&mut shstrtab, ".symtab");
        let strtab_name = add_name(&mut shstrtab, ".strtab");
        let shstrtab_name = add_name(&mut shstrtab, ".shstrtab");
        let mut rela_names = Vec::new();
        for sec in &self.sections {
            if !sec.relas.is_empty() {
                rela_names.push(add_name(&mut shstrtab, &format!(".rela{}", sec.name)));
            }
        }

        let mut strtab = vec![0u8];
        let mut sym_name_offs = Vec::new();
        for sym in &self.symbols {
            sym_name_offs.push(strtab.len() as u32);
            strtab.extend_from_slice(sym.name.as_bytes());
            strtab.push(0);
        }

        // .symtab content: NULL entry + caller symbols
        let mut symtab = vec![0u8; SYM_SIZE];
        for (sym, &noff) in self.symbols.iter().zip(&sym_name_offs) {
            symtab.extend_from_slice(&noff.to_le_bytes());
            symtab.push(sym.info);
            symtab.push(0); // st_other
            symtab.extend_from_slice(&sym.shndx.to_le_bytes());
            symtab.extend_from_slice(&sym.value.to_le_bytes());
            symtab.extend_from_slice(&sym.size.to_le_bytes());
        }

        // .rela.* contents
        let mut rela_blobs = Vec::new();
        for sec in &self.sections {
            if sec.relas.is_empty() {
                continue;
            }
            let mut blob = Vec::new();
            for r in &sec.relas {
                blob.extend_from_slice(&r.offset.to_le_bytes());
                let info = ((r.sym as u64) << 32) | r.rtype as u64;
                blob.extend_from_slice(&info.to_le_bytes());
                blob.extend_from_slice(&r.addend.to_le_bytes());
            }
            rela_blobs.push(blob);
        }

        // File layout: ehdr, section bodies, then the section header table
        let mut body = Vec::new();
        let place = |body: &mut Vec<u8>, data: &[u8], align: u64, nobits: bool| -> (u64, u64) {
            let mut off = EHDR_SIZE as u64 + body.len() as u64;
            let a = align.max(1);
            let aligned = (off + a - 1) & !(a - 1);
            body.resize(body.len() + (aligned - off) as usize, 0);
            off = aligned;
            if !nobits {
                body.extend_from_slice(data);
            }
            (off, data.len() as u64)
        };

        let mut user_locs = Vec::new();
        for sec in &self.sections {
            user_locs.push(place(&mut body, &sec.data, sec.align, sec.sh_type == SHT_NOBITS));
        }
        let symtab_loc = place(&mut body, &symtab, 8, false);
        let strtab_loc = place(&mut body, &strtab, 1, false);
        let shstrtab_loc = place(&mut body, &shstrtab, 1, false);
        let mut rela_locs = Vec::new();
        for blob in &rela_blobs {
            rela_locs.push(place(&mut body, blob, 8, false));
        }

        let e_shoff = {
            let end = EHDR_SIZE as u64 + body.len() as u64;
            let aligned = (end + 7) & !7;
            body.resize(body.len() + (aligned - end) as usize, 0);
            aligned
        };

        let symtab_idx = (1 + nuser) as u32;
        let strtab_idx = symtab_idx + 1;
        let shstrtab_idx = strtab_idx + 1;
        let nrela = rela_blobs.len();
        let e_shnum = (1 + nuser + 3 + nrela) as u16;

        // Section header table
        let mut shdrs = Vec::new();
        let push_shdr = |shdrs: &mut Vec<u8>,
                             name: u32,
                             sh_type: u32,
                             flags: u64,
                             offset: u64,
                             size: u64,
                             link: u32,
                             info: u32,
                             align: u64,
                             entsize: u64| {
            shdrs.extend_from_slice(&name.to_le_bytes());
            shdrs.extend_from_slice(&sh_type.to_le_bytes());
            shdrs.extend_from_slice(&flags.to_le_bytes());
            shdrs.extend_from_slice(&0u64.to_le_bytes()); // sh_addr
            shdrs.extend_from_slice(&offset.to_le_bytes());
            shdrs.extend_from_slice(&size.to_le_bytes());
            shdrs.extend_from_slice(&link.to_le_bytes());
            shdrs.extend_from_slice(&info.to_le_bytes());
            shdrs.extend_from_slice(&align.to_le_bytes());
            shdrs.extend_from_slice(&entsize.to_le_bytes());
        };

        push_shdr(&mut shdrs, 0, 0, 0, 0, 0, 0, 0, 0, 0); // NULL
        for (i, sec) in self.sections.iter().enumerate() {
            let (off, _) = user_locs[i];
            push_shdr(
                &mut shdrs, shname_offs[i], sec.sh_type, sec.flags, off,
                sec.data.len() as u64, 0, 0, sec.align, 0,
            );
        }
        push_shdr(
            &mut shdrs, symtab_name, SHT_SYMTAB, 0, symtab_loc.0, symtab_loc.1,
            strtab_idx, 1, 8, SYM_SIZE as u64,
        );
        push_shdr(&mut shdrs, strtab_name, SHT_STRTAB, 0, strtab_loc.0, strtab_loc.1, 0, 0, 1, 0);
        push_shdr(&mut shdrs, shstrtab_name, SHT_STRTAB, 0, shstrtab_loc.0, shstrtab_loc.1, 0, 0, 1, 0);
        let mut rela_i = 0;
        for (i, sec) in self.sections.iter().enumerate() {
            if sec.relas.is_empty() {
                continue;
            }
            push_shdr(
                &mut shdrs, rela_names[rela_i], SHT_RELA, 0,
                rela_locs[rela_i].0, rela_locs[rela_i].1,
                symtab_idx, (i + 1) as u32, 8, RELA_SIZE as u64,
            );
            rela_i += 1;
        }

        // ELF header
        let mut out = Vec::new();
        out.extend_from_slice(&ELF_MAGIC);
        out.push(ELFCLASS64);
        out.push(ELFDATA2LSB);
        out.push(EV_CURRENT);
        out.push(ELFOSABI_NONE);
        out.extend_from_slice(&[0u8; 8]);
        out.extend_from_slice(&ET_REL.to_le_bytes());
        out.extend_from_slice(&self.machine.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes()); // e_version
        out.extend_from_slice(&0u64.to_le_bytes()); // e_entry
        out.extend_from_slice(&0u64.to_le_bytes()); // e_phoff
        out.extend_from_slice(&e_shoff.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // e_flags
        out.extend_from_slice(&(EHDR_SIZE as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // e_phentsize
        out.extend_from_slice(&0u16.to_le_bytes()); // e_phnum
        out.extend_from_slice(&(SHDR_SIZE as u16).to_le_bytes());
        out.extend_from_slice(&e_shnum.to_le_bytes());
        out.extend_from_slice(&(shstrtab_idx as u16).to_le_bytes());
        debug_assert_eq!(out.len(), EHDR_SIZE);

        out.extend_from_slice(&body);
        debug_assert_eq!(out.len() as u64, e_shoff);
        out.extend_from_slice(&shdrs);
        out
    }
}

/// Build a System-V archive holding the given `(name, bytes)` members.
/// Names longer than 15 characters go through the GNU extended-name table.
pub fn build_archive(members: &[(&str, &Vec<u8>)]) -> Vec<u8> {
    let mut long_tab = Vec::new();
    let mut name_fields = Vec::new();
    for (name, _) in members {
        if name.len() <= 15 {
            name_fields.push(format!("{}/", name));
        } else {
            let off = long_tab.len();
            long_tab.extend_from_slice(name.as_bytes());
            long_tab.extend_from_slice(b"/\n");
            name_fields.push(format!("/{}", off));
        }
    }

    let mut out = Vec::new();
    out.extend_from_slice(AR_MAGIC);

    let push_member = |out: &mut Vec<u8>, name_field: &str, data: &[u8]| {
        out.extend_from_slice(format!("{:<16}", name_field).as_bytes());
        out.extend_from_slice(format!("{:<12}", 0).as_bytes()); // date
        out.extend_from_slice(format!("{:<6}", 0).as_bytes()); // uid
        out.extend_from_slice(format!("{:<6}", 0).as_bytes()); // gid
        out.extend_from_slice(format!("{:<8}", 644).as_bytes()); // mode
        out.extend_from_slice(format!("{:<10}", data.len()).as_bytes());
        out.extend_from_slice(b"`\n");
        out.extend_from_slice(data);
        if out.len() % 2 != 0 {
            out.push(b'\n');
        }
    };

    if !long_tab.is_empty() {
        push_member(&mut out, "//", &long_tab.clone());
    }
    for ((_, data), field) in members.iter().zip(&name_fields) {
        push_member(&mut out, field, data);
    }
    out
}

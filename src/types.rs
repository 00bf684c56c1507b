//! Linker state types.
//!
//! The whole link runs over one mutable [`LinkContext`] that is passed by
//! reference through the pipeline stages (load → merge → resolve → relocate →
//! layout → write). Nothing here is shared or global; every parsed object owns
//! its raw byte buffer for the lifetime of the link.

/// Output class an input section is merged into.
///
/// `None` marks dropped sections (debug info, notes, non-allocated data) and
/// symbols without a merged home (absolute symbols, undefined references).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutClass {
    None,
    Text,
    Rodata,
    Data,
    Bss,
}

/// Parsed ELF64 section header, with the name already resolved from the
/// section-name string table.
#[derive(Clone, Debug)]
pub struct SectionHeader {
    pub name: String,
    pub sh_type: u32,
    pub flags: u64,
    pub offset: u64,
    pub size: u64,
    pub link: u32,
    pub info: u32,
    pub addralign: u64,
    pub entsize: u64,
}

/// Parsed ELF64 symbol table entry, name resolved from the linked strtab.
#[derive(Clone, Debug)]
pub struct ElfSym {
    pub name: String,
    pub info: u8,
    pub shndx: u16,
    pub value: u64,
    pub size: u64,
}

impl ElfSym {
    pub fn binding(&self) -> u8 { self.info >> 4 }
    pub fn sym_type(&self) -> u8 { self.info & 0xf }
}

/// Where an input section landed after merging.
#[derive(Clone, Copy, Debug)]
pub struct SecMap {
    pub out_class: OutClass,
    pub out_off: u64,
}

impl Default for SecMap {
    fn default() -> Self {
        SecMap { out_class: OutClass::None, out_off: 0 }
    }
}

/// A parsed relocatable object (either a standalone .o or an archive member).
/// Owns its raw byte buffer; section content is sliced out of it on demand.
#[derive(Debug)]
pub struct InputObject {
    pub name: String,
    pub data: Vec<u8>,
    pub shdrs: Vec<SectionHeader>,
    pub symtab: Vec<ElfSym>,
    /// Per input section: output class and merged byte offset.
    pub sec_map: Vec<SecMap>,
    /// Per input symbol: index into the global symbol table.
    pub sym_map: Vec<u32>,
}

/// One entry in the link-wide symbol table.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub bind: u8,
    pub sym_type: u8,
    pub defined: bool,
    pub obj_idx: usize,
    pub sec_idx: usize,
    /// Offset within the owning input section (or the raw st_value for
    /// absolute symbols).
    pub sec_off: u64,
    pub size: u64,
    pub out_class: OutClass,
    /// Final virtual address; meaningless until layout has run.
    pub value: u64,
    pub is_export: bool,
}

/// A relocation translated into merged-output coordinates.
#[derive(Clone, Copy, Debug)]
pub struct Reloc {
    pub out_class: OutClass,
    /// Offset within the merged output buffer of `out_class`.
    pub offset: u64,
    pub rtype: u32,
    pub addend: i64,
    /// Index into the global symbol table.
    pub sym_idx: u32,
}

/// Base virtual addresses computed by the layout engine. All fields are zero
/// until `layout::compute_layout` runs; final afterwards.
#[derive(Clone, Copy, Debug, Default)]
pub struct Layout {
    pub text_vaddr: u64,
    pub rodata_vaddr: u64,
    pub data_vaddr: u64,
    pub dynamic_vaddr: u64,
    pub bss_vaddr: u64,
}

/// The single mutable link state, owned by one linking pass.
#[derive(Debug)]
pub struct LinkContext {
    pub output_path: String,
    pub base_addr: u64,
    pub verbose: bool,

    /// ELF machine of the link, fixed by the first object loaded.
    pub e_machine: u16,

    pub objects: Vec<InputObject>,
    pub symbols: Vec<Symbol>,
    pub relocs: Vec<Reloc>,

    // Merged output buffers
    pub text: Vec<u8>,
    pub rodata: Vec<u8>,
    pub data: Vec<u8>,
    pub bss_size: u64,
    pub bss_align: u64,

    /// Runtime fixup table (.rela.dyn) bytes and entry count.
    pub rela_dyn: Vec<u8>,
    pub nrela_dyn: usize,

    /// Explicit export list from a .def file (empty: export all defined
    /// globals), plus the optional LIBRARY name for DT_SONAME.
    pub exports: Vec<String>,
    pub lib_name: Option<String>,

    pub layout: Layout,
}

impl LinkContext {
    pub fn new(output_path: &str, base_addr: u64) -> Self {
        LinkContext {
            output_path: output_path.to_string(),
            base_addr,
            verbose: false,
            e_machine: 0,
            objects: Vec::new(),
            symbols: Vec::new(),
            relocs: Vec::new(),
            text: Vec::new(),
            rodata: Vec::new(),
            data: Vec::new(),
            bss_size: 0,
            bss_align: 1,
            rela_dyn: Vec::new(),
            nrela_dyn: 0,
            exports: Vec::new(),
            lib_name: None,
            layout: Layout::default(),
        }
    }

    /// Merged buffer for an output class, if it has file content.
    pub fn class_buf(&self, class: OutClass) -> Option<&Vec<u8>> {
        match class {
            OutClass::Text => Some(&self.text),
            OutClass::Rodata => Some(&self.rodata),
            OutClass::Data => Some(&self.data),
            _ => None,
        }
    }

    /// Base virtual address of an output class (0 for `None`).
    pub fn class_vaddr(&self, class: OutClass) -> u64 {
        match class {
            OutClass::Text => self.layout.text_vaddr,
            OutClass::Rodata => self.layout.rodata_vaddr,
            OutClass::Data => self.layout.data_vaddr,
            OutClass::Bss => self.layout.bss_vaddr,
            OutClass::None => 0,
        }
    }
}

pub fn align_up(value: u64, align: u64) -> u64 {
    if align <= 1 {
        return value;
    }
    (value + align - 1) & !(align - 1)
}

/// Align a growable output buffer by appending zero padding.
pub fn buf_align(buf: &mut Vec<u8>, align: u64) {
    let aligned = align_up(buf.len() as u64, align) as usize;
    if aligned > buf.len() {
        buf.resize(aligned, 0);
    }
}

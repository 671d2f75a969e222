use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::debugger::{ImageFile, ModuleInfo, ProcessHandle};

/// Path reported for images whose path could not be resolved.
pub const UNKNOWN_PATH: &str = "Unknown";

/// Non-owning reference to a module, by owning process and base address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModuleRef {
    /// ID of the process owning the module.
    pub process_id: u32,

    /// Base address of the module.
    pub base_addr: u64,
}

/// Module (DLL) loaded by a traced process.
#[derive(Debug)]
pub struct Module {
    owner: ModuleRef,
    path: PathBuf,
    info: Option<InfoState>,
}

#[derive(Debug)]
enum InfoState {
    Cached(ModuleInfo),
    Failed(String),
}

impl Module {
    /// Returns a reference to this module.
    pub const fn key(&self) -> ModuleRef {
        self.owner
    }

    /// Returns the ID of the process owning this module.
    pub const fn process_id(&self) -> u32 {
        self.owner.process_id
    }

    /// Returns the base address of this module.
    pub const fn base_addr(&self) -> u64 {
        self.owner.base_addr
    }

    /// Returns the path of this module's image.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the memory information of this module, if already queried.
    pub fn info(&self) -> Option<Result<ModuleInfo, &str>> {
        match self.info.as_ref()? {
            InfoState::Cached(info) => Some(Ok(*info)),
            InfoState::Failed(e) => Some(Err(e.as_str())),
        }
    }

    pub(super) fn info_or_query<P: ProcessHandle>(
        &mut self,
        process: &P,
    ) -> Result<ModuleInfo, &str> {
        let base_addr = self.owner.base_addr;

        let state = self
            .info
            .get_or_insert_with(|| match process.module_info(base_addr) {
                Ok(info) => InfoState::Cached(info),
                Err(e) => {
                    tracing::debug!(base_addr = format_args!("{base_addr:#x}"), error = %e, "query module info");
                    InfoState::Failed(e.to_string())
                }
            });

        match state {
            InfoState::Cached(info) => Ok(*info),
            InfoState::Failed(e) => Err(e.as_str()),
        }
    }
}

/// Modules loaded by a traced process, keyed by base address.
///
/// Modules are kept in load order. Unloading a module does not evict it,
/// so a later event referring to the same base address still finds it.
#[derive(Debug)]
pub struct ModuleTable {
    process_id: u32,
    modules: IndexMap<u64, Module>,
}

impl ModuleTable {
    pub(super) fn new(process_id: u32) -> Self {
        Self {
            process_id,
            modules: IndexMap::new(),
        }
    }

    /// Registers the module loaded at `base_addr`.
    ///
    /// If a module is already registered at this address, the given image
    /// handle is released without being resolved. Otherwise the path of the
    /// image is resolved (consuming the handle), or [UNKNOWN_PATH] is used.
    ///
    /// Returns the registered module, and whether it was newly inserted.
    pub fn register<I: ImageFile>(&mut self, base_addr: u64, image: Option<I>) -> (&Module, bool) {
        match self.modules.entry(base_addr) {
            Entry::Occupied(entry) => {
                drop(image);
                (entry.into_mut(), false)
            }
            Entry::Vacant(entry) => {
                let path = resolve_image_path(image).unwrap_or_else(|| PathBuf::from(UNKNOWN_PATH));

                let module = Module {
                    owner: ModuleRef {
                        process_id: self.process_id,
                        base_addr,
                    },
                    path,
                    info: None,
                };

                (entry.insert(module), true)
            }
        }
    }

    /// Returns the module loaded at `base_addr`.
    pub fn get(&self, base_addr: u64) -> Option<&Module> {
        self.modules.get(&base_addr)
    }

    pub(super) fn get_mut(&mut self, base_addr: u64) -> Option<&mut Module> {
        self.modules.get_mut(&base_addr)
    }

    pub(super) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Module> {
        self.modules.values_mut()
    }

    /// Returns the path of the module loaded at `base_addr`, or
    /// [UNKNOWN_PATH].
    pub fn path_or_unknown(&self, base_addr: u64) -> &Path {
        self.get(base_addr)
            .map_or_else(|| Path::new(UNKNOWN_PATH), Module::path)
    }

    /// Returns the number of registered modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns whether no module is registered.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Returns an iterator over the modules, in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }
}

/// Resolves the path of an image handle, consuming it.
pub(super) fn resolve_image_path<I: ImageFile>(image: Option<I>) -> Option<PathBuf> {
    image?
        .resolve_path()
        .inspect_err(|e| tracing::warn!(error = %e, "resolve image path"))
        .ok()
}

//! High-level function hooks
//!
//! Once a title's symbols are known, well-known SDK functions are hooked by address so that
//! debug output and panics can be routed to the host instead of being emulated.

use oc_loader::{SymbolDb, SymbolKind};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// What a hooked function is replaced with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// Formatted debug output
    DebugPrint,
    /// Fatal error report
    Panic,
    /// Raw console write
    ConsoleWrite,
}

/// Known SDK functions and their hooks
const KNOWN_FUNCTIONS: &[(&str, HookKind)] = &[
    ("OSReport", HookKind::DebugPrint),
    ("DEBUGPrint", HookKind::DebugPrint),
    ("WUD_DEBUGPrint", HookKind::DebugPrint),
    ("vprintf", HookKind::DebugPrint),
    ("printf", HookKind::DebugPrint),
    ("vdprintf", HookKind::DebugPrint),
    ("nlPrintf", HookKind::DebugPrint),
    ("puts", HookKind::DebugPrint),
    ("OSPanic", HookKind::Panic),
    ("__write_console", HookKind::ConsoleWrite),
];

/// A registered hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hook {
    pub name: &'static str,
    pub kind: HookKind,
}

/// Hooks of the running title, by function address
#[derive(Debug, Default)]
pub struct HleHooks {
    hooks: BTreeMap<u32, Hook>,
}

impl HleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook for every known function found in `symbols`
    pub fn patch_functions(&mut self, symbols: &SymbolDb) -> usize {
        self.hooks.clear();
        for &(name, kind) in KNOWN_FUNCTIONS {
            let Some(symbol) = symbols.get_symbol_from_name(name) else {
                continue;
            };
            if symbol.kind != SymbolKind::Function {
                continue;
            }
            debug!("Hooking {} at 0x{:08x}", name, symbol.address);
            self.hooks.insert(symbol.address, Hook { name, kind });
        }
        info!("Patched {} HLE function(s)", self.hooks.len());
        self.hooks.len()
    }

    pub fn clear(&mut self) {
        self.hooks.clear();
    }

    /// Hook at `address`, if any
    pub fn get(&self, address: u32) -> Option<&Hook> {
        self.hooks.get(&address)
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

//! Symbol database and linker map files

use oc_core::error::LoaderError;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// What a symbol names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Data,
}

/// A named address range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub address: u32,
    pub size: u32,
    pub kind: SymbolKind,
}

impl Symbol {
    /// Whether `addr` falls within this symbol
    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.address && addr - self.address < self.size.max(1)
    }
}

/// Address-ordered symbol table for the running title
#[derive(Debug, Default)]
pub struct SymbolDb {
    symbols: BTreeMap<u32, Symbol>,
}

impl SymbolDb {
    /// Create an empty symbol table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the symbol at `address`
    pub fn add(&mut self, address: u32, size: u32, name: &str, kind: SymbolKind) {
        self.symbols.insert(
            address,
            Symbol {
                name: name.to_string(),
                address,
                size,
                kind,
            },
        );
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Symbol covering `addr`
    pub fn get_symbol_from_addr(&self, addr: u32) -> Option<&Symbol> {
        self.symbols
            .range(..=addr)
            .next_back()
            .map(|(_, symbol)| symbol)
            .filter(|symbol| symbol.contains(addr))
    }

    /// First symbol with the given name
    pub fn get_symbol_from_name(&self, name: &str) -> Option<&Symbol> {
        self.symbols.values().find(|symbol| symbol.name == name)
    }

    /// All symbols, lowest address first
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// Load symbols from a linker map file, returning how many were added
    ///
    /// Understands CodeWarrior-style `<section> section layout` blocks with
    /// `address size virtual-address [alignment] name` lines, and the shorter
    /// `address size name` form. Other lines are skipped.
    pub fn load_map(&mut self, path: &Path) -> Result<usize, LoaderError> {
        let contents = std::fs::read_to_string(path).map_err(|e| LoaderError::InvalidMap {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut kind = SymbolKind::Function;
        let mut added = 0;
        for line in contents.lines() {
            let line = line.trim();
            if let Some(section) = line.strip_suffix("section layout") {
                kind = match section.trim() {
                    ".init" | ".text" => SymbolKind::Function,
                    _ => SymbolKind::Data,
                };
                continue;
            }

            if let Some((address, size, name)) = parse_map_line(line) {
                if size == 0 || address == 0 {
                    continue;
                }
                self.add(address, size, &name, kind);
                added += 1;
            }
        }

        if added == 0 && !contents.trim().is_empty() {
            debug!("No symbols recognized in {}", path.display());
        }
        info!("Loaded {} symbols from {}", added, path.display());
        Ok(added)
    }
}

fn parse_hex(token: &str) -> Option<u32> {
    let token = token.trim_start_matches("0x");
    if token.is_empty() {
        return None;
    }
    u32::from_str_radix(token, 16).ok()
}

fn parse_map_line(line: &str) -> Option<(u32, u32, String)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 {
        return None;
    }

    let first = parse_hex(tokens[0])?;
    let size = parse_hex(tokens[1])?;

    // address size vaddr align name [object]
    if tokens.len() >= 5 {
        if let (Some(vaddr), Ok(_)) = (parse_hex(tokens[2]), tokens[3].parse::<u32>()) {
            return Some((vaddr, size, tokens[4].to_string()));
        }
    }
    // address size vaddr name
    if tokens.len() >= 4 {
        if let Some(vaddr) = parse_hex(tokens[2]) {
            if tokens[2].len() == 8 {
                return Some((vaddr, size, tokens[3].to_string()));
            }
        }
    }
    Some((first, size, tokens[2].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_lookup_by_address() {
        let mut db = SymbolDb::new();
        db.add(0x8000_3100, 0x20, "__start", SymbolKind::Function);
        db.add(0x8000_3200, 0x10, "OSReport", SymbolKind::Function);

        assert_eq!(db.get_symbol_from_addr(0x8000_3110).map(|s| s.name.as_str()), Some("__start"));
        assert!(db.get_symbol_from_addr(0x8000_3120).is_none());
        assert_eq!(db.get_symbol_from_addr(0x8000_3200).map(|s| s.name.as_str()), Some("OSReport"));
        assert!(db.get_symbol_from_addr(0x8000_0000).is_none());

        db.clear();
        assert!(db.is_empty());
    }

    #[test]
    fn test_load_codewarrior_map() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, ".text section layout").unwrap();
        writeln!(file, "  Starting        Virtual").unwrap();
        writeln!(file, "  address  Size   address").unwrap();
        writeln!(file, "  -----------------------").unwrap();
        writeln!(file, "  00000000 000100 80003100  4 __start \tcrt0.o").unwrap();
        writeln!(file, "  UNUSED   000088 ........ OSReport os.a").unwrap();
        writeln!(file, "  00000100 000040 80003200  4 main \tmain.o").unwrap();
        writeln!(file, ".data section layout").unwrap();
        writeln!(file, "  00000000 000020 80400000  8 gTable \tmain.o").unwrap();
        file.flush().unwrap();

        let mut db = SymbolDb::new();
        assert_eq!(db.load_map(file.path()).unwrap(), 3);
        let table = db.get_symbol_from_name("gTable").unwrap();
        assert_eq!(table.address, 0x8040_0000);
        assert_eq!(table.kind, SymbolKind::Data);
        assert_eq!(db.get_symbol_from_name("main").unwrap().kind, SymbolKind::Function);
        assert!(db.get_symbol_from_name("OSReport").is_none());
    }

    #[test]
    fn test_load_short_map() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "80003100 00000100 __start").unwrap();
        writeln!(file, "# comment").unwrap();
        file.flush().unwrap();

        let mut db = SymbolDb::new();
        assert_eq!(db.load_map(file.path()).unwrap(), 1);
        assert_eq!(db.get_symbol_from_addr(0x8000_31F0).unwrap().name, "__start");
    }

    #[test]
    fn test_missing_map() {
        let mut db = SymbolDb::new();
        let err = db.load_map(Path::new("/nonexistent/GALE01.map")).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidMap { .. }));
    }
}

//! Memory manager implementation

use crate::constants::*;
use oc_core::error::MemoryError;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Which backing store an address falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bank {
    Mem1,
    Mem2,
}

/// Emulated physical memory
///
/// MEM2 is only backed once the machine is switched to Wii mode; GameCube machines fault on
/// any MEM2 access, as the hardware would.
pub struct Memory {
    mem1: RwLock<Vec<u8>>,
    mem2: RwLock<Vec<u8>>,
}

impl Memory {
    /// Create a new memory manager with MEM1 only
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            mem1: RwLock::new(vec![0u8; MEM1_SIZE as usize]),
            mem2: RwLock::new(Vec::new()),
        })
    }

    /// Map or unmap MEM2
    pub fn set_wii(&self, wii: bool) {
        let mut mem2 = self.mem2.write();
        if wii && mem2.is_empty() {
            mem2.resize(MEM2_SIZE as usize, 0);
            debug!("MEM2 mapped (0x{:x} bytes)", MEM2_SIZE);
        } else if !wii && !mem2.is_empty() {
            *mem2 = Vec::new();
            debug!("MEM2 unmapped");
        }
    }

    /// Whether MEM2 is mapped
    pub fn is_wii(&self) -> bool {
        !self.mem2.read().is_empty()
    }

    /// Zero all mapped memory
    pub fn clear(&self) {
        self.mem1.write().fill(0);
        self.mem2.write().fill(0);
    }

    /// Size of MEM1 in bytes
    pub fn mem1_size(&self) -> u32 {
        MEM1_SIZE
    }

    /// Size of MEM2 in bytes, 0 when unmapped
    pub fn mem2_size(&self) -> u32 {
        self.mem2.read().len() as u32
    }

    fn translate(&self, addr: u32, size: u32) -> Result<(Bank, usize), MemoryError> {
        let phys = addr & PHYSICAL_MASK;
        let end = phys
            .checked_add(size)
            .ok_or(MemoryError::OutOfRange { addr, size })?;

        if end <= MEM1_BASE + MEM1_SIZE {
            return Ok((Bank::Mem1, (phys - MEM1_BASE) as usize));
        }

        if phys >= MEM2_BASE && end <= MEM2_BASE + MEM2_SIZE {
            if !self.is_wii() {
                return Err(MemoryError::Mem2Unavailable(addr));
            }
            return Ok((Bank::Mem2, (phys - MEM2_BASE) as usize));
        }

        if phys < MEM1_BASE + MEM1_SIZE || (phys >= MEM2_BASE && phys < MEM2_BASE + MEM2_SIZE) {
            return Err(MemoryError::OutOfRange { addr, size });
        }

        Err(MemoryError::InvalidAddress(addr))
    }

    /// Copy data to memory
    pub fn write_bytes(&self, addr: u32, data: &[u8]) -> Result<(), MemoryError> {
        let size = u32::try_from(data.len()).map_err(|_| MemoryError::OutOfRange {
            addr,
            size: u32::MAX,
        })?;
        let (bank, offset) = self.translate(addr, size)?;
        let mut store = match bank {
            Bank::Mem1 => self.mem1.write(),
            Bank::Mem2 => self.mem2.write(),
        };
        store[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Copy data from memory
    pub fn read_bytes(&self, addr: u32, size: u32) -> Result<Vec<u8>, MemoryError> {
        let (bank, offset) = self.translate(addr, size)?;
        let store = match bank {
            Bank::Mem1 => self.mem1.read(),
            Bank::Mem2 => self.mem2.read(),
        };
        Ok(store[offset..offset + size as usize].to_vec())
    }

    /// Fill a range with a single byte value
    pub fn fill(&self, addr: u32, size: u32, value: u8) -> Result<(), MemoryError> {
        let (bank, offset) = self.translate(addr, size)?;
        let mut store = match bank {
            Bank::Mem1 => self.mem1.write(),
            Bank::Mem2 => self.mem2.write(),
        };
        store[offset..offset + size as usize].fill(value);
        Ok(())
    }

    /// Read a byte
    #[inline]
    pub fn read_u8(&self, addr: u32) -> Result<u8, MemoryError> {
        Ok(self.read_bytes(addr, 1)?[0])
    }

    /// Write a byte
    #[inline]
    pub fn write_u8(&self, addr: u32, value: u8) -> Result<(), MemoryError> {
        self.write_bytes(addr, &[value])
    }

    /// Read a big-endian u16 (Gekko/Broadway are big-endian)
    #[inline]
    pub fn read_be16(&self, addr: u32) -> Result<u16, MemoryError> {
        let bytes = self.read_bytes(addr, 2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Write a big-endian u16
    #[inline]
    pub fn write_be16(&self, addr: u32, value: u16) -> Result<(), MemoryError> {
        self.write_bytes(addr, &value.to_be_bytes())
    }

    /// Read a big-endian u32
    #[inline]
    pub fn read_be32(&self, addr: u32) -> Result<u32, MemoryError> {
        let bytes = self.read_bytes(addr, 4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Write a big-endian u32
    #[inline]
    pub fn write_be32(&self, addr: u32, value: u32) -> Result<(), MemoryError> {
        self.write_bytes(addr, &value.to_be_bytes())
    }

    /// Read a big-endian u64
    #[inline]
    pub fn read_be64(&self, addr: u32) -> Result<u64, MemoryError> {
        let bytes = self.read_bytes(addr, 8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes);
        Ok(u64::from_be_bytes(raw))
    }

    /// Write a big-endian u64
    #[inline]
    pub fn write_be64(&self, addr: u32, value: u64) -> Result<(), MemoryError> {
        self.write_bytes(addr, &value.to_be_bytes())
    }
}

//! IOS (Wii system software) services used during boot
//!
//! Only the pieces a boot sequence touches are modelled: the NAND file system, the ES title
//! store, the IOSC key/crypto engine and the kernel's IOS reload path.

pub mod es;
pub mod formats;
pub mod fs;
pub mod iosc;
pub mod kernel;
pub mod state_flags;
pub mod titles;

pub use es::Es;
pub use formats::{Content, TicketReader, TmdReader};
pub use fs::{FileSystem, Metadata, Mode, Modes, NandFile};
pub use iosc::{ConsoleType, Iosc, KeyStore};
pub use kernel::Ios;
pub use state_flags::{update_state_flags, StateFlags};

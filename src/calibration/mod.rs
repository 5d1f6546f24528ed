// Joint trim calibration
//
// Provides:
// - Line console abstraction (stdio and serial)
// - Trim table persistence (JSON file, in-memory)
// - The interactive leg -> joint -> value session

mod line_io;
mod session;
mod store;

pub use line_io::{LineIo, SerialLines, StdioLines};
pub use session::{CalibrationSession, SelectionError, Stage, body_diagram};
pub use store::{CalibrationStore, JsonFileStore, MemoryStore, StorageError};

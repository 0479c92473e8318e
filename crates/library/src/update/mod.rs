//! Changing the metadata of files already in the library.
//!
//! [`update_file`] writes the requested [`Changes`] into the file, reads its
//! metadata back and moves it to wherever the new metadata says it belongs,
//! removing directories that were left empty. [`update`] does the same for a
//! list of files and directories.

mod changes;
pub mod error;
mod file;
mod stream;

pub use self::changes::Changes;
pub use self::file::{Update, update_file};
pub use self::stream::{UpdateEvent, update};

//! Generate Common Lisp CFFI bindings from C header files.
//!
//! The parser covers the declaration subset of C that appears in binding
//! headers; the processor turns those declarations into `defcfun`,
//! `defcstruct`, `defcunion`, `defcenum`, `defctype`, and `defconstant`
//! forms. Name mangling is configurable through chains of [`mangler`]
//! implementations.
//!
//! Build scripts can call [`generate`] directly:
//!
//! ```no_run
//! let mut dest = std::fs::File::create("bindings.lisp").unwrap();
//! c2cffi::generate(std::path::Path::new("wrapper.h"), &mut dest).unwrap();
//! ```

use std::io::Write;
use std::path::Path;

pub mod ast;
pub mod batch;
pub mod error;
pub mod expansion;
pub mod lexer;
pub mod macros;
pub mod mangler;
pub mod parser;
pub mod processor;
pub mod types;

pub use error::{ProcessingError, Result};
pub use processor::{process_file, ProcessOptions};

/// Generate bindings for `header` into `dest` with the default options.
pub fn generate<W: Write + ?Sized>(header: &Path, dest: &mut W) -> Result<()> {
    processor::process_file(header, &ProcessOptions::default(), dest)
}

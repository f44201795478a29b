mod ast;
mod buffer;
mod builder;
mod codegen;
mod engine;
mod error;
mod interface;
mod lexer;
mod output;
pub mod runtime;
mod signature;

// Public exports.
pub use engine::{Compiler, compile};
pub use error::{RtmlError, RtmlResult};
pub use interface::{CompileOptions, RtmlInterface, TemplateFile};
pub use signature::Param;

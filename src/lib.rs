pub mod context;
pub mod flow;
pub mod io;
pub mod lexer;
pub mod program;
pub mod source;
pub mod validate;
pub mod vm;
pub mod wasm;

pub use crate::context::{Context, Value};
pub use crate::io::{BufferConsole, Console, RandomSource, SeededRandom, StdConsole, ThreadRandom};
pub use crate::program::{Opcode, Program};
pub use crate::source::Source;
pub use crate::vm::{Vm, VmConfig, VmError};

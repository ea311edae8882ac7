pub mod layout;
mod process;
mod reader;

#[cfg(test)]
pub mod mock;

pub use process::*;
pub use reader::{
    MemoryReader, ReadMemory, decode_name, decode_narrow, decode_wide, decode_wide_or_narrow,
};

#[cfg(test)]
pub use mock::{MockMemoryBuilder, MockMemoryReader};

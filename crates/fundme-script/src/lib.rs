/// Script building blocks for the fundme contract engine.
///
/// Provides the Script type, the BCH opcode table (including introspection
/// and token opcodes), chunk parsing, minimal pushes, script numbers and
/// CashAddr addresses behind the `AddressCodec` seam.

pub mod script;
pub mod opcodes;
pub mod chunk;
pub mod number;
pub mod address;

mod error;
pub use error::ScriptError;
pub use script::Script;
pub use address::{Address, AddressCodec, AddressType, CashAddrCodec, Network};
pub use chunk::ScriptChunk;
pub use number::{decode_number, encode_number};

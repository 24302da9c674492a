//! Script chunk parsing and push encoding.
//!
//! A script chunk is either an opcode or a data push with its payload.
//! Unlocking bytecode is read back chunk by chunk (the anyonecanpay payload
//! carries its signature and public key as the first two pushes), and every
//! push the engine writes goes through [`minimal_push`].

use crate::opcodes::*;
use crate::ScriptError;

/// A single parsed element of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes (1-75 bytes), this is the length.
    pub op: u8,
    /// The data payload, if this chunk is a push operation.
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    /// Whether this chunk pushes data (including the empty push `OP_0`).
    pub fn is_push(&self) -> bool {
        self.op <= OP_PUSHDATA4
    }

    /// The pushed bytes, if this chunk is a push. `OP_0` pushes nothing.
    pub fn push_data(&self) -> Option<&[u8]> {
        match (&self.data, self.op) {
            (Some(data), _) => Some(data.as_slice()),
            (None, OP_0) => Some(&[]),
            _ => None,
        }
    }

    /// The value this chunk leaves on the stack if it is push-only.
    ///
    /// Unlike [`push_data`](Self::push_data) this includes the small integer
    /// opcodes, which is what a minimally-encoded push of `[1..=16]` or
    /// `[0x81]` turns into.
    pub fn push_value(&self) -> Option<Vec<u8>> {
        match self.op {
            OP_1NEGATE => Some(vec![0x81]),
            OP_1..=OP_16 => Some(vec![self.op - OP_1 + 1]),
            _ => self.push_data().map(<[u8]>::to_vec),
        }
    }

    /// Render this chunk as an ASM token.
    pub fn to_asm_string(&self) -> String {
        match &self.data {
            Some(data) if self.op > OP_0 && self.op <= OP_PUSHDATA4 => hex::encode(data),
            _ => opcode_to_string(self.op),
        }
    }
}

/// Decode raw script bytes into chunks.
///
/// # Arguments
/// * `bytes` - The raw script bytes to decode.
///
/// # Returns
/// The parsed chunks, or `DataTooSmall` if a push runs past the end.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let op = bytes[pos];
        pos += 1;

        let length = match op {
            OP_DATA_1..=OP_DATA_75 => op as usize,
            OP_PUSHDATA1 => read_len(bytes, &mut pos, 1)?,
            OP_PUSHDATA2 => read_len(bytes, &mut pos, 2)?,
            OP_PUSHDATA4 => read_len(bytes, &mut pos, 4)?,
            _ => {
                chunks.push(ScriptChunk { op, data: None });
                continue;
            }
        };

        let end = pos.checked_add(length).ok_or(ScriptError::DataTooSmall)?;
        if end > bytes.len() {
            return Err(ScriptError::DataTooSmall);
        }
        chunks.push(ScriptChunk {
            op,
            data: Some(bytes[pos..end].to_vec()),
        });
        pos = end;
    }

    Ok(chunks)
}

/// Read a little-endian push length of `width` bytes.
fn read_len(bytes: &[u8], pos: &mut usize, width: usize) -> Result<usize, ScriptError> {
    let raw = bytes
        .get(*pos..*pos + width)
        .ok_or(ScriptError::DataTooSmall)?;
    *pos += width;
    let mut le = [0u8; 4];
    le[..width].copy_from_slice(raw);
    Ok(u32::from_le_bytes(le) as usize)
}

/// Compute the push prefix for a payload of the given length.
///
/// Chooses the smallest of direct push, `OP_PUSHDATA1/2/4`.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if data_len <= OP_DATA_75 as usize {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xff {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xffff {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len <= 0xffff_ffff {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::DataTooBig)
    }
}

/// Encode a push the way consensus minimal-push rules require.
///
/// Empty data becomes `OP_0`, a single byte `1..=16` becomes `OP_1..OP_16`,
/// `0x81` becomes `OP_1NEGATE`, anything else a length-prefixed push.
///
/// # Arguments
/// * `data` - The payload.
///
/// # Returns
/// The encoded push bytes.
pub fn minimal_push(data: &[u8]) -> Result<Vec<u8>, ScriptError> {
    match data {
        [] => Ok(vec![OP_0]),
        [n @ 1..=16] => Ok(vec![OP_1 + n - 1]),
        [0x81] => Ok(vec![OP_1NEGATE]),
        _ => {
            let mut out = push_data_prefix(data.len())?;
            out.extend_from_slice(data);
            Ok(out)
        }
    }
}

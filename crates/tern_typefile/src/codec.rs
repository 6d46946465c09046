//! Binary encoding of type files.
//!
//! Layout: the magic bytes `TERN`, a little-endian `u16` format version, then
//! the [`TypeFile`] serialized with bincode's standard configuration.

use crate::error::TypeFileError;
use crate::model::TypeFile;

/// Magic bytes identifying a type file.
pub const MAGIC: [u8; 4] = *b"TERN";

/// Current type file format version.
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = MAGIC.len() + 2;

/// Encodes a type file into its on-disk representation.
pub fn encode(type_file: &TypeFile) -> Result<Vec<u8>, TypeFileError> {
    let payload = bincode::serde::encode_to_vec(type_file, bincode::config::standard())
        .map_err(|e| TypeFileError::Serialization {
            reason: e.to_string(),
        })?;
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decodes a type file, rejecting foreign, truncated or padded input.
pub fn decode(bytes: &[u8]) -> Result<TypeFile, TypeFileError> {
    if bytes.len() < HEADER_LEN {
        if bytes.len() >= MAGIC.len() && bytes[..MAGIC.len()] != MAGIC {
            return Err(TypeFileError::BadMagic);
        }
        return Err(TypeFileError::Truncated {
            reason: format!("{} bytes is shorter than the header", bytes.len()),
        });
    }
    if bytes[..MAGIC.len()] != MAGIC {
        return Err(TypeFileError::BadMagic);
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != FORMAT_VERSION {
        return Err(TypeFileError::UnsupportedVersion {
            expected: FORMAT_VERSION,
            found: version,
        });
    }

    let payload = &bytes[HEADER_LEN..];
    let (type_file, consumed): (TypeFile, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard()).map_err(|e| {
            match e {
                bincode::error::DecodeError::UnexpectedEnd { .. } => TypeFileError::Truncated {
                    reason: "payload ended early".to_string(),
                },
                other => TypeFileError::Serialization {
                    reason: other.to_string(),
                },
            }
        })?;
    if consumed != payload.len() {
        return Err(TypeFileError::TrailingBytes {
            count: payload.len() - consumed,
        });
    }
    Ok(type_file)
}

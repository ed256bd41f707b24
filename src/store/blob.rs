//! Blob type - the unit of storage in a bucket

use crate::{Error, Result};

const CHECKSUM_LEN: usize = 32;

/// A named chunk of file data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    /// Name the object was stored under
    pub name: String,
    /// Raw data (uncompressed)
    pub data: Vec<u8>,
}

impl Blob {
    /// Create a new blob
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Blob {
            name: name.into(),
            data,
        }
    }

    /// BLAKE3 digest of the raw data
    pub fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        *blake3::hash(&self.data).as_bytes()
    }

    /// Encode the blob for storage
    ///
    /// Layout: name length (u16 LE), name, checksum, zstd-compressed data.
    pub fn compress(&self) -> Result<Vec<u8>> {
        let name = self.name.as_bytes();
        let name_len = u16::try_from(name.len())
            .map_err(|_| Error::InvalidName(format!("name too long: {} bytes", name.len())))?;

        let compressed = zstd::encode_all(self.data.as_slice(), 3)?;

        let mut output = Vec::with_capacity(2 + name.len() + CHECKSUM_LEN + compressed.len());
        output.extend_from_slice(&name_len.to_le_bytes());
        output.extend_from_slice(name);
        output.extend_from_slice(&self.checksum());
        output.extend(compressed);
        Ok(output)
    }

    /// Decode a blob from storage, verifying its checksum
    pub fn decompress(data: &[u8]) -> Result<Self> {
        if data.len() < 2 {
            return Err(Error::Corruption("Truncated blob header".into()));
        }

        let name_len = u16::from_le_bytes([data[0], data[1]]) as usize;
        let body = 2 + name_len + CHECKSUM_LEN;
        if data.len() < body {
            return Err(Error::Corruption("Truncated blob header".into()));
        }

        let name = String::from_utf8(data[2..2 + name_len].to_vec())
            .map_err(|_| Error::Corruption("Blob name is not UTF-8".into()))?;
        let expected = &data[2 + name_len..body];

        let decompressed = zstd::decode_all(&data[body..])?;
        let blob = Blob {
            name,
            data: decompressed,
        };

        if blob.checksum() != expected {
            return Err(Error::Corruption(format!(
                "Checksum mismatch for blob '{}'",
                blob.name
            )));
        }

        Ok(blob)
    }
}

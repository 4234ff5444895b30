//! Reader for the IDX format the MNIST files are packed in.
//!
//! Every file starts with a big-endian `u32` magic number, followed by the
//! record count and, for image files, the row and column counts. The rest of
//! the stream is raw `u8` payload.

use std::{
    fs::File,
    io::{Cursor, Read},
    path::Path,
};

use byteorder::{BigEndian, ReadBytesExt};
use flate2::read::GzDecoder;
use log::info;

use super::error::{MnistError, Result};

pub const LABEL_FILE: u32 = 2049;
pub const IMAGE_FILE: u32 = 2051;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Header {
    Labels { count: u32 },
    Images { count: u32, rows: u32, cols: u32 },
}

impl Header {
    pub fn magic(&self) -> u32 {
        match self {
            Header::Labels { .. } => LABEL_FILE,
            Header::Images { .. } => IMAGE_FILE,
        }
    }

    pub fn count(&self) -> usize {
        match *self {
            Header::Labels { count } | Header::Images { count, .. } => count as usize,
        }
    }

    /// Bytes per record: one for a label, `rows * cols` for an image.
    pub fn record_len(&self) -> Option<usize> {
        match *self {
            Header::Labels { .. } => Some(1),
            Header::Images { rows, cols, .. } => (rows as usize).checked_mul(cols as usize),
        }
    }

    /// Payload size implied by the header, `None` if it overflows `usize`.
    pub fn payload_len(&self) -> Option<usize> {
        self.record_len()?.checked_mul(self.count())
    }

    fn size(&self) -> usize {
        match self {
            Header::Labels { .. } => 8,
            Header::Images { .. } => 16,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdxFile {
    pub header: Header,
    pub payload: Vec<u8>,
}

fn read_u32(reader: &mut Cursor<&[u8]>) -> Result<u32> {
    reader
        .read_u32::<BigEndian>()
        .map_err(|_| MnistError::TruncatedHeader)
}

pub fn read_header(bytes: &[u8]) -> Result<Header> {
    let mut reader = Cursor::new(bytes);
    match read_u32(&mut reader)? {
        LABEL_FILE => Ok(Header::Labels {
            count: read_u32(&mut reader)?,
        }),
        IMAGE_FILE => Ok(Header::Images {
            count: read_u32(&mut reader)?,
            rows: read_u32(&mut reader)?,
            cols: read_u32(&mut reader)?,
        }),
        magic => Err(MnistError::BadMagic(magic)),
    }
}

/// Splits a decompressed stream into header and payload.
///
/// The payload is returned as-is; checking it against the declared
/// dimensions is left to the converter.
pub fn parse_idx(mut bytes: Vec<u8>) -> Result<IdxFile> {
    let header = read_header(&bytes)?;
    bytes.drain(..header.size());
    Ok(IdxFile {
        header,
        payload: bytes,
    })
}

/// Decompresses a gzip'ed IDX file fully into memory and parses it.
pub fn read_gz_idx(path: &Path) -> Result<IdxFile> {
    let file = File::open(path).map_err(MnistError::io(path))?;
    let mut decoder = GzDecoder::new(file);
    let mut bytes = Vec::new();
    decoder
        .read_to_end(&mut bytes)
        .map_err(MnistError::io(path))?;

    let idx = parse_idx(bytes)?;
    info!("magic = {}, count = {}", idx.header.magic(), idx.header.count());
    if let Header::Images { rows, cols, .. } = idx.header {
        info!("im_rows, im_cols = {}, {}", rows, cols);
    }
    Ok(idx)
}

use ndarray::ArrayD;
use std::io::Write;
use tempfile::NamedTempFile;

use super::container::{Container, ContainerDecoder};
use super::error::DecodeError;

/// Decoder for HDF5 uploads.
#[derive(Debug, Default, Clone, Copy)]
pub struct Hdf5Decoder;

impl ContainerDecoder for Hdf5Decoder {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn Container>, DecodeError> {
        Ok(Box::new(HDFReader::from_bytes(bytes)?))
    }
}

const HDF5_SIGNATURE: &[u8] = b"\x89HDF\r\n\x1a\n";

/// The superblock sits at offset 0, or after a user block at 512, 1024, 2048, ...
fn has_hdf5_signature(bytes: &[u8]) -> bool {
    std::iter::once(0)
        .chain(std::iter::successors(Some(512usize), |offset| offset.checked_mul(2)))
        .take_while(|offset| *offset < bytes.len())
        .any(|offset| bytes[offset..].starts_with(HDF5_SIGNATURE))
}

/// A simple struct which wraps around the hdf5-rust library for reading.
///
/// The HDF5 library opens files by path, so the payload is spilled to a temporary file which
/// is removed when the reader is dropped.
#[derive(Debug)]
pub struct HDFReader {
    file_handle: hdf5::File,
    _spill: NamedTempFile, // must outlive file_handle
}

impl HDFReader {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if !has_hdf5_signature(bytes) {
            return Err(DecodeError::Malformed(String::from(
                "payload does not carry the HDF5 signature",
            )));
        }
        let mut spill = NamedTempFile::new()?;
        spill.write_all(bytes)?;
        spill.flush()?;
        let file_handle = hdf5::File::open(spill.path())?;
        Ok(Self {
            file_handle,
            _spill: spill,
        })
    }
}

impl Container for HDFReader {
    fn list_groups(&self) -> Result<Vec<String>, DecodeError> {
        Ok(self
            .file_handle
            .groups()?
            .iter()
            .map(|group| group.name().trim_start_matches('/').to_string())
            .collect())
    }

    fn list_entries(&self, group: &str) -> Result<Vec<String>, DecodeError> {
        if !self.file_handle.link_exists(group) {
            return Err(DecodeError::MissingPath(group.to_string()));
        }
        Ok(self.file_handle.group(group)?.member_names()?)
    }

    fn read_array(&self, path: &str) -> Result<ArrayD<f64>, DecodeError> {
        if !self.file_handle.link_exists(path) {
            return Err(DecodeError::MissingPath(path.to_string()));
        }
        Ok(self.file_handle.dataset(path)?.read_dyn::<f64>()?)
    }

    fn has_group(&self, group: &str) -> bool {
        self.file_handle.link_exists(group) && self.file_handle.group(group).is_ok()
    }

    fn has_dataset(&self, path: &str) -> bool {
        self.file_handle.link_exists(path) && self.file_handle.dataset(path).is_ok()
    }
}

//! Reads the file version embedded in a Windows executable
//!
//! The version resource carries a `VS_FIXEDFILEINFO` block that starts with the
//! signature `0xFEEF04BD`, followed by the structure version and the file version
//! as two 32-bit words (major/minor and build/revision).

use std::fs;
use std::path::Path;

use crate::error::{Result, UpdateError};
use crate::version::Version;

const FIXED_INFO_SIGNATURE: [u8; 4] = 0xFEEF_04BD_u32.to_le_bytes();
const FIXED_INFO_STRUC_VERSION: u32 = 0x0001_0000;

/// Read the file version of the executable at `path`.
pub fn read_file_version(path: &Path) -> Result<Version> {
    let bytes = fs::read(path).map_err(|e| UpdateError::version_read(path, e))?;
    parse_fixed_file_info(&bytes)
        .ok_or_else(|| UpdateError::version_read(path, "no version information in file"))
}

/// Find the first well-formed `VS_FIXEDFILEINFO` block and decode its file version.
pub fn parse_fixed_file_info(bytes: &[u8]) -> Option<Version> {
    let mut offset = 0;
    while let Some(found) = find(&bytes[offset..], &FIXED_INFO_SIGNATURE) {
        let start = offset + found;
        let fields = bytes.get(start + 4..start + 16)?;
        let struc_version = read_u32(&fields[0..4]);
        // The signature bytes can show up in code or data; only trust a real header
        if struc_version == FIXED_INFO_STRUC_VERSION {
            let ms = read_u32(&fields[4..8]);
            let ls = read_u32(&fields[8..12]);
            return Some(Version::new(ms >> 16, ms & 0xFFFF, ls >> 16, ls & 0xFFFF));
        }
        offset = start + 1;
    }
    None
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixed_info(major: u16, minor: u16, build: u16, revision: u16) -> Vec<u8> {
        let mut block = Vec::new();
        block.extend_from_slice(&FIXED_INFO_SIGNATURE);
        block.extend_from_slice(&FIXED_INFO_STRUC_VERSION.to_le_bytes());
        block.extend_from_slice(&(((major as u32) << 16) | minor as u32).to_le_bytes());
        block.extend_from_slice(&(((build as u32) << 16) | revision as u32).to_le_bytes());
        // product version, unused
        block.extend_from_slice(&[0u8; 8]);
        block
    }

    #[test]
    fn test_parse_fixed_file_info() {
        let mut bytes = b"MZ\x90\x00 some header bytes".to_vec();
        bytes.extend(fixed_info(2, 5, 1, 7));
        bytes.extend_from_slice(b"trailing");
        assert_eq!(parse_fixed_file_info(&bytes), Some(Version::new(2, 5, 1, 7)));
    }

    #[test]
    fn test_skips_stray_signature() {
        let mut bytes = FIXED_INFO_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0xAA; 12]);
        bytes.extend(fixed_info(1, 0, 0, 0));
        assert_eq!(parse_fixed_file_info(&bytes), Some(Version::new(1, 0, 0, 0)));
    }

    #[test]
    fn test_no_version_info() {
        assert_eq!(parse_fixed_file_info(b"MZ nothing here"), None);
        // Signature at the very end with no room for the fields
        assert_eq!(parse_fixed_file_info(&FIXED_INFO_SIGNATURE), None);
    }

    #[test]
    fn test_read_file_version() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"MZ").unwrap();
        file.write_all(&fixed_info(1, 4, 0, 0)).unwrap();
        file.flush().unwrap();

        let version = read_file_version(file.path()).unwrap();
        assert_eq!(version.to_string(), "1.4.0.0");
    }

    #[test]
    fn test_read_file_version_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("ClassicVolumeMixer.exe");
        assert!(matches!(
            read_file_version(&missing),
            Err(UpdateError::VersionRead { .. })
        ));

        let plain = dir.path().join("plain.exe");
        fs::write(&plain, b"MZ no resources").unwrap();
        let err = read_file_version(&plain).unwrap_err();
        assert!(err.to_string().contains("no version information"));
    }
}

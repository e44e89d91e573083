use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::info;

/// Byte-order marks recognized in statement exports. Erste's web export
/// writes UTF-8 with a signature; older desktop exports used UTF-16.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bom {
    Utf8,
    Utf32Le,
    Utf32Be,
    Utf16Le,
    Utf16Be,
}

impl Bom {
    fn mark(&self) -> &'static [u8] {
        match self {
            Bom::Utf8 => &[0xEF, 0xBB, 0xBF],
            Bom::Utf32Le => &[0xFF, 0xFE, 0x00, 0x00],
            Bom::Utf32Be => &[0x00, 0x00, 0xFE, 0xFF],
            Bom::Utf16Le => &[0xFF, 0xFE],
            Bom::Utf16Be => &[0xFE, 0xFF],
        }
    }
}

// UTF-32LE's mark starts with UTF-16LE's mark, so the 32-bit forms must be
// tried first.
const DETECTION_ORDER: [Bom; 5] = [Bom::Utf8, Bom::Utf32Le, Bom::Utf32Be, Bom::Utf16Le, Bom::Utf16Be];

/// Match the file's first 4 bytes against known byte-order marks.
/// `None` means no mark, i.e. read the file as plain UTF-8.
pub(crate) fn detect_bom(path: &Path) -> std::io::Result<Option<Bom>> {
    let file = File::open(path)?;
    let mut first_bytes = Vec::with_capacity(4);
    file.take(4).read_to_end(&mut first_bytes)?;

    Ok(DETECTION_ORDER.iter()
        .find(|bom| first_bytes.starts_with(bom.mark()))
        .copied())
}

/// Read the whole file and hand back UTF-8 text with any byte-order mark
/// stripped. The csv reader only speaks UTF-8, so UTF-16/UTF-32 inputs are
/// transcoded up front; statement files are small enough that buffering the
/// whole thing is fine.
pub(crate) fn read_to_utf8(path: &Path) -> Result<String> {
    let bom = detect_bom(path)?;
    let bytes = std::fs::read(path)?;

    match bom {
        None => String::from_utf8(bytes).with_context(|| format!("{:?} is not valid UTF-8", path)),
        Some(bom) => {
            info!("Detected {:?} byte-order mark in {:?}", bom, path);
            let body = &bytes[bom.mark().len()..];
            match bom {
                Bom::Utf8 => Ok(std::str::from_utf8(body)
                    .with_context(|| format!("{:?} is not valid UTF-8", path))?
                    .to_string()),
                Bom::Utf16Le => decode_utf16::<LittleEndian>(body),
                Bom::Utf16Be => decode_utf16::<BigEndian>(body),
                Bom::Utf32Le => decode_utf32::<LittleEndian>(body),
                Bom::Utf32Be => decode_utf32::<BigEndian>(body),
            }
        }
    }
}

fn decode_utf16<E: ByteOrder>(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        bail!("truncated UTF-16 code unit at end of file");
    }
    let mut units = vec![0u16; bytes.len() / 2];
    E::read_u16_into(bytes, &mut units);
    String::from_utf16(&units).context("invalid UTF-16 in input file")
}

fn decode_utf32<E: ByteOrder>(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 4 != 0 {
        bail!("truncated UTF-32 code unit at end of file");
    }
    let mut decoded = String::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        let unit = E::read_u32(chunk);
        match char::from_u32(unit) {
            Some(c) => decoded.push(c),
            None => bail!("invalid UTF-32 scalar value {:#x}", unit),
        }
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use super::*;

    fn write_temp(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn detects_utf16_le_mark() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "utf16le.csv", &[0xFF, 0xFE, b'a', 0x00]);
        assert_eq!(detect_bom(&path).unwrap(), Some(Bom::Utf16Le));
    }

    #[test]
    fn utf32_le_wins_over_utf16_le() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "utf32le.csv", &[0xFF, 0xFE, 0x00, 0x00, b'a', 0x00, 0x00, 0x00]);
        assert_eq!(detect_bom(&path).unwrap(), Some(Bom::Utf32Le));
    }

    #[test]
    fn no_mark_means_default_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "plain.csv", b"Booking Date,Amount\n");
        assert_eq!(detect_bom(&path).unwrap(), None);
    }

    #[test]
    fn short_file_does_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "short.csv", b"a");
        assert_eq!(detect_bom(&path).unwrap(), None);
    }

    #[test]
    fn reads_utf16_le_file_as_utf8_text() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "Összeg".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let path = write_temp(&dir, "utf16le.csv", &bytes);
        assert_eq!(read_to_utf8(&path).unwrap(), "Összeg");
    }

    #[test]
    fn reads_utf16_be_file_as_utf8_text() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "ab".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        let path = write_temp(&dir, "utf16be.csv", &bytes);
        assert_eq!(read_to_utf8(&path).unwrap(), "ab");
    }

    #[test]
    fn reads_utf32_le_file_as_utf8_text() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = vec![0xFF, 0xFE, 0x00, 0x00];
        for c in "Közlemény".chars() {
            bytes.extend_from_slice(&(c as u32).to_le_bytes());
        }
        let path = write_temp(&dir, "utf32le.csv", &bytes);
        assert_eq!(read_to_utf8(&path).unwrap(), "Közlemény");
    }

    #[test]
    fn strips_utf8_signature() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"Booking Date");
        let path = write_temp(&dir, "utf8sig.csv", &bytes);
        assert_eq!(read_to_utf8(&path).unwrap(), "Booking Date");
    }

    #[test]
    fn plain_file_read_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "plain.csv", b"Booking Date,Amount\n");
        assert_eq!(read_to_utf8(&path).unwrap(), "Booking Date,Amount\n");
    }
}

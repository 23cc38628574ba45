use std::io::{self, Read, Seek, SeekFrom};

use crate::binary::{BinaryReader, Endian};

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const IEND: [u8; 4] = *b"IEND";
const CRC_LEN: u64 = 4;

/// Returns the byte length of the PNG image at the reader's current position,
/// or 0 when no complete PNG starts there. The reader is left where it was.
pub fn png_length<R: Read + Seek>(br: &mut BinaryReader<R>) -> io::Result<u64> {
    let start = br.position()?;
    let result = walk_chunks(br, start);
    br.seek(SeekFrom::Start(start))?;
    result
}

fn walk_chunks<R: Read + Seek>(br: &mut BinaryReader<R>, start: u64) -> io::Result<u64> {
    let end = br.stream_len()?;
    if end - start < PNG_SIGNATURE.len() as u64 {
        return Ok(0);
    }
    if br.read_exact::<8>()? != PNG_SIGNATURE {
        return Ok(0);
    }

    loop {
        let pos = br.position()?;
        if end - pos < 8 {
            return Ok(0);
        }
        let chunk_len = br.read_u32_with(Endian::Big)? as u64;
        let chunk_type = br.read_exact::<4>()?;
        if end - br.position()? < chunk_len + CRC_LEN {
            return Ok(0);
        }
        br.skip(chunk_len + CRC_LEN)?;
        if chunk_type == IEND {
            return Ok(br.position()? - start);
        }
    }
}

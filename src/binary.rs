use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};

/// Longest 7-bit encoded length prefix a .NET string can carry.
const MAX_7BIT_BYTES: u32 = 5;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Endian {
    Little,
    Big,
}

/// Sequential reader whose position only ever moves forward through `read_*`
/// and `skip`.
pub struct BinaryReader<R: Read + Seek> {
    inner: BufReader<R>,
    default_endian: Endian,
}

pub struct BinaryWriter<W: Write + Seek> {
    inner: BufWriter<W>,
    default_endian: Endian,
}

impl<R: Read + Seek> BinaryReader<R> {
    pub fn new(reader: R, endian: Endian) -> Self {
        Self {
            inner: BufReader::new(reader),
            default_endian: endian,
        }
    }

    pub fn read_exact<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        self.inner.read_u8()
    }

    pub fn read_bool(&mut self) -> io::Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i32(&mut self) -> io::Result<i32> {
        self.read_i32_with(self.default_endian)
    }

    pub fn read_i32_with(&mut self, endian: Endian) -> io::Result<i32> {
        match endian {
            Endian::Little => self.inner.read_i32::<LittleEndian>(),
            Endian::Big => self.inner.read_i32::<BigEndian>(),
        }
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        self.read_u32_with(self.default_endian)
    }

    pub fn read_u32_with(&mut self, endian: Endian) -> io::Result<u32> {
        match endian {
            Endian::Little => self.inner.read_u32::<LittleEndian>(),
            Endian::Big => self.inner.read_u32::<BigEndian>(),
        }
    }

    pub fn read_i64(&mut self) -> io::Result<i64> {
        match self.default_endian {
            Endian::Little => self.inner.read_i64::<LittleEndian>(),
            Endian::Big => self.inner.read_i64::<BigEndian>(),
        }
    }

    pub fn read_f32(&mut self) -> io::Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f32_triple(&mut self) -> io::Result<[f32; 3]> {
        Ok([self.read_f32()?, self.read_f32()?, self.read_f32()?])
    }

    /// Reads a count field; negative counts mean "no entries".
    pub fn read_count(&mut self) -> io::Result<usize> {
        Ok(self.read_i32()?.max(0) as usize)
    }

    /// Reads the 7-bit encoded length prefix used by .NET `BinaryWriter`.
    pub fn read_7bit_len(&mut self) -> io::Result<usize> {
        let mut value: u32 = 0;
        for i in 0..MAX_7BIT_BYTES {
            let byte = self.read_u8()?;
            value |= ((byte & 0x7F) as u32) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value as usize);
            }
        }
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "7-bit encoded string length is too long",
        ))
    }

    /// Reads a length-prefixed UTF-8 string (the .NET `BinaryWriter.Write(string)` layout).
    pub fn read_net_string(&mut self) -> io::Result<String> {
        let len = self.read_7bit_len()?;
        let buf = self.read_vec(len)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn read_vec(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        let read = (&mut self.inner).take(len as u64).read_to_end(&mut buf)?;
        if read != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("wanted {len} bytes, only {read} left"),
            ));
        }
        Ok(buf)
    }

    /// Consumes `len` bytes without keeping them. Fails instead of moving past the end.
    pub fn skip(&mut self, len: u64) -> io::Result<()> {
        let skipped = io::copy(&mut (&mut self.inner).take(len), &mut io::sink())?;
        if skipped != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("wanted to skip {len} bytes, only {skipped} left"),
            ));
        }
        Ok(())
    }

    /// Skips a raw block prefixed by its i32 length.
    pub fn skip_i32_block(&mut self) -> io::Result<()> {
        let len = self.read_i32()?;
        if len > 0 {
            self.skip(len as u64)?;
        }
        Ok(())
    }

    /// Skips a raw block prefixed by its i64 length.
    pub fn skip_i64_block(&mut self) -> io::Result<()> {
        let len = self.read_i64()?;
        if len > 0 {
            self.skip(len as u64)?;
        }
        Ok(())
    }

    /// Checks whether the upcoming bytes equal `prefix` without consuming them.
    pub fn peek_matches(&mut self, prefix: &[u8]) -> io::Result<bool> {
        let pos = self.position()?;
        let mut buf = Vec::with_capacity(prefix.len());
        (&mut self.inner)
            .take(prefix.len() as u64)
            .read_to_end(&mut buf)?;
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(buf == prefix)
    }

    pub fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }

    pub fn position(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }

    pub fn stream_len(&mut self) -> io::Result<u64> {
        let pos = self.position()?;
        let len = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(len)
    }

    pub fn has_remaining(&mut self) -> io::Result<bool> {
        Ok(self.position()? < self.stream_len()?)
    }
}

impl<W: Write + Seek> BinaryWriter<W> {
    pub fn new(writer: W, endian: Endian) -> Self {
        Self {
            inner: BufWriter::new(writer),
            default_endian: endian,
        }
    }

    pub fn write_u8(&mut self, value: u8) -> io::Result<()> {
        self.inner.write_u8(value)
    }

    pub fn write_bool(&mut self, value: bool) -> io::Result<()> {
        self.write_u8(value as u8)
    }

    pub fn write_i32(&mut self, value: i32) -> io::Result<()> {
        match self.default_endian {
            Endian::Little => self.inner.write_i32::<LittleEndian>(value),
            Endian::Big => self.inner.write_i32::<BigEndian>(value),
        }
    }

    pub fn write_u32(&mut self, value: u32) -> io::Result<()> {
        self.write_u32_with(value, self.default_endian)
    }

    pub fn write_u32_with(&mut self, value: u32, endian: Endian) -> io::Result<()> {
        let mut buf = [0u8; 4];
        match endian {
            Endian::Little => LittleEndian::write_u32(&mut buf, value),
            Endian::Big => BigEndian::write_u32(&mut buf, value),
        }
        self.inner.write_all(&buf)
    }

    pub fn write_i64(&mut self, value: i64) -> io::Result<()> {
        match self.default_endian {
            Endian::Little => self.inner.write_i64::<LittleEndian>(value),
            Endian::Big => self.inner.write_i64::<BigEndian>(value),
        }
    }

    pub fn write_f32(&mut self, value: f32) -> io::Result<()> {
        self.write_u32(value.to_bits())
    }

    pub fn write_net_string(&mut self, s: &str) -> io::Result<()> {
        let mut len = s.len() as u32;
        while len >= 0x80 {
            self.write_u8((len as u8) | 0x80)?;
            len >>= 7;
        }
        self.write_u8(len as u8)?;
        self.inner.write_all(s.as_bytes())
    }

    /// Writes `data` into a zero-padded field of exactly `width` bytes, cutting off the excess.
    pub fn write_fixed(&mut self, data: &[u8], width: usize) -> io::Result<()> {
        let used = data.len().min(width);
        self.inner.write_all(&data[..used])?;
        self.inner.write_all(&vec![0u8; width - used])
    }

    pub fn write_vec(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.write_all(data)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> io::Result<W> {
        self.inner.into_inner().map_err(|e| e.into_error())
    }
}

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::Write;
use std::path::Path;

use super::constants::*;
use super::error::StreamError;
use super::payload::Fragment;
use super::source_id::{ClockTime, Src, TypeId};

/// The transitions a replay stream can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Configure,
    L1Accept,
}

impl TryFrom<u32> for TransitionKind {
    type Error = StreamError;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            TRANSITION_CONFIGURE => Ok(Self::Configure),
            TRANSITION_L1ACCEPT => Ok(Self::L1Accept),
            _ => Err(StreamError::BadTransition(value)),
        }
    }
}

impl From<TransitionKind> for u32 {
    fn from(value: TransitionKind) -> Self {
        match value {
            TransitionKind::Configure => TRANSITION_CONFIGURE,
            TransitionKind::L1Accept => TRANSITION_L1ACCEPT,
        }
    }
}

/// A transition and the fragments it carries, borrowed from the stream buffer
#[derive(Debug, Clone)]
pub struct Transition<'a> {
    pub kind: TransitionKind,
    pub clock: ClockTime,
    pub fragments: Vec<Fragment<'a>>,
}

/// Read an entire stream file into memory
pub fn read_stream_file(path: &Path) -> Result<Vec<u8>, StreamError> {
    if !path.exists() {
        return Err(StreamError::BadFilePath(path.to_path_buf()));
    }
    Ok(std::fs::read(path)?)
}

/// StreamReader walks a replay stream held in memory.
///
/// Each transition header is 16 bytes (kind, seconds, nanoseconds, fragment count) and is
/// followed by its fragments, each with a 16 byte header (type id, version, logical source,
/// physical source, payload length). Fragments borrow their payload from the buffer.
#[derive(Debug)]
pub struct StreamReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> StreamReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn total_size(&self) -> usize {
        self.bytes.len()
    }

    /// Get the next transition in the stream
    ///
    /// Returns a `Result<Option<Transition>>`. The Option is None once the stream is exhausted.
    pub fn next_transition(&mut self) -> Result<Option<Transition<'a>>, StreamError> {
        if self.position == self.bytes.len() {
            return Ok(None);
        }
        let header = self.take(TRANSITION_HEADER_SIZE, "transition")?;
        let kind = TransitionKind::try_from(LittleEndian::read_u32(&header[0..4]))?;
        let clock = ClockTime::new(
            LittleEndian::read_u32(&header[4..8]),
            LittleEndian::read_u32(&header[8..12]),
        );
        let n_fragments = LittleEndian::read_u32(&header[12..16]) as usize;

        let mut fragments = Vec::with_capacity(n_fragments);
        for _ in 0..n_fragments {
            let header = self.take(FRAGMENT_HEADER_SIZE, "fragment")?;
            let type_id = TypeId::from(LittleEndian::read_u16(&header[0..2]));
            let version = LittleEndian::read_u16(&header[2..4]);
            let src = Src::new(
                LittleEndian::read_u32(&header[4..8]),
                LittleEndian::read_u32(&header[8..12]),
            );
            let length = LittleEndian::read_u32(&header[12..16]) as usize;
            let remaining = self.bytes.len() - self.position;
            if length > remaining {
                return Err(StreamError::TruncatedPayload(length, remaining));
            }
            let payload = &self.bytes[self.position..self.position + length];
            self.position += length;
            fragments.push(Fragment {
                src,
                type_id,
                version,
                payload,
            });
        }

        Ok(Some(Transition {
            kind,
            clock,
            fragments,
        }))
    }

    fn take(&mut self, size: usize, what: &'static str) -> Result<&'a [u8], StreamError> {
        if self.bytes.len() - self.position < size {
            return Err(StreamError::TruncatedHeader(what));
        }
        let slice = &self.bytes[self.position..self.position + size];
        self.position += size;
        Ok(slice)
    }
}

/// StreamWriter produces replay streams, one transition at a time
#[derive(Debug)]
pub struct StreamWriter<W: Write> {
    writer: W,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_transition(
        &mut self,
        kind: TransitionKind,
        clock: ClockTime,
        fragments: &[Fragment<'_>],
    ) -> Result<(), StreamError> {
        self.writer.write_u32::<LittleEndian>(kind.into())?;
        self.writer.write_u32::<LittleEndian>(clock.seconds)?;
        self.writer.write_u32::<LittleEndian>(clock.nanoseconds)?;
        self.writer
            .write_u32::<LittleEndian>(fragments.len() as u32)?;
        for fragment in fragments {
            self.writer
                .write_u16::<LittleEndian>(fragment.type_id.into())?;
            self.writer.write_u16::<LittleEndian>(fragment.version)?;
            self.writer.write_u32::<LittleEndian>(fragment.src.log)?;
            self.writer.write_u32::<LittleEndian>(fragment.src.phy)?;
            self.writer
                .write_u32::<LittleEndian>(fragment.payload.len() as u32)?;
            self.writer.write_all(fragment.payload)?;
        }
        Ok(())
    }

    /// Consume the writer, handing back the underlying sink
    pub fn into_inner(mut self) -> Result<W, StreamError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_walks_transitions() {
        let payload = [1u8, 2, 3];
        let src = Src::new(7, 42);
        let mut writer = StreamWriter::new(Vec::new());
        writer
            .write_transition(TransitionKind::Configure, ClockTime::new(1, 0), &[])
            .unwrap();
        writer
            .write_transition(
                TransitionKind::L1Accept,
                ClockTime::new(2, 5),
                &[Fragment::new(src, TypeId::Other(77), &payload)],
            )
            .unwrap();
        let bytes = writer.into_inner().unwrap();

        let mut reader = StreamReader::new(&bytes);
        let first = reader.next_transition().unwrap().unwrap();
        assert_eq!(first.kind, TransitionKind::Configure);
        assert!(first.fragments.is_empty());

        let second = reader.next_transition().unwrap().unwrap();
        assert_eq!(second.kind, TransitionKind::L1Accept);
        assert_eq!(second.clock, ClockTime::new(2, 5));
        assert_eq!(second.fragments[0].src, src);
        assert_eq!(second.fragments[0].type_id, TypeId::Other(77));
        assert_eq!(second.fragments[0].payload, &payload);

        assert!(reader.next_transition().unwrap().is_none());
        assert_eq!(reader.position(), reader.total_size());
    }

    #[test]
    fn test_reader_rejects_truncation() {
        let mut writer = StreamWriter::new(Vec::new());
        writer
            .write_transition(
                TransitionKind::L1Accept,
                ClockTime::default(),
                &[Fragment::new(Src::default(), TypeId::Frame, &[0u8; 8])],
            )
            .unwrap();
        let bytes = writer.into_inner().unwrap();
        let mut reader = StreamReader::new(&bytes[..bytes.len() - 1]);
        assert!(matches!(
            reader.next_transition(),
            Err(StreamError::TruncatedPayload(8, 7))
        ));

        let mut reader = StreamReader::new(&bytes[..10]);
        assert!(matches!(
            reader.next_transition(),
            Err(StreamError::TruncatedHeader("transition"))
        ));
    }
}

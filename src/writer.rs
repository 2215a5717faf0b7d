//! Writing lists to a byte stream.

use std::io::Write;

use crate::{
    chunk::ChunkEncoder,
    error::{Error, Result},
    formatter::ElementEncoder,
    frame::FrameKind,
    marker::Marker,
    options::ChunkOptions,
};

/// What a completed list write put on the stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Number of frames written. A null list counts as one frame.
    pub frames: usize,
    /// How many of those frames were LZ4-compressed.
    pub compressed_frames: usize,
    /// Number of elements written.
    pub elements: usize,
    /// Total bytes written to the stream.
    pub bytes: usize,
}

/// Writes lists to a stream as a sequence of chunk frames.
///
/// A writer can be used for any number of lists, one after another. Each list is either written
/// in one go with [`write_list`][Self::write_list] or [`write_iter`][Self::write_iter], or
/// built up with [`push`][Self::push] and completed with [`finish`][Self::finish].
///
/// The encoding and compression buffers are kept between chunks and between lists.
///
/// ```
/// # use chunk_pack::*;
/// let mut writer = ChunkWriter::new(Vec::new());
/// let summary = writer.write_list(Some(&[1u32, 2, 3][..]), &SerdeFormatter)?;
/// assert_eq!(summary.frames, 1);
/// assert_eq!(writer.into_inner(), vec![0xdd, 0, 0, 0, 3, 1, 2, 3]);
/// # Ok::<(), chunk_pack::Error>(())
/// ```
#[derive(Debug)]
pub struct ChunkWriter<W> {
    writer: W,
    chunk: ChunkEncoder,
    summary: WriteSummary,
}

impl<W: Write> ChunkWriter<W> {
    /// Create a writer using the default options.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            chunk: ChunkEncoder::new(&ChunkOptions::default()),
            summary: WriteSummary::default(),
        }
    }

    /// Create a writer with the given options. Fails if the options don't
    /// [validate][ChunkOptions::validate].
    pub fn with_options(writer: W, options: &ChunkOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            writer,
            chunk: ChunkEncoder::new(options),
            summary: WriteSummary::default(),
        })
    }

    /// Write a complete list. `None` is written as the null list marker.
    pub fn write_list<T, E>(&mut self, list: Option<&[T]>, encoder: &E) -> Result<WriteSummary>
    where
        E: ElementEncoder<T> + ?Sized,
    {
        match list {
            None => self.write_nil(),
            Some(list) => {
                for item in list {
                    self.push(item, encoder)?;
                }
                self.finish()
            }
        }
    }

    /// Write a complete list, taking the elements from an iterator.
    pub fn write_iter<I, E>(&mut self, iter: I, encoder: &E) -> Result<WriteSummary>
    where
        I: IntoIterator,
        E: ElementEncoder<I::Item> + ?Sized,
    {
        for item in iter {
            self.push(&item, encoder)?;
        }
        self.finish()
    }

    /// Write the null list marker.
    ///
    /// Fails if a list is partway through being written with [`push`][Self::push].
    pub fn write_nil(&mut self) -> Result<WriteSummary> {
        if self.chunk.count() > 0 || self.summary.frames > 0 {
            return Err(Error::BadEncode(
                "can't write a null list while another list is unfinished".to_string(),
            ));
        }
        self.writer.write_all(&[Marker::Null.into()])?;
        self.writer.flush()?;
        log::debug!("wrote null list");
        Ok(WriteSummary {
            frames: 1,
            compressed_frames: 0,
            elements: 0,
            bytes: 1,
        })
    }

    /// Add one element to the list being written. Completed chunks are written out as soon as
    /// they pass the cutoff.
    ///
    /// On failure the list is abandoned: chunks already written stay on the stream, the
    /// unfinished chunk is dropped, and the next element pushed starts a new list.
    pub fn push<T, E>(&mut self, value: &T, encoder: &E) -> Result<()>
    where
        T: ?Sized,
        E: ElementEncoder<T> + ?Sized,
    {
        let result = self.chunk.push(encoder, value).and_then(|full| {
            self.summary.elements += 1;
            if full {
                self.flush_chunk()
            } else {
                Ok(())
            }
        });
        if result.is_err() {
            self.abandon();
        }
        result
    }

    /// Complete the list started with [`push`][Self::push], writing out the last chunk and
    /// flushing the stream. A list with no elements still gets one empty chunk.
    pub fn finish(&mut self) -> Result<WriteSummary> {
        let result = self.finish_inner();
        if result.is_err() {
            self.abandon();
        }
        result
    }

    fn finish_inner(&mut self) -> Result<WriteSummary> {
        if self.chunk.count() > 0 || self.summary.frames == 0 {
            self.flush_chunk()?;
        }
        self.writer.flush()?;
        Ok(std::mem::take(&mut self.summary))
    }

    fn abandon(&mut self) {
        if self.chunk.count() > 0 || self.summary.frames > 0 {
            log::debug!(
                "abandoning list after {} frames, dropping {} unwritten elements",
                self.summary.frames,
                self.chunk.count()
            );
        }
        self.chunk.reset();
        self.summary = WriteSummary::default();
    }

    fn flush_chunk(&mut self) -> Result<()> {
        let writer = &mut self.writer;
        let summary = &mut self.summary;
        self.chunk.close_with(|kind, frame| {
            writer.write_all(frame)?;
            summary.frames += 1;
            summary.bytes += frame.len();
            if kind == FrameKind::Compressed {
                summary.compressed_frames += 1;
            }
            Ok(())
        })
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Unwrap the underlying writer. Any list that hasn't been [finished][Self::finish] is lost.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::formatter::SerdeFormatter;
    use std::io;

    #[test]
    fn null_list() {
        let mut writer = ChunkWriter::new(Vec::new());
        let summary = writer.write_list::<u32, _>(None, &SerdeFormatter).unwrap();
        assert_eq!(summary.frames, 1);
        assert_eq!(summary.bytes, 1);
        assert_eq!(writer.into_inner(), vec![0xc0]);
    }

    #[test]
    fn empty_list() {
        let mut writer = ChunkWriter::new(Vec::new());
        let summary = writer.write_list::<u32, _>(Some(&[][..]), &SerdeFormatter).unwrap();
        assert_eq!(
            summary,
            WriteSummary {
                frames: 1,
                compressed_frames: 0,
                elements: 0,
                bytes: 5
            }
        );
        assert_eq!(writer.into_inner(), vec![0xdd, 0, 0, 0, 0]);
    }

    #[test]
    fn cutoff_splits_chunks() {
        // 5 header bytes + 10 single-byte elements goes past a cutoff of 14 on the 10th element
        let options = ChunkOptions::default().with_cutoff(14);
        let mut writer = ChunkWriter::with_options(Vec::new(), &options).unwrap();
        let list: Vec<u8> = (1..=15).collect();
        let summary = writer.write_list(Some(&list[..]), &SerdeFormatter).unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.elements, 15);
        let out = writer.into_inner();
        assert_eq!(summary.bytes, out.len());
        let mut expected = vec![0xdd, 0, 0, 0, 10];
        expected.extend(1..=10u8);
        expected.extend_from_slice(&[0xdd, 0, 0, 0, 5]);
        expected.extend(11..=15u8);
        assert_eq!(out, expected);
    }

    #[test]
    fn no_trailing_empty_chunk() {
        let options = ChunkOptions::default().with_cutoff(14);
        let mut writer = ChunkWriter::with_options(Vec::new(), &options).unwrap();
        let summary = writer.write_iter(1..=10u8, &SerdeFormatter).unwrap();
        assert_eq!(summary.frames, 1);
        assert_eq!(writer.get_ref().len(), 15);
    }

    #[test]
    fn push_and_finish() {
        let mut writer = ChunkWriter::new(Vec::new());
        for s in ["a", "bc"] {
            writer.push(s, &SerdeFormatter).unwrap();
        }
        let summary = writer.finish().unwrap();
        assert_eq!(summary.elements, 2);
        // The next list starts from scratch
        let summary = writer.write_list(Some(&[7u8][..]), &SerdeFormatter).unwrap();
        assert_eq!(summary.elements, 1);
        assert_eq!(
            writer.into_inner(),
            vec![0xdd, 0, 0, 0, 2, 0xa1, b'a', 0xa2, b'b', b'c', 0xdd, 0, 0, 0, 1, 7]
        );
    }

    #[test]
    fn nil_in_unfinished_list() {
        let mut writer = ChunkWriter::new(Vec::new());
        writer.push(&1u8, &SerdeFormatter).unwrap();
        assert!(writer.write_nil().is_err());
    }

    #[test]
    fn compressed_frames_counted() {
        let mut writer = ChunkWriter::new(Vec::new());
        let list: Vec<u64> = (0..10_000).collect();
        let summary = writer.write_list(Some(&list[..]), &SerdeFormatter).unwrap();
        assert_eq!(summary.frames, 1);
        assert_eq!(summary.compressed_frames, 1);
        let out = writer.into_inner();
        assert_eq!(out[0], 0xc9);
        assert_eq!(summary.bytes, out.len());
    }

    #[test]
    fn bad_options_rejected() {
        let options = ChunkOptions::default().with_cutoff(usize::MAX);
        assert!(ChunkWriter::with_options(Vec::new(), &options).is_err());
    }

    #[test]
    fn reuse_after_element_failure() {
        struct NoFifty;
        impl ElementEncoder<u32> for NoFifty {
            fn encode(&self, buf: &mut Vec<u8>, value: &u32) -> Result<()> {
                if *value == 50 {
                    return Err(Error::SerdeFail("can't encode 50".into()));
                }
                SerdeFormatter.encode(buf, value)
            }
        }
        // The 36th single-byte element takes the chunk to 41 bytes and closes it
        let options = ChunkOptions::default().with_cutoff(40);
        let mut writer = ChunkWriter::with_options(Vec::new(), &options).unwrap();
        let list: Vec<u32> = (0..100).collect();
        assert!(writer.write_list(Some(&list[..]), &NoFifty).is_err());
        let abandoned = writer.get_ref().len();
        assert_eq!(abandoned, 41);

        let summary = writer.write_list(Some(&[7u32][..]), &NoFifty).unwrap();
        assert_eq!(
            summary,
            WriteSummary {
                frames: 1,
                compressed_frames: 0,
                elements: 1,
                bytes: 6
            }
        );
        let out = writer.into_inner();
        let decoded: Option<Vec<u32>> = crate::from_slice(&out[abandoned..]).unwrap();
        assert_eq!(decoded, Some(vec![7]));
    }

    #[test]
    fn nil_after_element_failure() {
        struct Never;
        impl ElementEncoder<u32> for Never {
            fn encode(&self, _: &mut Vec<u8>, _: &u32) -> Result<()> {
                Err(Error::SerdeFail("never".into()))
            }
        }
        let mut writer = ChunkWriter::new(Vec::new());
        assert!(writer.write_list(Some(&[1u32, 2][..]), &Never).is_err());
        writer.write_nil().unwrap();
        assert_eq!(writer.into_inner(), vec![0xc0]);
    }

    struct FailingWriter;

    impl io::Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn io_errors_propagate() {
        let mut writer = ChunkWriter::new(FailingWriter);
        match writer.write_list(Some(&[1u8, 2, 3][..]), &SerdeFormatter) {
            Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::Other),
            other => panic!("expected an I/O error, got {:?}", other),
        }
    }
}

//! Adapters that turn a sequence of elements into a sequence of encoded frames.
//!
//! [`FrameBuilder`] wraps an iterator and [`AsyncFrameBuilder`] wraps a stream. Each yields
//! complete frames as soon as the chunk behind them passes the cutoff, so a huge list can be
//! handed off piece by piece without going through a [`ChunkWriter`][crate::ChunkWriter].
//! Concatenating every frame produced gives the same bytes a `ChunkWriter` would have written.

use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use futures_core::{ready, FusedStream, Stream};
use pin_project_lite::pin_project;

use crate::{
    chunk::ChunkEncoder,
    error::Result,
    formatter::ElementEncoder,
    options::ChunkOptions,
};

#[derive(Clone, Debug)]
struct FrameBuilderInner {
    done: bool,
    frames: usize,
    chunk: ChunkEncoder,
}

impl FrameBuilderInner {
    fn new(options: &ChunkOptions) -> Self {
        Self {
            done: false,
            frames: 0,
            chunk: ChunkEncoder::new(options),
        }
    }

    /// Add an element. Returns a frame if the chunk filled up.
    fn push<T, E>(&mut self, encoder: &E, value: &T) -> Option<Result<Vec<u8>>>
    where
        E: ElementEncoder<T>,
    {
        match self.chunk.push(encoder, value) {
            Ok(true) => Some(self.next_frame()),
            Ok(false) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }

    /// The elements have run out. Returns the final frame, if there is one.
    fn finish(&mut self) -> Option<Result<Vec<u8>>> {
        self.done = true;
        if self.chunk.count() > 0 || self.frames == 0 {
            Some(self.next_frame())
        } else {
            None
        }
    }

    fn next_frame(&mut self) -> Result<Vec<u8>> {
        self.frames += 1;
        let result = self.chunk.close_with(|_, frame| Ok(frame.to_vec()));
        if result.is_err() {
            self.done = true;
        }
        result
    }
}

/// An iterator adapter for building chunk frames.
///
/// Takes an iterator over elements and produces the frames of a single list holding all of them.
/// An empty iterator still produces one frame, holding an empty chunk.
///
/// For the asynchronous version that works on streams, see [`AsyncFrameBuilder`].
#[derive(Clone, Debug)]
pub struct FrameBuilder<I, E>
where
    I: Iterator,
    E: ElementEncoder<I::Item>,
{
    iter: std::iter::Fuse<I>,
    encoder: E,
    inner: FrameBuilderInner,
}

impl<I, E> FrameBuilder<I, E>
where
    I: Iterator,
    E: ElementEncoder<I::Item>,
{
    /// Create a builder using the default options.
    pub fn new(iter: I, encoder: E) -> Self {
        Self {
            iter: iter.fuse(),
            encoder,
            inner: FrameBuilderInner::new(&ChunkOptions::default()),
        }
    }

    /// Create a builder with the given options. Fails if the options don't
    /// [validate][ChunkOptions::validate].
    pub fn with_options(iter: I, encoder: E, options: &ChunkOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            iter: iter.fuse(),
            encoder,
            inner: FrameBuilderInner::new(options),
        })
    }
}

impl<I, E> Iterator for FrameBuilder<I, E>
where
    I: Iterator,
    E: ElementEncoder<I::Item>,
{
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.inner.done {
            return None;
        }
        for item in &mut self.iter {
            if let Some(frame) = self.inner.push(&self.encoder, &item) {
                return Some(frame);
            }
        }
        self.inner.finish()
    }
}

impl<I, E> std::iter::FusedIterator for FrameBuilder<I, E>
where
    I: Iterator,
    E: ElementEncoder<I::Item>,
{
}

pin_project! {
    /// A stream adapter for building chunk frames.
    ///
    /// Takes a stream of elements and produces the frames of a single list holding all of them.
    /// An empty stream still produces one frame, holding an empty chunk.
    ///
    /// For the synchronous version that works on iterators, see [`FrameBuilder`].
    #[must_use = "streams do nothing unless polled"]
    pub struct AsyncFrameBuilder<St, E>
        where
            St: Stream,
            E: ElementEncoder<St::Item>,
    {
        #[pin]
        stream: St,
        encoder: E,
        inner: FrameBuilderInner,
    }
}

impl<St, E> fmt::Debug for AsyncFrameBuilder<St, E>
where
    St: Stream + fmt::Debug,
    E: ElementEncoder<St::Item> + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AsyncFrameBuilder")
            .field("stream", &self.stream)
            .field("encoder", &self.encoder)
            .field("inner", &self.inner)
            .finish()
    }
}

impl<St, E> AsyncFrameBuilder<St, E>
where
    St: Stream,
    E: ElementEncoder<St::Item>,
{
    /// Create a builder using the default options.
    pub fn new(stream: St, encoder: E) -> Self {
        Self {
            stream,
            encoder,
            inner: FrameBuilderInner::new(&ChunkOptions::default()),
        }
    }

    /// Create a builder with the given options. Fails if the options don't
    /// [validate][ChunkOptions::validate].
    pub fn with_options(stream: St, encoder: E, options: &ChunkOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            stream,
            encoder,
            inner: FrameBuilderInner::new(options),
        })
    }
}

impl<St, E> FusedStream for AsyncFrameBuilder<St, E>
where
    St: Stream,
    E: ElementEncoder<St::Item>,
{
    fn is_terminated(&self) -> bool {
        self.inner.done
    }
}

impl<St, E> Stream for AsyncFrameBuilder<St, E>
where
    St: Stream,
    E: ElementEncoder<St::Item>,
{
    type Item = Result<Vec<u8>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Vec<u8>>>> {
        let mut this = self.project();
        if this.inner.done {
            return Poll::Ready(None);
        }
        Poll::Ready(loop {
            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(item) => {
                    if let Some(frame) = this.inner.push(&*this.encoder, &item) {
                        break Some(frame);
                    }
                }
                None => break this.inner.finish(),
            }
        })
    }
}

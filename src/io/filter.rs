// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Stream filter chains.
//!
//! A chain is a comma-separated list of transforms applied to the binary
//! side of a conversion. Both directions walk the list left to right, so the
//! wire form of `a,b` is `a(b(payload))`:
//!
//! - decode: the raw input is unwrapped by `a` first, then by `b`
//! - encode: the payload is wrapped by `b` first, then by `a`
//!
//! Encoders buffer trailers (compression footers, base64 padding) until
//! [`EncodeStream::finish`] runs, which reports any error from the chain.
//!
//! On the decode side, data a filter cannot unwrap fails with
//! [`io::ErrorKind::InvalidData`], while failures of the caller's source
//! keep their own kind.

use std::error::Error;
use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, PAD};
use base64::engine::DecodePaddingMode;

use crate::core::params::FILTERS;
use crate::core::{Parameters, RegistryError, Result};

/// MIME line length for the `base64` filter.
const MIME_LINE_LEN: usize = 76;

/// Standard alphabet, accepting input with or without padding.
static BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// One transform of a filter chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Base64, CRLF-terminated lines of 76 characters.
    Base64,
    /// Base64 without line breaks.
    Base64Raw,
    Bzip2,
    /// zlib-wrapped deflate.
    Deflate,
    Gzip,
    /// LZ4 frame format.
    Lz4,
    /// Snappy frame format.
    Snappy,
    Zstd,
    /// Decode only: drop the first N bytes, or everything up to and
    /// including the first NUL byte when N is 0.
    Skip(usize),
}

impl FilterKind {
    /// Name as written in a filter list.
    pub fn name(&self) -> String {
        match self {
            Self::Base64 => "base64".into(),
            Self::Base64Raw => "base64raw".into(),
            Self::Bzip2 => "bzip2".into(),
            Self::Deflate => "deflate".into(),
            Self::Gzip => "gzip".into(),
            Self::Lz4 => "lz4".into(),
            Self::Snappy => "snappy".into(),
            Self::Zstd => "zstd".into(),
            Self::Skip(n) => format!("skip{n}"),
        }
    }

    /// Whether the filter can wrap an output stream.
    pub fn can_encode(&self) -> bool {
        !matches!(self, Self::Skip(_))
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for FilterKind {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        let kind = match name.as_str() {
            "base64" => Self::Base64,
            "base64raw" => Self::Base64Raw,
            "bzip2" => Self::Bzip2,
            "deflate" => Self::Deflate,
            "gzip" => Self::Gzip,
            "lz4" => Self::Lz4,
            "snappy" => Self::Snappy,
            "zstd" => Self::Zstd,
            other => {
                let count = other
                    .strip_prefix("skip")
                    .and_then(|digits| digits.parse::<usize>().ok())
                    .ok_or_else(|| {
                        RegistryError::invalid_input(
                            "filter",
                            format!("unknown filter '{}'", s.trim()),
                        )
                    })?;
                Self::Skip(count)
            }
        };
        Ok(kind)
    }
}

/// Ordered list of filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterChain {
    filters: Vec<FilterKind>,
}

impl FilterChain {
    /// Parse a comma-separated list. Names are trimmed and matched
    /// case-insensitively; empty names are ignored.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidInput` naming the first unknown filter.
    pub fn parse(list: &str) -> Result<Self> {
        let filters = list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(FilterKind::from_str)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { filters })
    }

    /// Chain named by the `f` parameter; empty when unset.
    pub fn from_params(params: &Parameters) -> Result<Self> {
        params.get(FILTERS).map_or_else(|| Ok(Self::default()), Self::parse)
    }

    /// Filters in list order.
    pub fn filters(&self) -> &[FilterKind] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Wrap `input` so reads yield the unwrapped payload.
    pub fn wrap_reader<'a>(&self, input: Box<dyn Read + 'a>) -> Result<Box<dyn Read + 'a>> {
        if self.filters.is_empty() {
            return Ok(input);
        }
        let mut reader: Box<dyn Read + 'a> = Box::new(Source(input));
        for filter in &self.filters {
            reader = decoder(*filter, reader)?;
        }
        Ok(reader)
    }

    /// Wrap `output` so written payload bytes reach it encoded.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidInput` if the chain holds a decode-only
    /// filter. Nothing is written to `output` in that case.
    pub fn wrap_writer<'a>(&self, output: Box<dyn Write + 'a>) -> Result<EncodeStream<'a>> {
        if let Some(filter) = self.filters.iter().find(|filter| !filter.can_encode()) {
            return Err(RegistryError::invalid_input(
                "filter",
                format!("filter '{filter}' can only be used for decoding"),
            ));
        }

        let mut stage: Stage<'a> = Box::new(Sink(output));
        for filter in &self.filters {
            stage = encoder(*filter, stage)?;
        }
        Ok(EncodeStream { head: stage })
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{filter}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Decoding
// ============================================================================

fn decoder<'a>(filter: FilterKind, inner: Box<dyn Read + 'a>) -> Result<Box<dyn Read + 'a>> {
    let reader: Box<dyn Read + 'a> = match filter {
        FilterKind::Skip(count) => {
            return Ok(Box::new(SkipPrefix {
                inner,
                prefix: Some(count),
            }))
        }
        FilterKind::Base64 | FilterKind::Base64Raw => Box::new(
            base64::read::DecoderReader::new(SkipWhitespace { inner }, &BASE64),
        ),
        FilterKind::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(inner)),
        FilterKind::Deflate => Box::new(flate2::read::ZlibDecoder::new(inner)),
        FilterKind::Gzip => Box::new(flate2::read::MultiGzDecoder::new(inner)),
        FilterKind::Lz4 => Box::new(lz4_flex::frame::FrameDecoder::new(inner)),
        FilterKind::Snappy => Box::new(snap::read::FrameDecoder::new(inner)),
        FilterKind::Zstd => Box::new(zstd::stream::read::Decoder::new(inner)?),
    };
    Ok(Box::new(Checked { filter, inner: reader }))
}

/// Error raised by the caller's source underneath a chain.
#[derive(Debug)]
struct SourceFailure(io::Error);

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Error for SourceFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

/// Input a filter could not unwrap.
#[derive(Debug)]
struct CorruptInput {
    filter: FilterKind,
    reason: String,
}

impl fmt::Display for CorruptInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "corrupt {} data: {}", self.filter, self.reason)
    }
}

impl Error for CorruptInput {}

/// Bottom of every decode chain: the caller's input.
struct Source<'a>(Box<dyn Read + 'a>);

impl Read for Source<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf).map_err(|e| match e.kind() {
            io::ErrorKind::Interrupted => e,
            kind => io::Error::new(kind, SourceFailure(e)),
        })
    }
}

/// Reports decoder failures as corrupt input.
struct Checked<'a> {
    filter: FilterKind,
    inner: Box<dyn Read + 'a>,
}

impl Read for Checked<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).map_err(|e| {
            let passthrough = e.kind() == io::ErrorKind::Interrupted
                || e.get_ref()
                    .is_some_and(|inner| inner.is::<SourceFailure>() || inner.is::<CorruptInput>());
            if passthrough {
                e
            } else {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    CorruptInput {
                        filter: self.filter,
                        reason: e.to_string(),
                    },
                )
            }
        })
    }
}

/// Drops ASCII whitespace, so line-wrapped base64 decodes.
struct SkipWhitespace<R> {
    inner: R,
}

impl<R: Read> Read for SkipWhitespace<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = self.inner.read(buf)?;
            if n == 0 {
                return Ok(0);
            }
            let mut kept = 0;
            for i in 0..n {
                if !buf[i].is_ascii_whitespace() {
                    buf[kept] = buf[i];
                    kept += 1;
                }
            }
            if kept > 0 {
                return Ok(kept);
            }
        }
    }
}

/// Discards a prefix before the first read.
struct SkipPrefix<R> {
    inner: R,
    /// Pending skip; `Some(0)` means "through the first NUL byte".
    prefix: Option<usize>,
}

impl<R: Read> SkipPrefix<R> {
    fn skip(&mut self, count: usize) -> io::Result<()> {
        if count > 0 {
            io::copy(&mut (&mut self.inner).take(count as u64), &mut io::sink())?;
            return Ok(());
        }

        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(()),
                Ok(_) if byte[0] == 0 => return Ok(()),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read> Read for SkipPrefix<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(count) = self.prefix.take() {
            self.skip(count)?;
        }
        self.inner.read(buf)
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// A writer whose trailer is flushed by an explicit, fallible `finish`.
trait StageWriter: Write {
    /// Write any trailer, then finish the stages below.
    fn finish(self: Box<Self>) -> io::Result<()>;
}

type Stage<'a> = Box<dyn StageWriter + 'a>;

/// Bottom of every chain: the caller's output.
struct Sink<'a>(Box<dyn Write + 'a>);

impl Write for Sink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl StageWriter for Sink<'_> {
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.0.flush()
    }
}

/// Inserts CRLF after every `line_len` bytes and after a final partial line.
struct LineWrap<W> {
    inner: W,
    line_len: Option<usize>,
    column: usize,
}

impl<W: Write> LineWrap<W> {
    fn new(inner: W, line_len: Option<usize>) -> Self {
        Self {
            inner,
            line_len,
            column: 0,
        }
    }

    fn into_inner(mut self) -> io::Result<W> {
        if self.line_len.is_some() && self.column > 0 {
            self.inner.write_all(b"\r\n")?;
        }
        Ok(self.inner)
    }
}

impl<W: Write> Write for LineWrap<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let Some(line_len) = self.line_len else {
            return self.inner.write(buf);
        };

        let mut rest = buf;
        while !rest.is_empty() {
            let take = rest.len().min(line_len - self.column);
            self.inner.write_all(&rest[..take])?;
            self.column += take;
            rest = &rest[take..];
            if self.column == line_len {
                self.inner.write_all(b"\r\n")?;
                self.column = 0;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

enum Encoder<'a> {
    Base64(base64::write::EncoderWriter<'static, GeneralPurpose, LineWrap<Stage<'a>>>),
    Bzip2(bzip2::write::BzEncoder<Stage<'a>>),
    Deflate(flate2::write::ZlibEncoder<Stage<'a>>),
    Gzip(flate2::write::GzEncoder<Stage<'a>>),
    Lz4(lz4_flex::frame::FrameEncoder<Stage<'a>>),
    Snappy(snap::write::FrameEncoder<Stage<'a>>),
    Zstd(zstd::stream::write::Encoder<'static, Stage<'a>>),
}

fn encoder<'a>(filter: FilterKind, inner: Stage<'a>) -> Result<Stage<'a>> {
    let encoder = match filter {
        FilterKind::Base64 => Encoder::Base64(base64::write::EncoderWriter::new(
            LineWrap::new(inner, Some(MIME_LINE_LEN)),
            &BASE64,
        )),
        FilterKind::Base64Raw => Encoder::Base64(base64::write::EncoderWriter::new(
            LineWrap::new(inner, None),
            &BASE64,
        )),
        FilterKind::Bzip2 => Encoder::Bzip2(bzip2::write::BzEncoder::new(
            inner,
            bzip2::Compression::default(),
        )),
        FilterKind::Deflate => Encoder::Deflate(flate2::write::ZlibEncoder::new(
            inner,
            flate2::Compression::default(),
        )),
        FilterKind::Gzip => Encoder::Gzip(flate2::write::GzEncoder::new(
            inner,
            flate2::Compression::default(),
        )),
        FilterKind::Lz4 => Encoder::Lz4(lz4_flex::frame::FrameEncoder::new(inner)),
        FilterKind::Snappy => Encoder::Snappy(snap::write::FrameEncoder::new(inner)),
        FilterKind::Zstd => Encoder::Zstd(zstd::stream::write::Encoder::new(inner, 0)?),
        FilterKind::Skip(_) => {
            return Err(RegistryError::invalid_input(
                "filter",
                format!("filter '{filter}' can only be used for decoding"),
            ))
        }
    };
    Ok(Box::new(encoder))
}

impl Write for Encoder<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Base64(w) => w.write(buf),
            Self::Bzip2(w) => w.write(buf),
            Self::Deflate(w) => w.write(buf),
            Self::Gzip(w) => w.write(buf),
            Self::Lz4(w) => w.write(buf),
            Self::Snappy(w) => w.write(buf),
            Self::Zstd(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Base64(w) => w.flush(),
            Self::Bzip2(w) => w.flush(),
            Self::Deflate(w) => w.flush(),
            Self::Gzip(w) => w.flush(),
            Self::Lz4(w) => w.flush(),
            Self::Snappy(w) => w.flush(),
            Self::Zstd(w) => w.flush(),
        }
    }
}

impl StageWriter for Encoder<'_> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let inner = match *self {
            Self::Base64(mut w) => w.finish()?.into_inner()?,
            Self::Bzip2(w) => w.finish()?,
            Self::Deflate(w) => w.finish()?,
            Self::Gzip(w) => w.finish()?,
            Self::Lz4(w) => w
                .finish()
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?,
            Self::Snappy(w) => w
                .into_inner()
                .map_err(|e| io::Error::new(e.error().kind(), e.error().to_string()))?,
            Self::Zstd(w) => w.finish()?,
        };
        inner.finish()
    }
}

/// Output side of a filter chain.
///
/// Dropping the stream without calling [`finish`](Self::finish) may leave
/// the output truncated.
pub struct EncodeStream<'a> {
    head: Stage<'a>,
}

impl EncodeStream<'_> {
    /// Write every trailer down the chain and flush the output.
    pub fn finish(self) -> Result<()> {
        self.head.finish()?;
        Ok(())
    }
}

impl Write for EncodeStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.head.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.head.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(list: &str, payload: &[u8]) -> Vec<u8> {
        let chain = FilterChain::parse(list).unwrap();
        let mut out = Vec::new();
        let mut stream = chain.wrap_writer(Box::new(&mut out)).unwrap();
        stream.write_all(payload).unwrap();
        stream.finish().unwrap();
        out
    }

    fn decode(list: &str, wire: &[u8]) -> Vec<u8> {
        let chain = FilterChain::parse(list).unwrap();
        let mut reader = chain.wrap_reader(Box::new(wire)).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_parse_chain() {
        let chain = FilterChain::parse(" GZIP , ,base64,skip4,").unwrap();
        assert_eq!(
            chain.filters(),
            &[FilterKind::Gzip, FilterKind::Base64, FilterKind::Skip(4)]
        );
        assert_eq!(chain.to_string(), "gzip,base64,skip4");
        assert!(FilterChain::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_filter() {
        let err = FilterChain::parse("gzip,lzma").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidInput { .. }));
        assert!(err.to_string().contains("lzma"));
        assert!(FilterChain::parse("skipx").is_err());
    }

    #[test]
    fn test_skip_rejected_for_encoding() {
        let chain = FilterChain::parse("skip2").unwrap();
        let mut out = Vec::new();
        assert!(chain.wrap_writer(Box::new(&mut out)).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_base64_mime_lines() {
        let payload = vec![0xabu8; 60];
        let encoded = encode("base64", &payload);
        let text = String::from_utf8(encoded.clone()).unwrap();
        let lines: Vec<&str> = text.split("\r\n").collect();
        assert_eq!(lines[0].len(), 76);
        assert_eq!(lines[1].len(), 4);
        assert_eq!(lines[2], "");
        assert_eq!(decode("base64", &encoded), payload);
    }

    #[test]
    fn test_base64raw() {
        assert_eq!(encode("base64raw", b"hello"), b"aGVsbG8=");
        assert_eq!(decode("base64raw", b"aGVs\nbG8="), b"hello");
        assert_eq!(decode("base64raw", b"aGVsbG8"), b"hello");
    }

    #[test]
    fn test_chain_symmetry() {
        let payload: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        for list in [
            "gzip", "deflate", "bzip2", "lz4", "snappy", "zstd", "gzip,base64", "base64,zstd",
            "snappy,lz4,base64raw",
        ] {
            let wire = encode(list, &payload);
            assert_eq!(decode(list, &wire), payload, "chain {list}");
        }
    }

    #[test]
    fn test_chain_order() {
        // wire form of "base64,gzip" is base64(gzip(payload))
        let wire = encode("base64,gzip", b"payload");
        let gzipped = decode("base64", &wire);
        assert_eq!(decode("gzip", &gzipped), b"payload");
    }

    struct Failing(io::ErrorKind);

    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(self.0, "source closed"))
        }
    }

    fn decode_err(list: &str, input: Box<dyn Read>) -> io::Error {
        let chain = FilterChain::parse(list).unwrap();
        let mut reader = chain.wrap_reader(input).unwrap();
        reader.read_to_end(&mut Vec::new()).unwrap_err()
    }

    #[test]
    fn test_corrupt_input_is_invalid_data() {
        for (list, wire) in [
            ("base64", &b"not*base64!"[..]),
            ("gzip", &b"plain text, not gzip"[..]),
            ("zstd", &b"\x00\x01\x02\x03 not a frame"[..]),
            ("lz4", &b"\x00\x01\x02\x03 not a frame"[..]),
            ("snappy", &b"\x00\x01\x02\x03 not a frame"[..]),
            ("gzip,base64", &b"H4sI"[..]),
        ] {
            let err = decode_err(list, Box::new(wire));
            assert_eq!(err.kind(), io::ErrorKind::InvalidData, "chain {list}: {err}");
            assert!(err.to_string().starts_with("corrupt "), "chain {list}: {err}");
        }
    }

    #[test]
    fn test_source_failure_keeps_its_kind() {
        for list in ["base64", "gzip", "zstd,base64", "gzip,base64", "skip2"] {
            let err = decode_err(list, Box::new(Failing(io::ErrorKind::BrokenPipe)));
            assert_eq!(err.kind(), io::ErrorKind::BrokenPipe, "chain {list}: {err}");
            assert_eq!(err.to_string(), "source closed");
        }
    }

    #[test]
    fn test_skip() {
        assert_eq!(decode("skip3", b"abcdef"), b"def");
        assert_eq!(decode("skip0", b"header\0body"), b"body");
        assert_eq!(decode("skip0", b"no-nul"), b"");
        assert_eq!(decode("skip10", b"short"), b"");
    }
}

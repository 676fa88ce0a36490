/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Tokenizing stylesheets that are not decoded yet.

use std::borrow::Cow;
use std::io::{self, Read};

use encoding_rs::{CoderResult, Decoder, Encoding, UTF_16BE, UTF_16LE, UTF_8};
use tracing::warn;

use crate::rune_source::Runes;
use crate::tokenizer::Tokenizer;

/// How many bytes are read up front to look for a BOM or an `@charset` rule.
const SNIFF_LENGTH: usize = 1024;

const CHUNK_SIZE: usize = 8 * 1024;

/// Determine the character encoding of a CSS stylesheet.
///
/// This is based on the presence of a BOM (Byte Order Mark), an `@charset` rule, and
/// encoding meta-information.
///
/// * `css`: The stylesheet, or at least its first bytes.
/// * `protocol_encoding_label`: The encoding label, if any, defined by HTTP or equivalent protocol.
///     (e.g. via the `charset` parameter of the `Content-Type` header.)
/// * `environment_encoding`: An optional `Encoding` object for the [environment encoding]
///     (https://drafts.csswg.org/css-syntax/#environment-encoding), if any.
pub fn stylesheet_encoding(
    css: &[u8],
    protocol_encoding_label: Option<&str>,
    environment_encoding: Option<&'static Encoding>,
) -> &'static Encoding {
    // https://drafts.csswg.org/css-syntax/#the-input-byte-stream
    if let Some((encoding, _bom_length)) = Encoding::for_bom(css) {
        return encoding;
    }
    if let Some(encoding) = protocol_encoding_label.and_then(|label| Encoding::for_label(label.as_bytes())) {
        return encoding;
    }
    if let Some(encoding) = charset_rule_encoding(css) {
        return encoding;
    }
    environment_encoding.unwrap_or(UTF_8)
}

/// The encoding named by an `@charset "…";` rule at the very start of `css`.
fn charset_rule_encoding(css: &[u8]) -> Option<&'static Encoding> {
    const PREFIX: &[u8] = b"@charset \"";
    let rest = css.strip_prefix(PREFIX)?;
    // No encoding label is longer than this.
    let rest = &rest[..rest.len().min(SNIFF_LENGTH - PREFIX.len())];
    let label_length = rest.iter().position(|&b| b == b'"')?;
    if !rest[label_length..].starts_with(b"\";") {
        return None;
    }
    let encoding = Encoding::for_label(&rest[..label_length])?;
    if encoding == UTF_16BE || encoding == UTF_16LE {
        // An ASCII-compatible `@charset` cannot have been written in UTF-16.
        Some(UTF_8)
    } else {
        Some(encoding)
    }
}

/// Determine the character encoding of a CSS stylesheet and decode it.
///
/// See `stylesheet_encoding` for the arguments.
/// Malformed byte sequences are replaced with U+FFFD.
///
/// Returns the decoded text and the `Encoding` that was used.
pub fn decode_stylesheet_bytes<'a>(
    css: &'a [u8],
    protocol_encoding_label: Option<&str>,
    environment_encoding: Option<&'static Encoding>,
) -> (Cow<'a, str>, &'static Encoding) {
    let encoding = stylesheet_encoding(css, protocol_encoding_label, environment_encoding);
    let (text, _had_errors) = encoding.decode_with_bom_removal(css);
    (text, encoding)
}

/// Decodes a byte stream into code points as they are needed.
///
/// The encoding is determined from the first bytes of the stream, as by
/// `stylesheet_encoding`. Malformed byte sequences are replaced with U+FFFD.
/// An I/O error ends the stream; it is then available from `io_error`.
pub struct DecodeReader<R> {
    reader: R,
    encoding: &'static Encoding,
    decoder: Decoder,

    /// Bytes read but not yet given to the decoder.
    pending: Vec<u8>,

    decoded: String,

    /// Counted in bytes into `decoded`.
    position: usize,

    reader_done: bool,
    finished: bool,
    error: Option<io::Error>,
}

impl<R: Read> DecodeReader<R> {
    /// Start decoding `reader`.
    ///
    /// Fails if reading the first bytes fails.
    pub fn new(
        mut reader: R,
        protocol_encoding_label: Option<&str>,
        environment_encoding: Option<&'static Encoding>,
    ) -> io::Result<Self> {
        let mut pending = Vec::with_capacity(SNIFF_LENGTH);
        let reader_done = (&mut reader).take(SNIFF_LENGTH as u64).read_to_end(&mut pending)? < SNIFF_LENGTH;
        let encoding = stylesheet_encoding(&pending, protocol_encoding_label, environment_encoding);
        Ok(DecodeReader {
            reader,
            encoding,
            decoder: encoding.new_decoder_with_bom_removal(),
            pending,
            decoded: String::new(),
            position: 0,
            reader_done,
            finished: false,
            error: None,
        })
    }

    /// The encoding the stream is decoded with.
    #[inline]
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// The error that ended the stream early, if any.
    #[inline]
    pub fn io_error(&self) -> Option<&io::Error> {
        self.error.as_ref()
    }

    fn read_chunk(&mut self) {
        let mut chunk = [0; CHUNK_SIZE];
        loop {
            match self.reader.read(&mut chunk) {
                Ok(0) => self.reader_done = true,
                Ok(length) => self.pending.extend_from_slice(&chunk[..length]),
                Err(ref error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => {
                    warn!(%error, "reading the stylesheet failed, treating it as the end of input");
                    self.error = Some(error);
                    self.reader_done = true;
                }
            }
            return;
        }
    }

    fn decode_more(&mut self) {
        self.decoded.clear();
        self.position = 0;
        if self.pending.is_empty() && !self.reader_done {
            self.read_chunk();
        }
        let last = self.reader_done;
        let capacity = self
            .decoder
            .max_utf8_buffer_length(self.pending.len())
            .unwrap_or(CHUNK_SIZE * 3);
        self.decoded.reserve(capacity);
        let (result, read, _had_errors) = self.decoder.decode_to_string(&self.pending, &mut self.decoded, last);
        self.pending.drain(..read);
        if last && result == CoderResult::InputEmpty && self.pending.is_empty() {
            self.finished = true;
        }
    }
}

impl<R: Read> Iterator for DecodeReader<R> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        loop {
            if let Some(c) = self.decoded[self.position..].chars().next() {
                self.position += c.len_utf8();
                return Some(c);
            }
            if self.finished {
                return None;
            }
            self.decode_more();
        }
    }
}

impl<R: Read> Runes<DecodeReader<R>> {
    /// A source decoding a byte stream. See `DecodeReader::new`.
    pub fn from_reader(
        reader: R,
        protocol_encoding_label: Option<&str>,
        environment_encoding: Option<&'static Encoding>,
    ) -> io::Result<Self> {
        let reader = DecodeReader::new(reader, protocol_encoding_label, environment_encoding)?;
        Ok(Runes::new(reader))
    }
}

impl<R: Read> Tokenizer<Runes<DecodeReader<R>>> {
    /// Tokenize a byte stream. See `DecodeReader::new`.
    pub fn from_reader(
        reader: R,
        protocol_encoding_label: Option<&str>,
        environment_encoding: Option<&'static Encoding>,
    ) -> io::Result<Self> {
        let source = Runes::from_reader(reader, protocol_encoding_label, environment_encoding)?;
        Ok(Tokenizer::from_source(source))
    }
}

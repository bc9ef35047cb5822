use std::borrow::Cow;
use std::io::{BufRead, ErrorKind};

use log::warn;

const DEFAULT_DELIMITERS: &[u8] = b" \t\n\r";

/// Splits a byte stream into delimiter-separated tokens, one line at a time.
///
/// The stream is read incrementally and never needs to be seekable. A read
/// error is reported once and then treated as the end of the stream.
pub struct Tokenizer<R> {
    reader: R,
    delimiters: Vec<u8>,
    trim_leading: bool,
    token: Vec<u8>,
    eol: bool,
    eof: bool,
}

impl<R: BufRead> Tokenizer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            delimiters: DEFAULT_DELIMITERS.to_vec(),
            trim_leading: true,
            token: Vec::new(),
            eol: false,
            eof: false,
        }
    }

    /// Newline always ends a line whether or not it is listed here
    pub fn set_delimiters(&mut self, delimiters: &[u8]) {
        self.delimiters = delimiters.to_vec();
    }

    /// When off, consecutive delimiters yield empty tokens
    pub fn set_trim_leading(&mut self, trim: bool) {
        self.trim_leading = trim;
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn is_delimiter(&self, b: u8) -> bool {
        self.delimiters.contains(&b)
    }

    fn peek(&mut self) -> Option<u8> {
        if self.eof {
            return None;
        }
        loop {
            match self.reader.fill_buf() {
                Ok(buf) => {
                    let next = buf.first().copied();
                    if next.is_none() {
                        self.eof = true;
                    }
                    return next;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("read error, treating as end of stream: {}", e);
                    self.eof = true;
                    return None;
                }
            }
        }
    }

    fn bump(&mut self) {
        self.reader.consume(1);
    }

    /// Starts a new line; tokens can be read again after an end-of-line
    pub fn begin_line(&mut self) {
        self.eol = false;
    }

    pub fn is_eol(&self) -> bool {
        self.eol
    }

    pub fn at_end_of_stream(&mut self) -> bool {
        self.peek().is_none()
    }

    /// Next token on the current line, or `None` once the line (or the
    /// stream) has ended. The terminating delimiter or newline is consumed.
    pub fn next_token(&mut self) -> Option<&[u8]> {
        if self.eol {
            return None;
        }
        self.token.clear();

        if self.trim_leading {
            loop {
                match self.peek() {
                    None => {
                        self.eol = true;
                        return None;
                    }
                    Some(b'\n') => {
                        self.bump();
                        self.eol = true;
                        return None;
                    }
                    Some(b) if self.is_delimiter(b) => self.bump(),
                    Some(_) => break,
                }
            }
        }

        loop {
            match self.peek() {
                None => {
                    self.eol = true;
                    break;
                }
                Some(b'\n') => {
                    self.bump();
                    self.eol = true;
                    break;
                }
                Some(b) if self.is_delimiter(b) => {
                    self.bump();
                    break;
                }
                Some(b) => {
                    self.token.push(b);
                    self.bump();
                }
            }
        }

        if self.eol && self.token.is_empty() {
            None
        } else {
            Some(self.token.as_slice())
        }
    }

    /// The most recent token
    pub fn token(&self) -> &[u8] {
        &self.token
    }

    pub fn token_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.token)
    }

    /// Discards the rest of the current line, newline included
    pub fn finish_line(&mut self) {
        while !self.eol && !self.eof {
            let (used, found) = match self.reader.fill_buf() {
                Ok([]) => {
                    self.eof = true;
                    break;
                }
                Ok(buf) => match buf.iter().position(|&b| b == b'\n') {
                    Some(i) => (i + 1, true),
                    None => (buf.len(), false),
                },
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("read error, treating as end of stream: {}", e);
                    self.eof = true;
                    break;
                }
            };
            self.reader.consume(used);
            self.eol = found;
        }
        self.eol = true;
    }
}

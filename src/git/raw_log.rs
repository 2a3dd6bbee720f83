//! Incremental tokenizer for `git log --pretty=raw --name-status -z` output.
//!
//! The stream is consumed line by line (split on `\n`). Three kinds of lines
//! matter:
//!
//! - `commit <id>[ (from <parent>)]` → `Token::Commit`
//! - `committer <name> <email> <unix-seconds> <±HHMM>` → `Token::Timestamp`
//! - a line holding NUL bytes → `Token::FileList`. With `-z`, each status
//!   letter and each path is NUL-terminated, and the next commit's header is
//!   glued onto the same line behind one more NUL, e.g.
//!   `M\0a.txt\0D\0b.txt\0\0commit 3f2c…`. That line yields the file list and
//!   then a `Token::Commit` for the glued header. The last record of the
//!   stream ends in a bare NUL instead.
//!
//! Under `-m` a merge shows up once per parent, each time behind a
//! `commit <id> (from <parent>)` header carrying the same `<id>`.
//!
//! Everything else (tree/parent/author headers, message body) is skipped.
//! The tokenizer never touches the transport: callers `feed` whatever bytes
//! they read and get `Next::NeedMore` until a full line is buffered.

use crate::models::{ChangeKind, ChangedPathEntry, CommitTime, commit_time};

const COMMIT_PREFIX: &[u8] = b"commit ";
const COMMITTER_PREFIX: &[u8] = b"committer ";
const COMMIT_MARKER: &[u8] = b"\0commit ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Start of a commit block, with the commit id.
    Commit(String),
    Timestamp(CommitTime),
    /// Changed paths with their status, deletions included.
    FileList(Vec<ChangedPathEntry>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    Ready(Token),
    /// No complete line is buffered; feed more bytes or call `finish`.
    NeedMore,
    /// `finish` was called and everything buffered has been consumed.
    Eof,
}

#[derive(Debug, Default)]
pub struct RawLogTokenizer {
    buf: Vec<u8>,
    pos: usize,
    finished: bool,
    /// Second token of a line that produced two.
    queued: Option<Token>,
}

impl RawLogTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        self.buf.extend_from_slice(bytes);
    }

    /// Marks end of input. A trailing line without `\n` becomes tokenizable.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Bytes buffered but not yet consumed.
    pub fn pending(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn next_token(&mut self) -> Next {
        if let Some(token) = self.queued.take() {
            return Next::Ready(token);
        }
        loop {
            let start = self.pos;
            let rest = &self.buf[start..];
            let len = match rest.iter().position(|&b| b == b'\n') {
                Some(i) => {
                    self.pos = start + i + 1;
                    i
                }
                None if self.finished && !rest.is_empty() => {
                    self.pos = self.buf.len();
                    rest.len()
                }
                None if self.finished => return Next::Eof,
                None => return Next::NeedMore,
            };

            if let Some((token, next)) = tokenize_line(&self.buf[start..start + len]) {
                self.queued = next;
                return Next::Ready(token);
            }
        }
    }
}

fn tokenize_line(line: &[u8]) -> Option<(Token, Option<Token>)> {
    // Header lines never hold a NUL; a file list may start with any bytes.
    if line.contains(&0) {
        let (body, next) = split_commit_marker(line);
        return Some((Token::FileList(parse_name_status(body)), next.map(Token::Commit)));
    }
    if line.starts_with(COMMITTER_PREFIX) {
        return parse_committer(line).map(|time| (Token::Timestamp(time), None));
    }
    if let Some(tail) = line.strip_prefix(COMMIT_PREFIX) {
        return commit_id(tail).map(|id| (Token::Commit(id), None));
    }
    None
}

/// Reads the last two whitespace-separated fields: Unix seconds and `±HHMM`.
pub fn parse_committer(line: &[u8]) -> Option<CommitTime> {
    let text = std::str::from_utf8(line).ok()?;
    let mut fields = text.split_ascii_whitespace().rev();
    let zone = fields.next()?;
    let seconds: i64 = fields.next()?.parse().ok()?;
    commit_time(seconds, parse_offset(zone)?)
}

/// `+0530` → 330, `-0800` → -480.
fn parse_offset(zone: &str) -> Option<i32> {
    let (sign, digits) = match zone.as_bytes().first()? {
        b'+' => (1, &zone[1..]),
        b'-' => (-1, &zone[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    Some(sign * (hours * 60 + minutes))
}

/// Maps a `--name-status` letter. Rename and copy letters carry a score suffix.
pub fn status_kind(status: &[u8]) -> Option<ChangeKind> {
    match status.first()? {
        b'A' => Some(ChangeKind::Added),
        b'M' => Some(ChangeKind::Modified),
        b'D' => Some(ChangeKind::Deleted),
        b'T' => Some(ChangeKind::TypeChanged),
        b'R' => Some(ChangeKind::Renamed),
        b'C' => Some(ChangeKind::Copied),
        _ => None,
    }
}

/// Reads `status\0path\0` pairs. Renames and copies list source then
/// destination; the destination is kept. Unknown letters are skipped.
fn parse_name_status(body: &[u8]) -> Vec<ChangedPathEntry> {
    let mut fields = body.split(|&b| b == 0).filter(|f| !f.is_empty());
    let mut entries = Vec::new();

    while let Some(status) = fields.next() {
        let kind = status_kind(status);
        let path = match kind {
            Some(ChangeKind::Renamed | ChangeKind::Copied) => fields.nth(1),
            _ => fields.next(),
        };
        let (Some(kind), Some(path)) = (kind, path) else {
            continue;
        };
        entries.push(ChangedPathEntry::new(String::from_utf8_lossy(path), kind));
    }
    entries
}

/// Separates a file-list line from the commit header glued onto its end.
fn split_commit_marker(line: &[u8]) -> (&[u8], Option<String>) {
    if let Some(body) = line.strip_suffix(b"\0") {
        return (body, None);
    }
    let Some(at) = line
        .windows(COMMIT_MARKER.len())
        .rposition(|w| w == COMMIT_MARKER)
    else {
        return (line, None);
    };
    match commit_id(&line[at + COMMIT_MARKER.len()..]) {
        Some(id) => (&line[..at], Some(id)),
        None => (line, None),
    }
}

/// Parses `<hex>[ (from <hex>)]` and returns the first id.
fn commit_id(tail: &[u8]) -> Option<String> {
    let hex_len = tail.iter().take_while(|b| b.is_ascii_hexdigit()).count();
    if hex_len == 0 {
        return None;
    }
    let (id, after) = tail.split_at(hex_len);
    if !after.is_empty() {
        let parent = after.strip_prefix(b" (from ")?.strip_suffix(b")")?;
        if parent.is_empty() || !parent.iter().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
    }
    Some(String::from_utf8_lossy(id).into_owned())
}

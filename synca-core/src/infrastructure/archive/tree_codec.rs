// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Tree Codec
//!
//! A deliberately simple stand-in for the real archive wire format, which
//! spec.md §1 explicitly scopes out as an external collaborator. Frames a
//! directory tree (regular files, directories, block devices) as a flat
//! sequence of tagged headers interleaved with file content, and parses that
//! same stream back incrementally — input arrives through `put_data` in
//! chunk-sized pieces that need not align with header or content
//! boundaries, so the decoder buffers and re-synchronizes as bytes arrive.
//!
//! Block device *content* is out of scope here (mirroring spec.md's own
//! non-goals around special-file content); only the node's presence, path,
//! and permission bits round-trip.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use synca_domain::{ArchiveDecoder, ArchiveEncoder, BaseMode, DecodeStep, EncodeStep, SyncError};

use crate::infrastructure::fs_util;

const TAG_DIR: u8 = 1;
const TAG_REG: u8 = 2;
const TAG_BLK: u8 = 3;
const TAG_END_DIR: u8 = 4;

/// Bytes read per `Data` step from a regular file's content, bounding the
/// work done in any one `Step` call.
const STREAM_CHUNK: usize = 64 * 1024;

fn entry_mode(meta: &std::fs::Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o7777
    }
    #[cfg(not(unix))]
    {
        let _ = meta;
        0o644
    }
}

#[cfg(unix)]
fn is_block_device(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::FileTypeExt;
    meta.file_type().is_block_device()
}

#[cfg(not(unix))]
fn is_block_device(_meta: &std::fs::Metadata) -> bool {
    false
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

fn not_ready(what: &str) -> SyncError {
    SyncError::not_ready(format!("tree codec: {what}"))
}

enum EncoderItem {
    Dir { rel: PathBuf, mode: u32 },
    EndDir,
    Reg { rel: PathBuf, mode: u32, abs: PathBuf, size: u64 },
    Blk { rel: PathBuf, mode: u32 },
}

struct CurrentRead {
    file: File,
    remaining: u64,
}

/// Walks a base filesystem tree, producing archive bytes one `step` at a
/// time: a header frame per entry, then content bytes for regular files.
pub struct TreeEncoder {
    queue: VecDeque<EncoderItem>,
    current_read: Option<CurrentRead>,
    data_buf: Vec<u8>,
    current_path: Option<PathBuf>,
    current_mode: Option<u32>,
    base_root: Option<File>,
    root_reg_fd: Option<File>,
    started: bool,
}

impl TreeEncoder {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            current_read: None,
            data_buf: Vec::new(),
            current_path: None,
            current_mode: None,
            base_root: None,
            root_reg_fd: None,
            started: false,
        }
    }

    fn walk_dir(abs_dir: &Path, rel_dir: &Path, out: &mut VecDeque<EncoderItem>) -> io::Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(abs_dir)?.collect::<Result<_, _>>()?;
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let abs = entry.path();
            let rel = rel_dir.join(entry.file_name());
            let meta = entry.metadata()?;
            let mode = entry_mode(&meta);
            if meta.is_dir() {
                out.push_back(EncoderItem::Dir { rel: rel.clone(), mode });
                Self::walk_dir(&abs, &rel, out)?;
                out.push_back(EncoderItem::EndDir);
            } else if is_block_device(&meta) {
                out.push_back(EncoderItem::Blk { rel, mode });
            } else if meta.is_file() {
                out.push_back(EncoderItem::Reg { rel, mode, abs, size: meta.len() });
            }
        }
        Ok(())
    }

    fn frame_entry(&mut self, tag: u8, rel: &Path, mode: u32, size: Option<u64>) {
        let name = rel.to_string_lossy().replace('\\', "/");
        let name_bytes = name.as_bytes();
        let mut buf = Vec::with_capacity(1 + 2 + name_bytes.len() + 4 + 8);
        buf.push(tag);
        buf.extend_from_slice(&(name_bytes.len() as u16).to_le_bytes());
        buf.extend_from_slice(name_bytes);
        buf.extend_from_slice(&mode.to_le_bytes());
        if let Some(size) = size {
            buf.extend_from_slice(&size.to_le_bytes());
        }
        self.data_buf = buf;
    }
}

impl Default for TreeEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveEncoder for TreeEncoder {
    fn set_base_fd(&mut self, fd: File) -> Result<(), SyncError> {
        if self.started {
            return Err(SyncError::busy("encoder base already set"));
        }
        self.started = true;
        let meta = fd.metadata()?;
        if meta.is_dir() {
            let root_path = fs_util::resolve_fd_path(&fd)?;
            Self::walk_dir(&root_path, Path::new(""), &mut self.queue)?;
            self.base_root = Some(fd);
        } else if is_block_device(&meta) {
            tracing::debug!("encoding a block-device base; content bytes are not emitted");
            self.queue.push_back(EncoderItem::Blk {
                rel: PathBuf::from("."),
                mode: entry_mode(&meta),
            });
            self.base_root = Some(fd);
        } else {
            let size = meta.len();
            let mode = entry_mode(&meta);
            self.root_reg_fd = Some(fd);
            self.queue.push_back(EncoderItem::Reg {
                rel: PathBuf::from("."),
                mode,
                abs: PathBuf::new(),
                size,
            });
        }
        Ok(())
    }

    fn step(&mut self) -> Result<EncodeStep, SyncError> {
        if let Some(cur) = self.current_read.as_mut() {
            let to_read = cur.remaining.min(STREAM_CHUNK as u64) as usize;
            if to_read == 0 {
                self.current_read = None;
            } else {
                self.data_buf.resize(to_read, 0);
                cur.file.read_exact(&mut self.data_buf)?;
                cur.remaining -= to_read as u64;
                return Ok(EncodeStep::Data);
            }
        }

        match self.queue.pop_front() {
            None => Ok(EncodeStep::Finished),
            Some(EncoderItem::Dir { rel, mode }) => {
                self.frame_entry(TAG_DIR, &rel, mode, None);
                self.current_path = Some(rel);
                self.current_mode = Some(mode);
                Ok(EncodeStep::NextFile)
            }
            Some(EncoderItem::EndDir) => {
                self.data_buf = vec![TAG_END_DIR];
                Ok(EncodeStep::Data)
            }
            Some(EncoderItem::Blk { rel, mode }) => {
                self.frame_entry(TAG_BLK, &rel, mode, None);
                self.current_path = Some(rel);
                self.current_mode = Some(mode);
                Ok(EncodeStep::NextFile)
            }
            Some(EncoderItem::Reg { rel, mode, abs, size }) => {
                // The root-is-a-file case handed its `File` to `set_base_fd`
                // up front; nested files are opened here by path. Either
                // way the read is deferred until after this header frame is
                // returned, so content bytes never precede their header.
                self.current_read = Some(if let Some(file) = self.root_reg_fd.take() {
                    CurrentRead { file, remaining: size }
                } else {
                    CurrentRead { file: File::open(&abs)?, remaining: size }
                });
                self.frame_entry(TAG_REG, &rel, mode, Some(size));
                self.current_path = Some(rel);
                self.current_mode = Some(mode);
                Ok(EncodeStep::NextFile)
            }
        }
    }

    fn get_data(&self) -> &[u8] {
        &self.data_buf
    }

    fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    fn current_mode(&self) -> Option<u32> {
        self.current_mode
    }
}

enum ParseState {
    Header,
    Content { remaining: u64 },
}

/// Materializes a base filesystem tree from archive bytes delivered
/// incrementally via `put_data`/`put_data_fd`.
pub struct TreeDecoder {
    root_fd: Option<File>,
    root_is_dir: bool,
    root_path: Option<PathBuf>,
    archive_fd: Option<File>,
    pending: Vec<u8>,
    parse_state: ParseState,
    current_write: Option<File>,
    current_path: Option<PathBuf>,
    current_mode: Option<u32>,
    eof_signaled: bool,
    finished: bool,
}

impl TreeDecoder {
    pub fn new() -> Self {
        Self {
            root_fd: None,
            root_is_dir: false,
            root_path: None,
            archive_fd: None,
            pending: Vec::new(),
            parse_state: ParseState::Header,
            current_write: None,
            current_path: None,
            current_mode: None,
            eof_signaled: false,
            finished: false,
        }
    }

    fn resolve_root_path(&mut self) -> Result<&Path, SyncError> {
        if self.root_path.is_none() {
            let root = self.root_fd.as_ref().ok_or_else(|| not_ready("no base descriptor to resolve a tree root from"))?;
            self.root_path = Some(fs_util::resolve_fd_path(root)?);
        }
        Ok(self.root_path.as_ref().unwrap())
    }

    /// Pulls more bytes into `pending` when the decoder owns the archive
    /// descriptor directly (no index configured): reads are bounded so one
    /// `Step` never blocks on the whole remaining stream.
    fn pump_archive_fd(&mut self) -> io::Result<()> {
        if let Some(fd) = self.archive_fd.as_mut() {
            let mut buf = vec![0u8; STREAM_CHUNK];
            let n = fd.read(&mut buf)?;
            if n == 0 {
                self.eof_signaled = true;
                self.archive_fd = None;
            } else {
                buf.truncate(n);
                self.pending.extend_from_slice(&buf);
            }
        }
        Ok(())
    }

    /// Attempts to parse one header frame out of `pending` without
    /// consuming anything if the buffer doesn't yet hold a complete frame.
    fn try_parse_header(&mut self) -> Result<Option<Header>, SyncError> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        let tag = self.pending[0];
        if tag == TAG_END_DIR {
            self.pending.drain(..1);
            return Ok(Some(Header::EndDir));
        }
        if self.pending.len() < 3 {
            return Ok(None);
        }
        let name_len = u16::from_le_bytes([self.pending[1], self.pending[2]]) as usize;
        let fixed_len = match tag {
            TAG_DIR | TAG_BLK => 1 + 2 + name_len + 4,
            TAG_REG => 1 + 2 + name_len + 4 + 8,
            other => return Err(SyncError::bad_message(format!("unknown archive tag {other}"))),
        };
        if self.pending.len() < fixed_len {
            return Ok(None);
        }
        let frame: Vec<u8> = self.pending.drain(..fixed_len).collect();
        let name = String::from_utf8(frame[3..3 + name_len].to_vec())
            .map_err(|e| SyncError::bad_message(format!("archive entry name is not valid utf-8: {e}")))?;
        let mut offset = 3 + name_len;
        let mode = u32::from_le_bytes(frame[offset..offset + 4].try_into().unwrap());
        offset += 4;
        let size = if tag == TAG_REG {
            Some(u64::from_le_bytes(frame[offset..offset + 8].try_into().unwrap()))
        } else {
            None
        };
        Ok(Some(Header::Entry {
            tag,
            rel: PathBuf::from(name),
            mode,
            size,
        }))
    }

    fn materialize_entry(&mut self, tag: u8, rel: &Path, mode: u32) -> Result<(), SyncError> {
        let is_root_entry = rel == Path::new(".");
        match tag {
            TAG_DIR => {
                let abs = if is_root_entry {
                    self.resolve_root_path()?.to_path_buf()
                } else {
                    let root = self.resolve_root_path()?.to_path_buf();
                    root.join(rel)
                };
                std::fs::create_dir_all(&abs)?;
                apply_mode(&abs, mode)?;
            }
            TAG_REG => {
                if is_root_entry && !self.root_is_dir {
                    let file = self.root_fd.take().ok_or_else(|| not_ready("root file descriptor already consumed"))?;
                    apply_mode_to_file(&file, mode)?;
                    self.current_write = Some(file);
                } else {
                    let root = self.resolve_root_path()?.to_path_buf();
                    let abs = root.join(rel);
                    if let Some(parent) = abs.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    let file = fs_util::create_exclusive(&abs, mode)?;
                    self.current_write = Some(file);
                }
            }
            TAG_BLK => {
                // Device content is out of scope; only the node's presence
                // and mode are honored, and only for non-root entries (a
                // root-level block device is already the pre-opened target
                // handed to the Synchronizer at Start).
                if !is_root_entry {
                    let root = self.resolve_root_path()?.to_path_buf();
                    let abs = root.join(rel);
                    if let Some(parent) = abs.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    let _ = fs_util::create_exclusive(&abs, mode);
                }
            }
            _ => unreachable!("try_parse_header only emits known tags"),
        }
        Ok(())
    }
}

#[cfg(unix)]
fn apply_mode_to_file(file: &File, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_mode_to_file(_file: &File, _mode: u32) -> io::Result<()> {
    Ok(())
}

enum Header {
    EndDir,
    Entry { tag: u8, rel: PathBuf, mode: u32, size: Option<u64> },
}

impl Default for TreeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveDecoder for TreeDecoder {
    fn set_base_fd(&mut self, fd: File) -> Result<(), SyncError> {
        if self.root_fd.is_some() {
            return Err(SyncError::busy("decoder base already set"));
        }
        let meta = fd.metadata()?;
        self.root_is_dir = meta.is_dir();
        self.root_fd = Some(fd);
        Ok(())
    }

    fn set_base_mode(&mut self, mode: BaseMode) -> Result<(), SyncError> {
        self.root_is_dir = matches!(mode, BaseMode::Dir);
        Ok(())
    }

    fn step(&mut self) -> Result<DecodeStep, SyncError> {
        loop {
            match &mut self.parse_state {
                ParseState::Content { remaining } => {
                    if *remaining == 0 {
                        self.current_write = None;
                        self.parse_state = ParseState::Header;
                        continue;
                    }
                    if self.pending.is_empty() {
                        self.pump_archive_fd()?;
                        if self.pending.is_empty() {
                            if self.archive_fd.is_none() {
                                return Ok(DecodeStep::Request);
                            }
                            continue;
                        }
                    }
                    let take = (*remaining as usize).min(self.pending.len());
                    let chunk: Vec<u8> = self.pending.drain(..take).collect();
                    if let Some(f) = self.current_write.as_mut() {
                        f.write_all(&chunk)?;
                    }
                    *remaining -= take as u64;
                    return Ok(DecodeStep::Payload);
                }
                ParseState::Header => {
                    if self.pending.is_empty() {
                        self.pump_archive_fd()?;
                    }
                    match self.try_parse_header()? {
                        None => {
                            if self.eof_signaled {
                                self.finished = true;
                                return Ok(DecodeStep::Finished);
                            }
                            return Ok(DecodeStep::Request);
                        }
                        Some(Header::EndDir) => return Ok(DecodeStep::Step),
                        Some(Header::Entry { tag, rel, mode, size }) => {
                            self.materialize_entry(tag, &rel, mode)?;
                            self.current_path = Some(rel);
                            self.current_mode = Some(mode);
                            if tag == TAG_REG {
                                let remaining = size.unwrap_or(0);
                                if remaining > 0 {
                                    self.parse_state = ParseState::Content { remaining };
                                }
                            }
                            return Ok(DecodeStep::NextFile);
                        }
                    }
                }
            }
        }
    }

    fn put_data(&mut self, bytes: &[u8]) -> Result<(), SyncError> {
        self.pending.extend_from_slice(bytes);
        Ok(())
    }

    fn put_data_fd(&mut self, fd: File) -> Result<(), SyncError> {
        self.archive_fd = Some(fd);
        Ok(())
    }

    fn put_eof(&mut self) -> Result<(), SyncError> {
        self.eof_signaled = true;
        Ok(())
    }

    fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    fn current_mode(&self) -> Option<u32> {
        self.current_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive_encode(root: &Path) -> Vec<u8> {
        let fd = File::open(root).unwrap();
        let mut enc = TreeEncoder::new();
        enc.set_base_fd(fd).unwrap();
        let mut out = Vec::new();
        loop {
            match enc.step().unwrap() {
                EncodeStep::Finished => break,
                EncodeStep::NextFile | EncodeStep::Data => out.extend_from_slice(enc.get_data()),
            }
        }
        out
    }

    fn drive_decode(bytes: &[u8], dest: &Path) {
        let root_fd = fs_util::open_as_directory(dest).unwrap_or_else(|_| File::open(dest).unwrap());
        let mut dec = TreeDecoder::new();
        dec.set_base_fd(root_fd).unwrap();
        let mut offset = 0usize;
        loop {
            match dec.step().unwrap() {
                DecodeStep::Finished => break,
                DecodeStep::Request => {
                    let take = bytes.len().saturating_sub(offset).min(17);
                    if take == 0 {
                        dec.put_eof().unwrap();
                    } else {
                        dec.put_data(&bytes[offset..offset + take]).unwrap();
                        offset += take;
                    }
                }
                DecodeStep::NextFile | DecodeStep::Step | DecodeStep::Payload => {}
            }
        }
    }

    #[test]
    fn round_trips_a_small_tree() {
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir(src.path().join("sub")).unwrap();
        std::fs::write(src.path().join("sub/a.txt"), b"hello").unwrap();
        std::fs::write(src.path().join("top.bin"), vec![7u8; 3000]).unwrap();

        let bytes = drive_encode(src.path());

        let dst = tempfile::tempdir().unwrap();
        drive_decode(&bytes, dst.path());

        assert_eq!(std::fs::read(dst.path().join("sub/a.txt")).unwrap(), b"hello");
        assert_eq!(std::fs::read(dst.path().join("top.bin")).unwrap(), vec![7u8; 3000]);
    }

    #[test]
    fn round_trips_a_regular_file_base() {
        let src = tempfile::tempdir().unwrap();
        let file_path = src.path().join("onefile.bin");
        std::fs::write(&file_path, b"just one file's content").unwrap();

        let bytes = drive_encode(&file_path);

        let dst_dir = tempfile::tempdir().unwrap();
        let dst_path = dst_dir.path().join("reconstructed.bin");
        std::fs::File::create(&dst_path).unwrap();
        let fd = std::fs::OpenOptions::new().write(true).open(&dst_path).unwrap();
        let mut dec = TreeDecoder::new();
        dec.set_base_fd(fd).unwrap();
        let mut offset = 0usize;
        loop {
            match dec.step().unwrap() {
                DecodeStep::Finished => break,
                DecodeStep::Request => {
                    let take = bytes.len().saturating_sub(offset).min(5);
                    if take == 0 {
                        dec.put_eof().unwrap();
                    } else {
                        dec.put_data(&bytes[offset..offset + take]).unwrap();
                        offset += take;
                    }
                }
                _ => {}
            }
        }
        assert_eq!(std::fs::read(&dst_path).unwrap(), b"just one file's content");
    }

    #[test]
    fn header_parser_resynchronizes_across_byte_sized_feeds() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("f.txt"), b"xyz").unwrap();
        let bytes = drive_encode(src.path());

        let dst = tempfile::tempdir().unwrap();
        let root_fd = fs_util::open_as_directory(dst.path()).unwrap();
        let mut dec = TreeDecoder::new();
        dec.set_base_fd(root_fd).unwrap();
        let mut offset = 0usize;
        loop {
            match dec.step().unwrap() {
                DecodeStep::Finished => break,
                DecodeStep::Request => {
                    if offset < bytes.len() {
                        dec.put_data(&bytes[offset..offset + 1]).unwrap();
                        offset += 1;
                    } else {
                        dec.put_eof().unwrap();
                    }
                }
                _ => {}
            }
        }
        assert_eq!(std::fs::read(dst.path().join("f.txt")).unwrap(), b"xyz");
    }
}

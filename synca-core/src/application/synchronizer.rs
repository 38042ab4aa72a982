// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Synchronizer
//!
//! The orchestration core: a single-use, single-direction streaming pipeline
//! that couples an archive encoder/decoder, a rolling-hash chunker, a chunk
//! store hierarchy, an index writer/reader, and a running archive digest
//! into one cooperative loop advanced by [`Synchronizer::step`].
//!
//! Domain traits here are synchronous by design — the same reasoning the
//! checksum service documents for this codebase applies at the
//! orchestration layer too: execution strategy (a thread, an async runtime,
//! nothing at all) is an infrastructure concern, not something the pipeline
//! needs to know about. A caller drives `step` from whatever loop it likes.
//!
//! Configuration is write-once: every setter below fails with
//! [`SyncError::Busy`] on a second call, which is how the "CONFIGURING →
//! RUNNING → FINISHED" state machine in the design notes gets enforced
//! without a separate state field — `started` and `eof` alone carry it.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use synca_domain::{
    effective_perm_mode, validate_perm_mode, ArchiveDecoder, ArchiveEncoder, BaseMode, Chunker, CutPoint, DecodeStep,
    Direction, EncodeStep, IndexReader, IndexRecord, IndexWriter, ObjectId, ObjectStore, ReadObject, RunningDigest,
    StepOutcome, SyncError, DEFAULT_PERM_MODE,
};

use crate::infrastructure::archive::{TreeDecoder, TreeEncoder};
use crate::infrastructure::index::{BinaryIndexReader, BinaryIndexWriter};
use crate::infrastructure::fs_util;

enum IndexHandle {
    Writer(Box<dyn IndexWriter>),
    Reader(Box<dyn IndexReader>),
}

/// A single-use, single-direction synchronization session.
pub struct Synchronizer {
    direction: Direction,
    chunker: Box<dyn Chunker>,

    encoder: Option<Box<dyn ArchiveEncoder>>,
    decoder: Option<Box<dyn ArchiveDecoder>>,

    wstore: Option<Box<dyn ObjectStore>>,
    rstores: Vec<Box<dyn ObjectStore>>,

    base_fd: Option<File>,
    base_path: Option<PathBuf>,
    base_mode: Option<BaseMode>,

    archive_fd: Option<File>,
    archive_path: Option<PathBuf>,

    index_fd: Option<File>,
    index_path: Option<PathBuf>,
    index: Option<IndexHandle>,

    temporary_base_path: Option<PathBuf>,
    temporary_archive_path: Option<PathBuf>,

    make_perm_mode: Option<u32>,

    buffer: Vec<u8>,
    archive_digest: Option<RunningDigest>,
    final_digest: Option<ObjectId>,

    eof: bool,
    started: bool,
}

impl Synchronizer {
    /// Builds a new session bound to `direction`, with `chunker` as its
    /// rolling-hash chunk splitter.
    pub fn new(direction: Direction, chunker: Box<dyn Chunker>) -> Self {
        Self {
            direction,
            chunker,
            encoder: None,
            decoder: None,
            wstore: None,
            rstores: Vec::new(),
            base_fd: None,
            base_path: None,
            base_mode: None,
            archive_fd: None,
            archive_path: None,
            index_fd: None,
            index_path: None,
            index: None,
            temporary_base_path: None,
            temporary_archive_path: None,
            make_perm_mode: None,
            buffer: Vec::new(),
            archive_digest: None,
            final_digest: None,
            eof: false,
            started: false,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    // -- Configuration (write-once) -----------------------------------

    /// Transfers ownership of an already-open base tree descriptor.
    pub fn set_base_fd(&mut self, fd: File) -> Result<(), SyncError> {
        if self.base_fd.is_some() || self.base_path.is_some() {
            return Err(SyncError::busy("base already configured"));
        }
        self.base_fd = Some(fd);
        Ok(())
    }

    /// Configures the base tree by path. In ENCODE this opens immediately
    /// (as a directory first, falling back to a regular file on
    /// `ENOTDIR`); in DECODE the path is only remembered, since the base's
    /// kind is determined by `base_mode` at `Start`.
    pub fn set_base_path(&mut self, path: impl Into<PathBuf>) -> Result<(), SyncError> {
        if self.base_fd.is_some() || self.base_path.is_some() {
            return Err(SyncError::busy("base already configured"));
        }
        let path = path.into();
        match self.direction {
            Direction::Encode => match fs_util::open_as_directory(&path) {
                Ok(dir_fd) => self.base_fd = Some(dir_fd),
                Err(e) if fs_util::is_not_a_directory(&e) => {
                    self.base_fd = Some(File::open(&path)?);
                }
                Err(e) => return Err(e.into()),
            },
            Direction::Decode => self.base_path = Some(path),
        }
        Ok(())
    }

    /// Declares the kind of base endpoint a DECODE session will create.
    /// DECODE-only.
    pub fn set_base_mode(&mut self, mode: BaseMode) -> Result<(), SyncError> {
        if self.direction.is_encode() {
            return Err(SyncError::direction_mismatch("base_mode is meaningful only in DECODE"));
        }
        if self.base_mode.is_some() {
            return Err(SyncError::busy("base_mode already configured"));
        }
        self.base_mode = Some(mode);
        Ok(())
    }

    /// Transfers ownership of an already-open archive sink/source
    /// descriptor.
    pub fn set_archive_fd(&mut self, fd: File) -> Result<(), SyncError> {
        if self.archive_fd.is_some() || self.archive_path.is_some() {
            return Err(SyncError::busy("archive already configured"));
        }
        self.archive_fd = Some(fd);
        Ok(())
    }

    /// Configures the serialized archive endpoint by path. ENCODE remembers
    /// the path (the temp file is created lazily at `Start`); DECODE opens
    /// it read-only immediately.
    pub fn set_archive_path(&mut self, path: impl Into<PathBuf>) -> Result<(), SyncError> {
        if self.archive_fd.is_some() || self.archive_path.is_some() {
            return Err(SyncError::busy("archive already configured"));
        }
        let path = path.into();
        match self.direction {
            Direction::Encode => self.archive_path = Some(path),
            Direction::Decode => self.archive_fd = Some(File::open(&path)?),
        }
        Ok(())
    }

    /// Sets the permission bits used when creating the archive output.
    /// ENCODE-only.
    pub fn set_make_perm_mode(&mut self, mode: u32) -> Result<(), SyncError> {
        if self.direction.is_decode() {
            return Err(SyncError::direction_mismatch("make_perm_mode is meaningful only in ENCODE"));
        }
        if self.make_perm_mode.is_some() {
            return Err(SyncError::busy("make_perm_mode already configured"));
        }
        validate_perm_mode(mode)?;
        self.make_perm_mode = Some(mode);
        Ok(())
    }

    /// Configures the writable content-addressed store.
    pub fn set_wstore(&mut self, store: Box<dyn ObjectStore>) -> Result<(), SyncError> {
        if self.wstore.is_some() {
            return Err(SyncError::busy("writable store already configured"));
        }
        self.wstore = Some(store);
        Ok(())
    }

    /// Appends a read-only seed store, consulted after the writable store
    /// on a miss, in registration order.
    pub fn add_rstore(&mut self, store: Box<dyn ObjectStore>) -> Result<(), SyncError> {
        if self.started {
            return Err(SyncError::busy("seed stores cannot be added once the pipeline has started"));
        }
        self.rstores.push(store);
        Ok(())
    }

    /// Transfers ownership of an already-open index descriptor.
    pub fn set_index_fd(&mut self, fd: File) -> Result<(), SyncError> {
        if self.index_fd.is_some() || self.index_path.is_some() {
            return Err(SyncError::busy("index already configured"));
        }
        self.index_fd = Some(fd);
        Ok(())
    }

    /// Configures the index by path; opened for writing on ENCODE, for
    /// reading on DECODE, lazily at `Start`.
    pub fn set_index_path(&mut self, path: impl Into<PathBuf>) -> Result<(), SyncError> {
        if self.index_fd.is_some() || self.index_path.is_some() {
            return Err(SyncError::busy("index already configured"));
        }
        self.index_path = Some(path.into());
        Ok(())
    }

    // -- Lifecycle ------------------------------------------------------

    fn start(&mut self) -> Result<(), SyncError> {
        if self.started {
            return Ok(());
        }
        match self.direction {
            Direction::Encode => self.start_encode()?,
            Direction::Decode => self.start_decode()?,
        }
        self.started = true;
        Ok(())
    }

    fn start_encode(&mut self) -> Result<(), SyncError> {
        if self.archive_fd.is_none() {
            if let Some(path) = self.archive_path.clone() {
                let tmp = fs_util::sibling_temp_path(&path);
                let mode = effective_perm_mode(self.make_perm_mode);
                tracing::debug!(path = %tmp.display(), "creating temporary archive sink");
                let file = fs_util::create_exclusive(&tmp, mode)?;
                self.archive_fd = Some(file);
                self.temporary_archive_path = Some(tmp);
            }
        }

        if self.encoder.is_none() {
            let base_fd = self
                .base_fd
                .take()
                .ok_or_else(|| SyncError::not_ready("encode requires a base descriptor or path"))?;
            let mut encoder: Box<dyn ArchiveEncoder> = Box::new(TreeEncoder::new());
            encoder.set_base_fd(base_fd)?;
            self.encoder = Some(encoder);
        }

        self.open_index()?;

        if self.archive_fd.is_none() && self.index.is_none() {
            return Err(SyncError::not_ready(
                "encode requires at least an archive sink or an index to produce anything observable",
            ));
        }
        Ok(())
    }

    fn start_decode(&mut self) -> Result<(), SyncError> {
        if self.decoder.is_none() {
            if self.base_fd.is_none() {
                let path = self
                    .base_path
                    .clone()
                    .ok_or_else(|| SyncError::not_ready("decode requires a base descriptor or path"))?;
                let mode = self
                    .base_mode
                    .ok_or_else(|| SyncError::not_ready("decode base path requires base_mode"))?;
                match mode {
                    BaseMode::Dir => {
                        fs_util::mkdir_ignore_exists(&path)?;
                        self.base_fd = Some(fs_util::open_as_directory(&path)?);
                    }
                    BaseMode::Reg => {
                        let tmp = fs_util::sibling_temp_path(&path);
                        tracing::debug!(path = %tmp.display(), "creating temporary base sink");
                        let file = fs_util::create_exclusive(&tmp, DEFAULT_PERM_MODE)?;
                        self.base_fd = Some(file);
                        self.temporary_base_path = Some(tmp);
                    }
                    BaseMode::Blk => {
                        self.base_fd = Some(OpenOptions::new().write(true).open(&path)?);
                    }
                }
            }

            let mut decoder: Box<dyn ArchiveDecoder> = Box::new(TreeDecoder::new());
            if let Some(fd) = self.base_fd.take() {
                decoder.set_base_fd(fd)?;
            } else if let Some(mode) = self.base_mode {
                decoder.set_base_mode(mode)?;
            }
            self.decoder = Some(decoder);
        }

        self.open_index()?;
        Ok(())
    }

    fn open_index(&mut self) -> Result<(), SyncError> {
        if self.index_path.is_none() && self.index_fd.is_none() {
            return Ok(());
        }
        match self.direction {
            Direction::Encode => {
                if self.wstore.is_none() {
                    return Err(SyncError::not_ready("an index in ENCODE requires a writable store"));
                }
                let writer: Box<dyn IndexWriter> = if let Some(path) = self.index_path.take() {
                    Box::new(BinaryIndexWriter::create(path)?)
                } else {
                    Box::new(BinaryIndexWriter::from_file(self.index_fd.take().unwrap())?)
                };
                self.index = Some(IndexHandle::Writer(writer));
            }
            Direction::Decode => {
                let reader: Box<dyn IndexReader> = if let Some(path) = self.index_path.take() {
                    Box::new(BinaryIndexReader::open(path)?)
                } else {
                    Box::new(BinaryIndexReader::from_file(self.index_fd.take().unwrap())?)
                };
                self.index = Some(IndexHandle::Reader(reader));
            }
        }
        Ok(())
    }

    // -- Step -------------------------------------------------------------

    /// Advances the pipeline by one cooperative step.
    pub fn step(&mut self) -> Result<StepOutcome, SyncError> {
        if self.eof {
            return Err(SyncError::PipelineClosed);
        }
        let _span = tracing::debug_span!("synchronizer_step", direction = ?self.direction).entered();
        self.start()?;
        match self.direction {
            Direction::Encode => self.step_encode(),
            Direction::Decode => self.step_decode(),
        }
    }

    fn step_encode(&mut self) -> Result<StepOutcome, SyncError> {
        let outcome = self.encoder.as_mut().expect("encoder created by start()").step()?;
        match outcome {
            EncodeStep::Finished => {
                if !self.buffer.is_empty() {
                    self.emit_chunk()?;
                }
                self.commit_archive()?;
                let digest = self.finalize_archive_digest();
                self.finish_index_writer(digest)?;
                self.eof = true;
                tracing::info!(digest = %digest, "encode finished");
                Ok(StepOutcome::Finished)
            }
            EncodeStep::NextFile | EncodeStep::Data => {
                let data = self.encoder.as_ref().unwrap().get_data().to_vec();
                self.tee_encode_bytes(&data)?;
                Ok(if outcome == EncodeStep::NextFile {
                    StepOutcome::NextFile
                } else {
                    StepOutcome::Step
                })
            }
        }
    }

    fn tee_encode_bytes(&mut self, data: &[u8]) -> Result<(), SyncError> {
        // Ordering is load-bearing: the sink write must fail before any
        // state downstream of it is touched, the digest must see exactly
        // what a reader of the sink would see, and the chunker must see the
        // same stream so its cut points line up with archive offsets.
        if let Some(fd) = self.archive_fd.as_mut() {
            use std::io::Write;
            fd.write_all(data)?;
        }
        self.archive_digest.get_or_insert_with(RunningDigest::new).update(data);
        self.feed_chunker(data)
    }

    fn feed_chunker(&mut self, mut data: &[u8]) -> Result<(), SyncError> {
        while !data.is_empty() {
            match self.chunker.scan(data) {
                CutPoint::Cut(offset) => {
                    self.buffer.extend_from_slice(&data[..offset]);
                    self.emit_chunk()?;
                    data = &data[offset..];
                }
                CutPoint::NoCut => {
                    self.buffer.extend_from_slice(data);
                    break;
                }
            }
        }
        Ok(())
    }

    fn emit_chunk(&mut self) -> Result<(), SyncError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let bytes = std::mem::take(&mut self.buffer);
        let Some(store) = self.wstore.as_ref() else {
            // "produce archive only" mode: chunk emission is a no-op
            // without a writable store (§4.5). An index was already
            // rejected at Start in this case.
            return Ok(());
        };
        let id = ObjectId::of(&bytes);
        store.put(&id, &bytes)?;
        if let Some(IndexHandle::Writer(writer)) = self.index.as_mut() {
            writer.write_object(IndexRecord { id, size: bytes.len() as u64 })?;
        }
        tracing::debug!(id = %id, size = bytes.len(), "chunk emitted");
        Ok(())
    }

    fn commit_archive(&mut self) -> Result<(), SyncError> {
        if let Some(tmp) = self.temporary_archive_path.as_ref() {
            let final_path = self
                .archive_path
                .clone()
                .expect("a temporary archive path implies a configured final path");
            std::fs::rename(tmp, &final_path)?;
            tracing::info!(path = %final_path.display(), "archive committed");
            self.temporary_archive_path = None;
        }
        Ok(())
    }

    fn commit_base(&mut self) -> Result<(), SyncError> {
        if let Some(tmp) = self.temporary_base_path.as_ref() {
            let final_path = self
                .base_path
                .clone()
                .expect("a temporary base path implies a configured final path");
            std::fs::rename(tmp, &final_path)?;
            tracing::info!(path = %final_path.display(), "base tree committed");
            self.temporary_base_path = None;
        }
        Ok(())
    }

    fn finalize_archive_digest(&mut self) -> ObjectId {
        let digest = self
            .archive_digest
            .take()
            .map(RunningDigest::finalize)
            .unwrap_or_else(|| ObjectId::of(b""));
        self.final_digest = Some(digest);
        digest
    }

    fn finish_index_writer(&mut self, digest: ObjectId) -> Result<(), SyncError> {
        if let Some(IndexHandle::Writer(mut writer)) = self.index.take() {
            writer.set_digest(digest)?;
            writer.write_eof()?;
            writer.close()?;
        }
        Ok(())
    }

    fn step_decode(&mut self) -> Result<StepOutcome, SyncError> {
        loop {
            let outcome = self.decoder.as_mut().expect("decoder created by start()").step()?;
            match outcome {
                DecodeStep::Finished => {
                    self.commit_base()?;
                    let digest = self.finalize_archive_digest();
                    self.eof = true;
                    tracing::info!(digest = %digest, "decode finished");
                    return Ok(StepOutcome::Finished);
                }
                DecodeStep::NextFile => return Ok(StepOutcome::NextFile),
                DecodeStep::Step => return Ok(StepOutcome::Step),
                DecodeStep::Payload => return Ok(StepOutcome::Payload),
                DecodeStep::Request => self.service_decode_request()?,
            }
        }
    }

    fn service_decode_request(&mut self) -> Result<(), SyncError> {
        if let Some(IndexHandle::Reader(reader)) = self.index.as_mut() {
            match reader.read_object()? {
                ReadObject::Eof => {
                    self.decoder.as_mut().unwrap().put_eof()?;
                }
                ReadObject::Record(IndexRecord { id, size }) => {
                    let bytes = self.get(&id)?;
                    if bytes.len() as u64 != size {
                        return Err(SyncError::bad_message(format!(
                            "chunk {id} fetched {} bytes, index recorded {size}",
                            bytes.len()
                        )));
                    }
                    self.decoder.as_mut().unwrap().put_data(&bytes)?;
                    // Digest absorbs bytes only once the decoder has
                    // accepted them (see module docs on this policy).
                    self.archive_digest.get_or_insert_with(RunningDigest::new).update(&bytes);
                }
            }
            Ok(())
        } else if let Some(fd) = self.archive_fd.take() {
            self.decoder.as_mut().unwrap().put_data_fd(fd)?;
            Ok(())
        } else {
            Err(SyncError::direction_mismatch(
                "decode requested more input but neither an index nor an archive descriptor is configured",
            ))
        }
    }

    // -- Store access -----------------------------------------------------

    /// Resolves `id` to bytes, consulting the writable store first, then
    /// each seed store in registration order. The first non-NOT-FOUND
    /// result wins, including an error.
    pub fn get(&self, id: &ObjectId) -> Result<Vec<u8>, SyncError> {
        if let Some(store) = self.wstore.as_ref() {
            match store.get(id) {
                Err(SyncError::NotFound(_)) => {}
                other => return other,
            }
        }
        for store in &self.rstores {
            match store.get(id) {
                Err(SyncError::NotFound(_)) => continue,
                other => return other,
            }
        }
        Err(SyncError::not_found(format!("object {id} absent from every configured store")))
    }

    /// Forwards to the writable store.
    pub fn put(&self, id: &ObjectId, bytes: &[u8]) -> Result<(), SyncError> {
        match self.wstore.as_ref() {
            Some(store) => store.put(id, bytes),
            None => Err(SyncError::not_ready("put requires a writable store")),
        }
    }

    pub fn make_object_id(bytes: &[u8]) -> ObjectId {
        ObjectId::of(bytes)
    }

    /// The archive-level digest, available only once the pipeline has
    /// reached eof.
    pub fn get_digest(&self) -> Result<ObjectId, SyncError> {
        if !self.eof {
            return Err(SyncError::busy("archive digest requested before the pipeline reached eof"));
        }
        Ok(self.final_digest.expect("final_digest is set whenever eof is true"))
    }

    pub fn current_path(&self) -> Option<&Path> {
        match self.direction {
            Direction::Encode => self.encoder.as_ref().and_then(|e| e.current_path()),
            Direction::Decode => self.decoder.as_ref().and_then(|d| d.current_path()),
        }
    }

    pub fn current_mode(&self) -> Option<u32> {
        match self.direction {
            Direction::Encode => self.encoder.as_ref().and_then(|e| e.current_mode()),
            Direction::Decode => self.decoder.as_ref().and_then(|d| d.current_mode()),
        }
    }
}

impl Drop for Synchronizer {
    /// Releases owned descriptors implicitly (field drops) and unlinks any
    /// temporary artifact a commit didn't already clear. No partial file is
    /// ever left at a final path — publication happens solely via the
    /// renames in `commit_archive`/`commit_base` on the `Finished` step.
    fn drop(&mut self) {
        if let Some(tmp) = self.temporary_archive_path.take() {
            let _ = std::fs::remove_file(&tmp);
        }
        if let Some(tmp) = self.temporary_base_path.take() {
            let _ = std::fs::remove_file(&tmp);
        }
    }
}

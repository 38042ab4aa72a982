// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Binary Index Format
//!
//! A small self-describing framing: a fixed magic/version header followed by
//! tagged records (object, digest, EOF). Grounded on the self-describing
//! `[DATA][HEADER][LEN][VERSION][MAGIC]` framing style used by the teacher's
//! binary format service, adapted here to a simpler record stream since the
//! index's true on-disk format is an out-of-scope external collaborator.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use synca_domain::{IndexRecord, IndexReader, IndexWriter, ObjectId, ReadObject, SyncError};

const MAGIC: &[u8; 4] = b"SYCX";
const VERSION: u8 = 1;

const TAG_OBJECT: u8 = 0x01;
const TAG_DIGEST: u8 = 0x02;
const TAG_EOF: u8 = 0x03;

/// Writer side of the binary index. Opens (creates/truncates) the backing
/// file eagerly and writes the header immediately.
pub struct BinaryIndexWriter {
    out: BufWriter<File>,
}

impl BinaryIndexWriter {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Self::from_file(file)
    }

    pub fn from_file(file: File) -> io::Result<Self> {
        let mut out = BufWriter::new(file);
        out.write_all(MAGIC)?;
        out.write_all(&[VERSION])?;
        Ok(Self { out })
    }
}

impl IndexWriter for BinaryIndexWriter {
    fn write_object(&mut self, record: IndexRecord) -> Result<(), SyncError> {
        self.out.write_all(&[TAG_OBJECT])?;
        self.out.write_all(record.id.as_bytes())?;
        self.out.write_all(&record.size.to_le_bytes())?;
        Ok(())
    }

    fn set_digest(&mut self, digest: ObjectId) -> Result<(), SyncError> {
        self.out.write_all(&[TAG_DIGEST])?;
        self.out.write_all(digest.as_bytes())?;
        Ok(())
    }

    fn write_eof(&mut self) -> Result<(), SyncError> {
        self.out.write_all(&[TAG_EOF])?;
        Ok(())
    }

    fn close(mut self: Box<Self>) -> Result<(), SyncError> {
        self.out.flush()?;
        Ok(())
    }
}

/// Reader side of the binary index. Digest records are consumed and
/// discarded transparently: the synchronizer recomputes its own running
/// digest during DECODE rather than trusting the stored one, and the
/// `IndexReader` trait has no channel to surface it anyway.
pub struct BinaryIndexReader {
    input: BufReader<File>,
}

impl BinaryIndexReader {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::from_file(file)
    }

    pub fn from_file(file: File) -> io::Result<Self> {
        let mut input = BufReader::new(file);
        let mut header = [0u8; 5];
        input.read_exact(&mut header)?;
        if &header[..4] != MAGIC {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "bad index magic"));
        }
        if header[4] != VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported index version {}", header[4]),
            ));
        }
        Ok(Self { input })
    }

    fn read_tag(&mut self) -> io::Result<Option<u8>> {
        let mut tag = [0u8; 1];
        match self.input.read(&mut tag)? {
            0 => Ok(None),
            _ => Ok(Some(tag[0])),
        }
    }

    fn read_object_id(&mut self) -> io::Result<ObjectId> {
        let mut bytes = [0u8; 32];
        self.input.read_exact(&mut bytes)?;
        Ok(ObjectId::from_digest(bytes))
    }
}

impl IndexReader for BinaryIndexReader {
    fn read_object(&mut self) -> Result<ReadObject, SyncError> {
        loop {
            let tag = match self.read_tag()? {
                Some(tag) => tag,
                None => return Ok(ReadObject::Eof),
            };
            match tag {
                TAG_OBJECT => {
                    let id = self.read_object_id()?;
                    let mut size_bytes = [0u8; 8];
                    self.input.read_exact(&mut size_bytes)?;
                    let size = u64::from_le_bytes(size_bytes);
                    return Ok(ReadObject::Record(IndexRecord { id, size }));
                }
                TAG_DIGEST => {
                    let _ = self.read_object_id()?;
                    continue;
                }
                TAG_EOF => return Ok(ReadObject::Eof),
                other => {
                    return Err(SyncError::bad_message(format!("unknown index record tag {other}")));
                }
            }
        }
    }
}

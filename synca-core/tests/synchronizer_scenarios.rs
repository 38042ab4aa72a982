// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end scenarios for the `Synchronizer` state machine, covering the
//! documented invariants and the six worked examples the design is tested
//! against: a basic round trip, decode-from-store-only after the archive is
//! gone, a corrupted index triggering a bad-message abort, seed-store
//! fallback, write-once configuration, and a non-directory base.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use synca_core::{BinaryIndexReader, FsStore, GearChunker};
use synca_domain::{BaseMode, ChunkerParams, Direction, StepOutcome, SyncError};

fn run_to_finish(sync: &mut synca_core::Synchronizer) {
    loop {
        match sync.step().expect("step should not fail in a well-formed scenario") {
            StepOutcome::Finished => return,
            _ => continue,
        }
    }
}

fn small_chunker() -> Box<GearChunker> {
    // Small bounds so a 10 MiB fixture reliably yields multiple chunks
    // without the test taking a while to hash megabytes of zeros per chunk.
    Box::new(GearChunker::new(ChunkerParams::new(4 * 1024, 8 * 1024, 32 * 1024).unwrap()))
}

fn write_zeros(path: &Path, len: usize) {
    let mut f = File::create(path).unwrap();
    let buf = vec![0u8; 64 * 1024];
    let mut remaining = len;
    while remaining > 0 {
        let take = remaining.min(buf.len());
        f.write_all(&buf[..take]).unwrap();
        remaining -= take;
    }
}

fn count_store_files(root: &Path) -> usize {
    let mut count = 0;
    for shard in std::fs::read_dir(root).unwrap() {
        let shard = shard.unwrap();
        if shard.path().is_dir() {
            count += std::fs::read_dir(shard.path()).unwrap().count();
        }
    }
    count
}

#[test]
fn scenario_1_encode_directory_with_one_large_file() {
    let workdir = tempfile::tempdir().unwrap();
    let base_dir = workdir.path().join("base");
    std::fs::create_dir(&base_dir).unwrap();
    write_zeros(&base_dir.join("zeros.bin"), 10 * 1024 * 1024);

    let archive_path = workdir.path().join("archive.bin");
    let index_path = workdir.path().join("archive.idx");
    let store_path = workdir.path().join("store");

    let mut sync = synca_core::Synchronizer::new(Direction::Encode, small_chunker());
    sync.set_base_path(&base_dir).unwrap();
    sync.set_archive_path(&archive_path).unwrap();
    sync.set_index_path(&index_path).unwrap();
    sync.set_wstore(Box::new(FsStore::create(&store_path).unwrap())).unwrap();

    run_to_finish(&mut sync);

    assert!(archive_path.is_file());
    assert!(count_store_files(&store_path) > 0);

    let mut reader = BinaryIndexReader::open(&index_path).unwrap();
    let mut saw_record = false;
    loop {
        match reader.read_object().unwrap() {
            synca_domain::ReadObject::Record(_) => saw_record = true,
            synca_domain::ReadObject::Eof => break,
        }
    }
    assert!(saw_record);

    let archive_bytes = std::fs::read(&archive_path).unwrap();
    let expected_digest = synca_core::Synchronizer::make_object_id(&archive_bytes);
    assert_eq!(sync.get_digest().unwrap(), expected_digest);
}

#[test]
fn scenario_2_decode_from_store_after_archive_deleted() {
    let workdir = tempfile::tempdir().unwrap();
    let base_dir = workdir.path().join("base");
    std::fs::create_dir(&base_dir).unwrap();
    std::fs::write(base_dir.join("a.txt"), b"hello synchronizer").unwrap();
    std::fs::create_dir(base_dir.join("sub")).unwrap();
    std::fs::write(base_dir.join("sub/b.txt"), vec![9u8; 50_000]).unwrap();

    let archive_path = workdir.path().join("archive.bin");
    let index_path = workdir.path().join("archive.idx");
    let store_path = workdir.path().join("store");

    let mut encoder = synca_core::Synchronizer::new(Direction::Encode, small_chunker());
    encoder.set_base_path(&base_dir).unwrap();
    encoder.set_archive_path(&archive_path).unwrap();
    encoder.set_index_path(&index_path).unwrap();
    encoder.set_wstore(Box::new(FsStore::create(&store_path).unwrap())).unwrap();
    run_to_finish(&mut encoder);
    let encode_digest = encoder.get_digest().unwrap();

    std::fs::remove_file(&archive_path).unwrap();

    let restore_dir = workdir.path().join("restored");
    let mut decoder = synca_core::Synchronizer::new(Direction::Decode, small_chunker());
    decoder.set_base_path(&restore_dir).unwrap();
    decoder.set_base_mode(BaseMode::Dir).unwrap();
    decoder.set_index_path(&index_path).unwrap();
    decoder.set_wstore(Box::new(FsStore::open(&store_path))).unwrap();
    run_to_finish(&mut decoder);

    assert_eq!(decoder.get_digest().unwrap(), encode_digest);
    assert_eq!(std::fs::read(restore_dir.join("a.txt")).unwrap(), b"hello synchronizer");
    assert_eq!(std::fs::read(restore_dir.join("sub/b.txt")).unwrap(), vec![9u8; 50_000]);
}

#[test]
fn scenario_3_corrupted_index_size_yields_bad_message() {
    let workdir = tempfile::tempdir().unwrap();
    let base_dir = workdir.path().join("base");
    std::fs::create_dir(&base_dir).unwrap();
    std::fs::write(base_dir.join("a.txt"), vec![1u8; 20_000]).unwrap();
    std::fs::write(base_dir.join("b.txt"), vec![2u8; 20_000]).unwrap();

    let archive_path = workdir.path().join("archive.bin");
    let index_path = workdir.path().join("archive.idx");
    let store_path = workdir.path().join("store");

    let mut encoder = synca_core::Synchronizer::new(Direction::Encode, small_chunker());
    encoder.set_base_path(&base_dir).unwrap();
    encoder.set_archive_path(&archive_path).unwrap();
    encoder.set_index_path(&index_path).unwrap();
    encoder.set_wstore(Box::new(FsStore::create(&store_path).unwrap())).unwrap();
    run_to_finish(&mut encoder);

    // Corrupt the second object record's size field (+1), leaving the tag
    // and id bytes intact so the stream still parses as well-formed framing.
    let mut bytes = std::fs::read(&index_path).unwrap();
    let mut offset = 5; // magic(4) + version(1)
    let mut seen = 0;
    loop {
        let tag = bytes[offset];
        match tag {
            0x01 => {
                seen += 1;
                let size_off = offset + 1 + 32;
                if seen == 2 {
                    let size = u64::from_le_bytes(bytes[size_off..size_off + 8].try_into().unwrap());
                    bytes[size_off..size_off + 8].copy_from_slice(&(size + 1).to_le_bytes());
                    break;
                }
                offset = size_off + 8;
            }
            0x02 => offset += 1 + 32,
            _ => panic!("expected to find a second object record before EOF"),
        }
    }
    std::fs::write(&index_path, bytes).unwrap();

    let restore_dir = workdir.path().join("restored");
    let mut decoder = synca_core::Synchronizer::new(Direction::Decode, small_chunker());
    decoder.set_base_path(&restore_dir).unwrap();
    decoder.set_base_mode(BaseMode::Dir).unwrap();
    decoder.set_index_path(&index_path).unwrap();
    decoder.set_wstore(Box::new(FsStore::open(&store_path))).unwrap();

    let mut saw_bad_message = false;
    loop {
        match decoder.step() {
            Ok(StepOutcome::Finished) => panic!("expected a bad-message abort before completion"),
            Ok(_) => continue,
            Err(SyncError::BadMessage(_)) => {
                saw_bad_message = true;
                break;
            }
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }
    assert!(saw_bad_message);
}

#[test]
fn scenario_4_seed_store_serves_misses_from_writable() {
    let workdir = tempfile::tempdir().unwrap();
    let base_dir = workdir.path().join("base");
    std::fs::create_dir(&base_dir).unwrap();
    std::fs::write(base_dir.join("a.txt"), vec![3u8; 40_000]).unwrap();
    std::fs::write(base_dir.join("b.txt"), vec![4u8; 40_000]).unwrap();

    let archive_path = workdir.path().join("archive.bin");
    let index_path = workdir.path().join("archive.idx");
    let full_store_path = workdir.path().join("full_store");

    let mut encoder = synca_core::Synchronizer::new(Direction::Encode, small_chunker());
    encoder.set_base_path(&base_dir).unwrap();
    encoder.set_archive_path(&archive_path).unwrap();
    encoder.set_index_path(&index_path).unwrap();
    encoder.set_wstore(Box::new(FsStore::create(&full_store_path).unwrap())).unwrap();
    run_to_finish(&mut encoder);

    // Split the fully-populated store into an (almost empty) writable store
    // plus a seed store holding everything, so every Get misses wstore and
    // falls through to the seed.
    let empty_wstore_path = workdir.path().join("empty_wstore");
    std::fs::create_dir(&empty_wstore_path).unwrap();

    let restore_dir = workdir.path().join("restored");
    let mut decoder = synca_core::Synchronizer::new(Direction::Decode, small_chunker());
    decoder.set_base_path(&restore_dir).unwrap();
    decoder.set_base_mode(BaseMode::Dir).unwrap();
    decoder.set_index_path(&index_path).unwrap();
    decoder.set_wstore(Box::new(FsStore::open(&empty_wstore_path))).unwrap();
    decoder.add_rstore(Box::new(FsStore::open(&full_store_path))).unwrap();
    run_to_finish(&mut decoder);

    assert_eq!(std::fs::read(restore_dir.join("a.txt")).unwrap(), vec![3u8; 40_000]);
    assert_eq!(std::fs::read(restore_dir.join("b.txt")).unwrap(), vec![4u8; 40_000]);
}

#[test]
fn scenario_5_setting_archive_path_twice_is_busy() {
    let workdir = tempfile::tempdir().unwrap();
    let mut sync = synca_core::Synchronizer::new(Direction::Encode, small_chunker());
    sync.set_archive_path(workdir.path().join("a.bin")).unwrap();
    let err = sync.set_archive_path(workdir.path().join("b.bin")).unwrap_err();
    assert!(matches!(err, SyncError::Busy(_)));
}

#[test]
fn scenario_6_encodes_a_regular_file_base_deterministically() {
    let workdir = tempfile::tempdir().unwrap();
    let file_path = workdir.path().join("just_a_file.bin");
    std::fs::write(&file_path, b"not a directory at all").unwrap();

    let digest_of = || {
        let archive_path = workdir.path().join("archive.bin");
        let mut sync = synca_core::Synchronizer::new(Direction::Encode, small_chunker());
        sync.set_base_path(&file_path).unwrap();
        sync.set_archive_path(&archive_path).unwrap();
        run_to_finish(&mut sync);
        let digest = sync.get_digest().unwrap();
        std::fs::remove_file(&archive_path).unwrap();
        digest
    };

    assert_eq!(digest_of(), digest_of());
}

#[test]
fn dropping_before_finished_leaves_no_final_archive() {
    let workdir = tempfile::tempdir().unwrap();
    let base_dir = workdir.path().join("base");
    std::fs::create_dir(&base_dir).unwrap();
    write_zeros(&base_dir.join("zeros.bin"), 2 * 1024 * 1024);

    let archive_path = workdir.path().join("archive.bin");
    {
        let mut sync = synca_core::Synchronizer::new(Direction::Encode, small_chunker());
        sync.set_base_path(&base_dir).unwrap();
        sync.set_archive_path(&archive_path).unwrap();
        sync.step().unwrap(); // start the pipeline but do not drive it to Finished
    }
    assert!(!archive_path.exists());
    let leftover_temp = std::fs::read_dir(workdir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .any(|e| e.file_name().to_string_lossy().contains(".tmp-"));
    assert!(!leftover_temp);
}

#[test]
fn step_after_finished_is_pipeline_closed() {
    let workdir = tempfile::tempdir().unwrap();
    let base_dir = workdir.path().join("base");
    std::fs::create_dir(&base_dir).unwrap();
    std::fs::write(base_dir.join("a.txt"), b"tiny").unwrap();

    let mut sync = synca_core::Synchronizer::new(Direction::Encode, small_chunker());
    sync.set_base_path(&base_dir).unwrap();
    sync.set_archive_path(workdir.path().join("archive.bin")).unwrap();
    run_to_finish(&mut sync);

    assert!(matches!(sync.step(), Err(SyncError::PipelineClosed)));
}

#[test]
fn get_digest_before_finished_is_busy() {
    let workdir = tempfile::tempdir().unwrap();
    let base_dir = workdir.path().join("base");
    std::fs::create_dir(&base_dir).unwrap();
    std::fs::write(base_dir.join("a.txt"), b"tiny").unwrap();

    let mut sync = synca_core::Synchronizer::new(Direction::Encode, small_chunker());
    sync.set_base_path(&base_dir).unwrap();
    sync.set_archive_path(workdir.path().join("archive.bin")).unwrap();
    assert!(matches!(sync.get_digest(), Err(SyncError::Busy(_))));
    sync.step().unwrap();
    assert!(matches!(sync.get_digest(), Err(SyncError::Busy(_))));
}

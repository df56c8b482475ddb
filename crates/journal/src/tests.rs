use super::*;
use std::io::Cursor;
use tempfile::tempdir;

// -------------------- Helpers --------------------

fn header(app_version: i32, value_count: u32) -> JournalHeader {
    JournalHeader {
        app_version,
        value_count,
    }
}

fn replay_all(path: &std::path::Path) -> Result<Vec<JournalRecord>, JournalError> {
    let (mut reader, _header) = JournalReader::open(path)?;
    let mut recs = Vec::new();
    reader.replay(|r| recs.push(r))?;
    Ok(recs)
}

fn replay_from_bytes(data: &[u8]) -> Result<Vec<JournalRecord>, JournalError> {
    let cursor = Cursor::new(data.to_vec());
    let (mut reader, _header) = JournalReader::from_reader(cursor)?;
    let mut recs = Vec::new();
    reader.replay(|r| recs.push(r))?;
    Ok(recs)
}

// -------------------- Basic write & replay --------------------

#[test]
fn write_and_replay_all_record_kinds() {
    let dir = tempdir().unwrap();
    let tmp = dir.path().join("journal.tmp");
    let path = dir.path().join("journal");

    {
        let mut w = JournalWriter::create_fresh(&tmp, &path, &header(1, 2)).unwrap();
        w.append(&JournalRecord::Dirty { key: "a".into() }).unwrap();
        w.append(&JournalRecord::Clean {
            key: "a".into(),
            lengths: vec![10, 20],
        })
        .unwrap();
        w.append(&JournalRecord::Read { key: "a".into() }).unwrap();
        w.append(&JournalRecord::Remove { key: "a".into() })
            .unwrap();
    }

    let recs = replay_all(&path).unwrap();
    assert_eq!(
        recs,
        vec![
            JournalRecord::Dirty { key: "a".into() },
            JournalRecord::Clean {
                key: "a".into(),
                lengths: vec![10, 20],
            },
            JournalRecord::Read { key: "a".into() },
            JournalRecord::Remove { key: "a".into() },
        ]
    );
}

#[test]
fn header_round_trips() {
    let dir = tempdir().unwrap();
    let tmp = dir.path().join("journal.tmp");
    let path = dir.path().join("journal");
    JournalWriter::create_fresh(&tmp, &path, &header(7, 3)).unwrap();

    let (_reader, h) = JournalReader::open(&path).unwrap();
    assert_eq!(h.app_version, 7);
    assert_eq!(h.value_count, 3);
}

#[test]
fn create_fresh_leaves_no_tmp_file_behind() {
    let dir = tempdir().unwrap();
    let tmp = dir.path().join("journal.tmp");
    let path = dir.path().join("journal");
    JournalWriter::create_fresh(&tmp, &path, &header(1, 1)).unwrap();

    assert!(!tmp.exists());
    assert!(path.exists());
}

#[test]
fn reopen_and_append_keeps_earlier_records() {
    let dir = tempdir().unwrap();
    let tmp = dir.path().join("journal.tmp");
    let path = dir.path().join("journal");

    {
        let mut w = JournalWriter::create_fresh(&tmp, &path, &header(1, 1)).unwrap();
        w.append(&JournalRecord::Dirty { key: "a".into() }).unwrap();
    }
    {
        let mut w = JournalWriter::open_append(&path).unwrap();
        w.append(&JournalRecord::Clean {
            key: "a".into(),
            lengths: vec![5],
        })
        .unwrap();
    }

    let recs = replay_all(&path).unwrap();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0], JournalRecord::Dirty { key: "a".into() });
}

// -------------------- Keys --------------------

#[test]
fn round_trips_non_ascii_key() {
    let dir = tempdir().unwrap();
    let tmp = dir.path().join("journal.tmp");
    let path = dir.path().join("journal");

    {
        let mut w = JournalWriter::create_fresh(&tmp, &path, &header(1, 0)).unwrap();
        w.append(&JournalRecord::Dirty {
            key: "caf\u{e9}_\u{4e2d}\u{6587}".into(),
        })
        .unwrap();
    }

    let recs = replay_all(&path).unwrap();
    assert_eq!(recs[0].key(), "caf\u{e9}_\u{4e2d}\u{6587}");
}

// -------------------- Corruption handling --------------------
//
// Unlike a write-ahead log tolerant of a truncated tail, a malformed record
// anywhere in this journal is corruption: the caller is expected to wipe the
// cache directory and rebuild rather than silently drop a suffix.

#[test]
fn truncated_tail_after_valid_records_is_corrupt() {
    let dir = tempdir().unwrap();
    let tmp = dir.path().join("journal.tmp");
    let path = dir.path().join("journal");

    {
        let mut w = JournalWriter::create_fresh(&tmp, &path, &header(1, 0)).unwrap();
        w.append(&JournalRecord::Dirty { key: "a".into() }).unwrap();
    }

    let mut data = fs::read(&path).unwrap();
    data.push(OP_DIRTY);
    data.extend_from_slice(&[0x00, 0x01, b'b']); // key length says 1 byte but none follow
    fs::write(&path, &data).unwrap();

    let err = replay_all(&path).unwrap_err();
    assert!(matches!(err, JournalError::Corrupt(_)));
}

#[test]
fn missing_record_terminator_is_corrupt() {
    let mut buf = Vec::new();
    format::write_header(&mut buf, &header(1, 0)).unwrap();
    buf.push(OP_DIRTY);
    format::write_key(&mut buf, "a").unwrap();
    buf.push(b'x'); // should be '\n'

    let err = replay_from_bytes(&buf).unwrap_err();
    assert!(matches!(err, JournalError::Corrupt(_)));
}

#[test]
fn unknown_opcode_is_corrupt() {
    let mut buf = Vec::new();
    format::write_header(&mut buf, &header(1, 0)).unwrap();
    buf.push(0xFF);
    format::write_key(&mut buf, "a").unwrap();
    buf.push(b'\n');

    let err = replay_from_bytes(&buf).unwrap_err();
    assert!(matches!(err, JournalError::Corrupt(_)));
}

#[test]
fn bad_magic_is_corrupt() {
    let mut buf = vec![0u8; 15];
    buf[0] = 0xFF;
    let err = replay_from_bytes(&buf).unwrap_err();
    assert!(matches!(err, JournalError::Corrupt(_)));
}

#[test]
fn unsupported_version_is_corrupt() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&MAGIC.to_be_bytes());
    buf.push(99);
    buf.extend_from_slice(&1i32.to_be_bytes());
    buf.extend_from_slice(&0u32.to_be_bytes());
    buf.push(b'\n');

    let err = replay_from_bytes(&buf).unwrap_err();
    assert!(matches!(err, JournalError::Corrupt(_)));
}

#[test]
fn truncated_header_is_corrupt() {
    let err = replay_from_bytes(&[0u8; 3]).unwrap_err();
    assert!(matches!(err, JournalError::Corrupt(_)));
}

#[test]
fn empty_journal_replays_to_no_records() {
    let dir = tempdir().unwrap();
    let tmp = dir.path().join("journal.tmp");
    let path = dir.path().join("journal");
    JournalWriter::create_fresh(&tmp, &path, &header(1, 2)).unwrap();

    let recs = replay_all(&path).unwrap();
    assert!(recs.is_empty());
}

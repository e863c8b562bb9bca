#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! QAR archives assembled byte by byte
//!
//! These fixtures are built directly from the on-disk layout with the raw
//! cipher primitives, independently of the archive writer.

use gzs_crypto::qar_cipher::{apply_lcg_keystream, decrypt1, legacy_block_cipher};
use gzs_crypto::{Md5Digest, NameResolver, hash_path_legacy, hash_with_extension};
use gzs_formats::qar::{
    PayloadKind, QAR_MAGIC, QarFile, XOR_MASK_1, XOR_MASK_2, XOR_MASK_3, XOR_MASK_4,
    decode_section, is_encrypted_section,
};
use gzs_formats::{FormatError, MemoryDirectory};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::io::Cursor;

const KEYED_MAGIC: u32 = 0xA0F8_EFE6;
const SIZED_MAGIC: u32 = 0xE3F8_EFE6;

fn push_words(bytes: &mut Vec<u8>, words: &[u32]) {
    for word in words {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
}

/// Version 3 archive holding one keyed, uncompressed entry
fn v3_fixture(path: &str, plain: &[u8], key: u32) -> Vec<u8> {
    v3_archive(&[(path, plain, key)])
}

/// Version 3 archive with one keyed, uncompressed entry per block
fn v3_archive(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
    const SECTION_MASKS: [u32; 4] = [XOR_MASK_1, XOR_MASK_2, XOR_MASK_3, XOR_MASK_4];
    let count = entries.len() as u32;

    let mut bytes = Vec::new();
    push_words(
        &mut bytes,
        &[
            QAR_MAGIC ^ XOR_MASK_1,
            XOR_MASK_1,               // flags 0
            count ^ XOR_MASK_2,       // entry count
            XOR_MASK_3,               // no unknown records
            (count + 1) ^ XOR_MASK_4, // end block
            1024 ^ XOR_MASK_1,        // first entry offset
            3 ^ XOR_MASK_1,           // version
            XOR_MASK_2,               // reserved
        ],
    );
    // masks cycle over the words of the whole table, two words per entry
    for (index, (path, _, _)) in entries.iter().enumerate() {
        let hash = hash_with_extension(path);
        let section = ((index as u64 + 1) << 40) | (hash & 0xFF_FFFF_FFFF);
        push_words(
            &mut bytes,
            &[
                section as u32 ^ SECTION_MASKS[(2 * index) % 4],
                (section >> 32) as u32 ^ SECTION_MASKS[(2 * index + 1) % 4],
            ],
        );
    }
    bytes.resize(1024, 0);

    for (index, (path, plain, key)) in entries.iter().enumerate() {
        let hash = hash_with_extension(path);

        let mut body = plain.to_vec();
        apply_lcg_keystream(&mut body, *key);
        let mut blob = Vec::new();
        push_words(&mut blob, &[KEYED_MAGIC, *key]);
        blob.extend_from_slice(&body);
        let md5 = Md5Digest::from_data(&blob).to_words();
        decrypt1(&mut blob, hash as u32);

        push_words(
            &mut bytes,
            &[
                hash as u32 ^ XOR_MASK_1,
                (hash >> 32) as u32 ^ XOR_MASK_1,
                blob.len() as u32 ^ XOR_MASK_2,
                plain.len() as u32 ^ XOR_MASK_3,
                md5[0] ^ XOR_MASK_4,
                md5[1] ^ XOR_MASK_1,
                md5[2] ^ XOR_MASK_1,
                md5[3] ^ XOR_MASK_2,
            ],
        );
        bytes.extend_from_slice(&blob);
        bytes.resize(1024 * (index + 2), 0);
    }
    bytes
}

#[test]
fn v3_fixture_decodes() {
    let path = "/Assets/tpp/script/fixture.lua";
    let plain = b"-- fixture\nreturn { answer = 42 }\n";
    let bytes = v3_fixture(path, plain, 0x1234_5678);

    let mut resolver = NameResolver::empty();
    resolver.add_path("/Assets/tpp/script/fixture");

    let mut cursor = Cursor::new(bytes.clone());
    assert_eq!(QarFile::detect_version(&mut cursor).unwrap(), Some(3));
    let mut file = QarFile::read(&mut cursor, &resolver).unwrap();
    assert_eq!(file.entries.len(), 1);

    let entry = &file.entries[0];
    assert_eq!(entry.file_path, "Assets\\tpp\\script\\fixture.lua");
    assert!(entry.file_name_found);
    assert!(!entry.compressed);
    assert_eq!(entry.payload_header.map(|h| (h.kind, h.key)), Some((PayloadKind::Keyed, 0x1234_5678)));

    let stream = Mutex::new(cursor);
    let exported = MemoryDirectory::from_exports(file.export_files(), &stream).unwrap();
    assert_eq!(exported.get("Assets\\tpp\\script\\fixture.lua"), Some(&plain[..]));

    // the writer reproduces the hand-built layout
    let mut repacked = Cursor::new(Vec::new());
    file.write(&mut repacked, &exported).unwrap();
    assert_eq!(repacked.into_inner(), bytes);
}

#[test]
fn section_masks_continue_across_entries() {
    let first = "/Assets/tpp/script/first.lua";
    let second = "/Assets/tpp/script/second.lua";
    let bytes = v3_archive(&[
        (first, b"first = 1\n", 0x0101_0101),
        (second, b"second = 2\n", 0x0202_0202),
    ]);

    // the second entry's section words sit under the third and fourth masks
    let word = |offset: usize| u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
    let second_hash = hash_with_extension(second);
    let second_section = (2u64 << 40) | (second_hash & 0xFF_FFFF_FFFF);
    assert_eq!(word(40), second_section as u32 ^ XOR_MASK_3);
    assert_eq!(word(44), (second_section >> 32) as u32 ^ XOR_MASK_4);

    let mut resolver = NameResolver::empty();
    resolver.add_path("/Assets/tpp/script/first");
    resolver.add_path("/Assets/tpp/script/second");

    let mut cursor = Cursor::new(bytes.clone());
    let mut file = QarFile::read(&mut cursor, &resolver).unwrap();
    assert_eq!(file.entries.len(), 2);
    assert_eq!(file.entries[0].file_path, "Assets\\tpp\\script\\first.lua");
    assert_eq!(file.entries[1].file_path, "Assets\\tpp\\script\\second.lua");
    assert_eq!(file.entries[1].hash, second_hash);

    let stream = Mutex::new(cursor);
    let exported = MemoryDirectory::from_exports(file.export_files(), &stream).unwrap();
    assert_eq!(exported.get("Assets\\tpp\\script\\second.lua"), Some(&b"second = 2\n"[..]));

    let mut repacked = Cursor::new(Vec::new());
    file.write(&mut repacked, &exported).unwrap();
    assert_eq!(repacked.into_inner(), bytes);
}

#[test]
fn v1_fixture_decodes() {
    const LUA_LEGACY_ID: u64 = 36;
    let plain_path = "/Assets/tpp/script/lib/TppDefine";
    let keyed_path = "/Assets/tpp/script/lib/TppSequence";
    let plain = b"TppDefine = {}\n".to_vec();
    let keyed = b"TppSequence = { seq = 1 }\n".to_vec();

    let mut bytes = b"SQAR".to_vec();
    push_words(&mut bytes, &[0, 2, 0, 0, 0, 1, 0]);

    // plain payload at 64, keyed payload at 128
    let plain_hash = (LUA_LEGACY_ID << 52) | hash_path_legacy(plain_path, true);
    let keyed_hash = (LUA_LEGACY_ID << 52) | hash_path_legacy(keyed_path, true);

    let mut keyed_blob = Vec::new();
    push_words(&mut keyed_blob, &[KEYED_MAGIC, 0x00AB_CDEF]);
    let mut body = keyed.clone();
    apply_lcg_keystream(&mut body, 0x00AB_CDEF);
    keyed_blob.extend_from_slice(&body);

    bytes.extend_from_slice(&plain_hash.to_le_bytes());
    push_words(&mut bytes, &[64 / 16, plain.len() as u32]);
    bytes.extend_from_slice(&keyed_hash.to_le_bytes());
    push_words(&mut bytes, &[128 / 16, keyed_blob.len() as u32]);

    let mut stored = plain.clone();
    legacy_block_cipher(&mut stored, 64 / 16);
    bytes.resize(64, 0);
    bytes.extend_from_slice(&stored);

    legacy_block_cipher(&mut keyed_blob, 128 / 16);
    bytes.resize(128, 0);
    bytes.extend_from_slice(&keyed_blob);

    let mut resolver = NameResolver::empty();
    resolver.add_path(plain_path);
    resolver.add_path(keyed_path);

    let mut cursor = Cursor::new(bytes);
    assert_eq!(QarFile::detect_version(&mut cursor).unwrap(), Some(1));
    let mut file = QarFile::read(&mut cursor, &resolver).unwrap();
    assert_eq!(file.version, 1);
    assert_eq!(file.entries[0].file_path, "Assets\\tpp\\script\\lib\\TppDefine.lua");
    assert_eq!(file.entries[1].file_path, "Assets\\tpp\\script\\lib\\TppSequence.lua");
    assert_eq!(file.entries[0].payload_header, None);
    assert_eq!(file.entries[1].payload_header.map(|h| h.key), Some(0x00AB_CDEF));

    let stream = Mutex::new(cursor);
    let exported = MemoryDirectory::from_exports(file.export_files(), &stream).unwrap();
    assert_eq!(exported.get("Assets\\tpp\\script\\lib\\TppDefine.lua"), Some(&plain[..]));
    assert_eq!(exported.get("Assets\\tpp\\script\\lib\\TppSequence.lua"), Some(&keyed[..]));

    // version 1 archives are read only
    let err = file.write(&mut Cursor::new(Vec::new()), &exported).unwrap_err();
    assert!(matches!(err, FormatError::UnsupportedVersion(1)));
}

#[test]
fn unknown_hash_gets_placeholder() {
    let bytes = v3_fixture("/Assets/tpp/unlisted/thing.lua", b"x = 1", 7);
    let file = QarFile::read(&mut Cursor::new(bytes), &NameResolver::empty()).unwrap();
    let entry = &file.entries[0];
    assert!(!entry.file_name_found);

    let path_hash = entry.hash & 0x3_FFFF_FFFF_FFFF;
    assert_eq!(entry.file_path, format!("{path_hash:x}.lua"));
}

#[test]
fn standalone_sized_section() {
    let plain = b"section body ".repeat(40);
    let compressed = {
        use flate2::Compression;
        use flate2::write::ZlibEncoder;
        use std::io::Write;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&plain).unwrap();
        encoder.finish().unwrap()
    };

    let mut body = compressed.clone();
    apply_lcg_keystream(&mut body, 0x55AA);
    let mut section = Vec::new();
    push_words(
        &mut section,
        &[SIZED_MAGIC, 0x55AA, plain.len() as u32, compressed.len() as u32],
    );
    section.extend_from_slice(&body);

    assert!(is_encrypted_section(&section));
    let decoded = decode_section(&section).unwrap();
    assert!(decoded.compressed);
    assert_eq!(decoded.data, plain);
}

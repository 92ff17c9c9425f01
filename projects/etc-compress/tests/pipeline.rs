//! End-to-end container and concurrency tests.

use std::fs;
use std::path::PathBuf;

use etc_compress::container::{KTX_MAGIC, PVR_HEADER_LEN, PVR_MAGIC};
use etc_compress::{BlockData, Channels, Size};

fn temp_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("etc_compress_{name}_{}", std::process::id()));
    let _ = fs::remove_file(&path);
    path
}

#[test]
fn pvr_file_roundtrip() {
    let path = temp_path("roundtrip.pvr");
    let size = Size::new(16, 16);

    let payload: Vec<u8> = {
        let data = BlockData::create(&path, size, true).unwrap();
        let src: Vec<u32> = (0..size.pixels())
            .map(|i| 0xFF00_0000 | (i as u32 * 7919) & 0x00FF_FFFF)
            .collect();
        unsafe {
            data.process(&src, 16, 0, 16, Channels::Rgb, false, false);
        }
        assert_eq!(data.len(), 52 + 128 + 32 + 8 + 8 + 8);
        data.payload().to_vec()
    };

    let reopened = BlockData::open(&path).unwrap();
    assert_eq!(reopened.size(), size);
    assert_eq!(reopened.levels(), 5);
    assert_eq!(reopened.data_offset(), PVR_HEADER_LEN);
    assert_eq!(reopened.payload(), payload.as_slice());

    drop(reopened);
    fs::remove_file(&path).unwrap();
}

#[test]
fn hand_crafted_pvr_decodes() {
    // 52-byte header, no metadata, 4x4, one level, one zero block.
    let path = temp_path("crafted.pvr");
    let mut file = vec![0u8; 60];
    file[0..4].copy_from_slice(&PVR_MAGIC.to_le_bytes());
    file[24..28].copy_from_slice(&4u32.to_le_bytes()); // height
    file[28..32].copy_from_slice(&4u32.to_le_bytes()); // width
    file[44..48].copy_from_slice(&1u32.to_le_bytes()); // mipmap count
    fs::write(&path, &file).unwrap();

    let data = BlockData::open(&path).unwrap();
    assert_eq!(data.size(), Size::new(4, 4));
    let bmp = data.decode();
    assert_eq!(bmp.size(), Size::new(4, 4));
    assert_eq!(bmp.pixel(0, 0) >> 24, 0xFF);

    drop(data);
    fs::remove_file(&path).unwrap();
}

#[test]
fn ktx_header_locates_payload() {
    let path = temp_path("crafted.ktx");
    let mut file = vec![0u8; 68 + 32];
    file[0..4].copy_from_slice(&KTX_MAGIC.to_le_bytes());
    file[36..40].copy_from_slice(&8u32.to_le_bytes()); // width, word 9
    file[40..44].copy_from_slice(&8u32.to_le_bytes()); // height, word 10
    file[60..64].copy_from_slice(&0u32.to_le_bytes()); // key/value bytes, word 15
    fs::write(&path, &file).unwrap();

    let data = BlockData::open(&path).unwrap();
    assert_eq!(data.size(), Size::new(8, 8));
    assert_eq!(data.data_offset(), 68);

    drop(data);
    fs::remove_file(&path).unwrap();
}

#[test]
fn unsupported_envelope_is_rejected() {
    let path = temp_path("bogus.bin");
    fs::write(&path, [0xABu8; 64]).unwrap();

    assert!(BlockData::open(&path).is_err());
    fs::remove_file(&path).unwrap();
}

#[test]
fn parallel_encode_matches_single_threaded() {
    let size = Size::new(64, 64);
    let src: Vec<u32> = (0..size.pixels())
        .map(|i| {
            let x = (i % 64) as u32;
            let y = (i / 64) as u32;
            0xFF00_0000 | (x * 4) << 16 | (y * 4) << 8 | (x * 2 + y * 2)
        })
        .collect();

    let reference = BlockData::create_in_memory(size, false).unwrap();
    unsafe {
        reference.process(&src, 256, 0, 64, Channels::Rgb, true, true);
    }

    let concurrent = BlockData::create_in_memory(size, false).unwrap();
    // Four disjoint ranges of four block rows each.
    std::thread::scope(|scope| {
        for chunk in 0..4usize {
            let offset = chunk * 64;
            let rows = &src[chunk * 16 * 64..];
            let concurrent = &concurrent;
            scope.spawn(move || unsafe {
                concurrent.process(rows, 64, offset, 64, Channels::Rgb, true, true);
            });
        }
    });

    assert_eq!(reference.payload(), concurrent.payload());
}

#[test]
fn decode_has_opaque_alpha_everywhere() {
    let size = Size::new(8, 8);
    let data = BlockData::create_in_memory(size, false).unwrap();
    let src: Vec<u32> = (0..size.pixels()).map(|i| (i as u32).wrapping_mul(0x9E37)).collect();
    unsafe {
        data.process(&src, 4, 0, 8, Channels::Rgb, false, true);
    }
    let bmp = data.decode();
    assert!(bmp.data().iter().all(|px| px >> 24 == 0xFF));
}

//! These benchmarks compare direct memory device reads vs reads through
//! the `Sub`, `Shift` and `Multiplex` adaptors, and file reads.

#![feature(test)]
extern crate test;

use std::cell::RefCell;
use std::fs::File;

use devio::adapt::{Multiplex, Shift, Sub};
use devio::device::{write_all, OffsetRange, Random, Reader, Result};
use devio::mem::MemoryDevice;
use tempfile::tempfile;
use test::Bencher;

const CHUNK_COUNT: usize = 48;
const CHUNK_SIZE: usize = 8 * 1024;
const READ_BUFF_SIZE: usize = 101;
const TOTAL: usize = CHUNK_SIZE * CHUNK_COUNT;

#[bench]
fn read_all_mem(b: &mut Bencher) {
    let mut dev = create_mem();
    b.iter( || {
        dev.seek(0).expect("rewind");
        let len = read_to_end(&mut dev).expect("read mem");
        assert_eq!(TOTAL, len);
    })
}

#[bench]
fn read_all_sub(b: &mut Bencher) {
    let mut dev = create_mem();
    b.iter( || {
        let mut rdr = Sub::<MemoryDevice, _>::new(
            &mut dev,
            OffsetRange::new(0, TOTAL as i64)
        );
        rdr.seek(0).expect("rewind");
        let len = read_to_end(&mut rdr).expect("read sub");
        assert_eq!(TOTAL, len);
    })
}

#[bench]
fn read_all_shift(b: &mut Bencher) {
    let mut dev = create_mem();
    b.iter( || {
        let mut rdr = Shift::<MemoryDevice, _>::new(&mut dev, 0);
        rdr.seek(0).expect("rewind");
        let len = read_to_end(&mut rdr).expect("read shift");
        assert_eq!(TOTAL, len);
    })
}

#[bench]
fn read_all_multiplex(b: &mut Bencher) {
    let dev = RefCell::new(create_mem());
    b.iter( || {
        let mut rdr = Multiplex::new(&dev);
        let len = read_to_end(&mut rdr).expect("read multiplex");
        assert_eq!(TOTAL, len);
    })
}

#[bench]
fn read_all_file(b: &mut Bencher) {
    let mut file = create_file().expect("create file");
    b.iter( || {
        Random::seek(&mut file, 0).expect("rewind");
        let len = read_to_end(&mut file).expect("read file");
        assert_eq!(TOTAL, len);
    })
}

fn create_mem() -> MemoryDevice {
    let mut data = Vec::with_capacity(TOTAL);
    for c in 0..CHUNK_COUNT {
        data.extend_from_slice(&[c as u8; CHUNK_SIZE]);
    }
    MemoryDevice::with_data(data)
}

fn create_file() -> Result<File> {
    let mut file = tempfile()?;
    for c in 0..CHUNK_COUNT {
        let buf = [c as u8; CHUNK_SIZE];
        write_all(&mut file, &buf)?;
    }
    Ok(file)
}

fn read_to_end<R: Reader>(r: &mut R) -> Result<usize> {
    let mut buf = [0u8; READ_BUFF_SIZE];
    let mut total = 0;
    loop {
        let len = r.read(&mut buf)?.len();
        if len == 0 {
            break;
        }
        total += len;
    }
    Ok(total)
}

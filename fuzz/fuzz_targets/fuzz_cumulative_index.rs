//! Fuzz target for chunk offset lookup

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use snapfs_vfs::CumulativeIndex;

#[derive(Debug, Arbitrary)]
struct Input {
    sizes: Vec<u16>,
    offset: u32,
}

fuzz_target!(|input: Input| {
    let index = CumulativeIndex::from_sizes(input.sizes.iter().map(|&s| u64::from(s)));
    let offset = u64::from(input.offset);

    match index.locate(offset) {
        Some((chunk, local)) => {
            let size = u64::from(input.sizes[chunk]);
            assert!(local < size);
            assert_eq!(index.offsets()[chunk] + local, offset);
        }
        None => assert!(offset >= index.total()),
    }
});

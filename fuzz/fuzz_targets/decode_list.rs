#![no_main]
use chunk_pack::{from_slice_with_options, ChunkOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let options = ChunkOptions::default().with_max_chunk_size(1 << 20);
    let _ = from_slice_with_options::<u64>(data, &options);
    let _ = from_slice_with_options::<String>(data, &options);
    let _ = from_slice_with_options::<(i32, Option<Vec<u8>>)>(data, &options);
});

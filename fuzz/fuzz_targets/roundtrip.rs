#![no_main]
use chunk_pack::{from_slice_with_options, to_vec_with_options, ChunkOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    // First byte picks the cutoff, the rest is the list
    let options = ChunkOptions::default().with_cutoff(8 + data[0] as usize * 4);
    let list = &data[1..];
    let encoded = to_vec_with_options(Some(list), &options).unwrap();
    let decoded: Vec<u8> = from_slice_with_options(&encoded, &options).unwrap().unwrap();
    assert_eq!(decoded, list);
});

use page_stream::prelude::*;
use rand::prelude::*;
use std::time::Instant;

const LEN: usize = 10_000_000;
const PAGE_SIZE: usize = 65_536;

fn main() {
    // fill array with random numbers
    let instant = Instant::now();
    let array: Vec<i32> = Stream::new(vec![0; LEN])
        .parallel_with_setting(PAGE_SIZE, None)
        .map(|_| rand::thread_rng().gen())
        .into_list();
    eprintln!("random vec generation:\t{:?}", instant.elapsed());

    // benchmark non-concurrent sorting
    let mut array_std = array.clone();
    let instant = Instant::now();
    array_std.sort();
    eprintln!("std sort:\t{:?}", instant.elapsed());

    // sort pages in parallel, then merge pairs of pages until one is left
    let stream = Stream::new(array).parallel_with_setting(PAGE_SIZE, None);
    let instant = Instant::now();
    let array_paged = stream.sorted().into_list();
    eprintln!("paged sort:\t{:?}", instant.elapsed());

    // distinct values, first occurrence kept
    let instant = Instant::now();
    let unique = stream.distinct().count();
    eprintln!("distinct:\t{:?} ({} unique)", instant.elapsed(), unique);

    assert!(array_std == array_paged);
}

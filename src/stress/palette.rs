/// Allocation sizes workers pick from: mostly small, a few medium, and a large outlier pair to exercise large-object paths.
pub const SIZES : [usize; 11] = [16, 32, 60, 96, 120, 144, 255, 400, 670, 99999, 128 * 1024];

/// The byte a worker writes at `offset` of each of its allocations: an ownership fingerprint.
///
/// `(thread + offset) mod 256`, so neighboring threads' fingerprints differ at every offset.
#[inline(always)] pub fn fingerprint(thread: usize, offset: usize) -> u8 { thread.wrapping_add(offset) as u8 }



#[test] fn fingerprints() {
    assert_eq!(fingerprint(0, 0), 0x00);
    assert_eq!(fingerprint(3, 4), 0x07);
    assert_eq!(fingerprint(1, 255), 0x00);
    assert_eq!(fingerprint(2, 1000), ((2 + 1000) % 256) as u8);
    for offset in 0 .. 1024 { assert_ne!(fingerprint(0, offset), fingerprint(1, offset)) }
}

#[test] fn palette() {
    assert!(SIZES.windows(2).all(|w| w[0] < w[1]), "palette should be sorted and unique");
    assert_eq!(SIZES.iter().copied().max(), Some(131072));
}

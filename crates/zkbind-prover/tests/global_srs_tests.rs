//! Process-wide provider; kept in its own test binary

use std::sync::Arc;

use zkbind_prover::srs::{
    get_crs_factory, init_crs_factory, init_file_crs_factory, init_seeded_crs_factory,
    MemReferenceStringFactory, ReferenceString, SrsError, DEFAULT_SRS_POINTS, DEFAULT_SRS_SEED,
};

#[test]
fn test_global_provider_lifecycle() {
    // Default provider is created on first use
    let default = get_crs_factory();
    let srs = default.reference_string(1).unwrap();
    assert_eq!(srs.num_points(), DEFAULT_SRS_POINTS);
    let expected = ReferenceString::generate(DEFAULT_SRS_POINTS, DEFAULT_SRS_SEED).unwrap();
    assert_eq!(srs, Arc::new(expected));
    assert!(Arc::ptr_eq(&default, &get_crs_factory()));

    // Explicit replacement
    let small = ReferenceString::generate(32, b"global").unwrap();
    init_crs_factory(Arc::new(MemReferenceStringFactory::new(small.clone())));
    assert_eq!(get_crs_factory().reference_string(32).unwrap().digest(), small.digest());

    init_seeded_crs_factory(64, b"seeded").unwrap();
    assert_eq!(get_crs_factory().reference_string(1).unwrap().num_points(), 64);

    // A failed init leaves the current provider in place
    assert!(matches!(init_seeded_crs_factory(0, b"empty"), Err(SrsError::Empty)));
    let dir = tempfile::tempdir().unwrap();
    assert!(init_file_crs_factory(dir.path().join("none.bin")).is_err());
    assert_eq!(get_crs_factory().reference_string(1).unwrap().num_points(), 64);

    let path = dir.path().join("srs.bin");
    ReferenceString::generate(128, b"from-file").unwrap().write_to_file(&path).unwrap();
    init_file_crs_factory(&path).unwrap();
    assert_eq!(get_crs_factory().reference_string(1).unwrap().num_points(), 128);
}

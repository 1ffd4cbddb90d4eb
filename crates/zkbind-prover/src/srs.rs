//! Structured reference strings and their providers
//!
//! A reference string is a list of monomial points `tau^i` over M31. Sessions
//! borrow a prefix of it: its size bounds the circuits that can be built, its
//! points weight the composed constraints, and its digest is bound into every
//! verification key.
//!
//! Providers hand out shared, read-only `Arc<ReferenceString>`s and are safe
//! to use from many sessions at once. A process-wide provider is created
//! lazily and can be replaced with [`init_crs_factory`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::{Lazy, OnceCell};
use thiserror::Error;
use tracing::{debug, info};

use crate::keys::MAX_LOG_ROWS;
use crate::m31::{M31, M31_BYTES};
use crate::merkle::{hash_parts, Hash, HASH_SIZE};

/// Magic prefix of a reference string file
pub const SRS_FILE_MAGIC: &[u8; 8] = b"ZKBSRS01";

/// Points in the default process-wide reference string
pub const DEFAULT_SRS_POINTS: usize = 1 << 12;

/// Largest reference string, one point per row of the largest trace
pub const MAX_SRS_POINTS: usize = 1 << MAX_LOG_ROWS;

/// Seed of the default process-wide reference string
pub const DEFAULT_SRS_SEED: &[u8] = b"zkbind-default-srs-v1";

const TAU_DOMAIN: &[u8] = b"zkbind-srs-tau";
const DIGEST_DOMAIN: &[u8] = b"zkbind-srs-digest";

/// Reference string errors
#[derive(Debug, Error)]
pub enum SrsError {
    #[error("reference string has no points")]
    Empty,
    #[error("reference string too small: need {required} points, have {available}")]
    TooSmall { required: usize, available: usize },
    #[error("reference string too large: {requested} points requested, at most {max} supported")]
    TooLarge { requested: usize, max: usize },
    #[error("cannot allocate {points} reference string points")]
    OutOfMemory { points: usize },
    #[error("reference string point {index} is not a canonical field element")]
    NonCanonical { index: usize },
    #[error("reference string point {index} breaks the monomial progression")]
    Malformed { index: usize },
    #[error("failed to access reference string file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid reference string file: {0}")]
    Format(String),
    #[error("reference string checksum mismatch")]
    Checksum,
}

/// Monomial reference string `[1, tau, tau^2, ...]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceString {
    points: Vec<M31>,
    digest: Hash,
}

impl ReferenceString {
    /// Derive `num_points` points from a seed
    pub fn generate(num_points: usize, seed: &[u8]) -> Result<Self, SrsError> {
        check_point_count(num_points)?;

        let mut tau_hash = hash_parts(&[TAU_DOMAIN, seed]);
        let mut tau = M31::from_le_bytes([tau_hash[0], tau_hash[1], tau_hash[2], tau_hash[3]]);
        // tau in {0, 1} would collapse every point
        while tau.value() <= 1 {
            tau_hash = hash_parts(&[TAU_DOMAIN, &tau_hash]);
            tau = M31::from_le_bytes([tau_hash[0], tau_hash[1], tau_hash[2], tau_hash[3]]);
        }

        let mut points = Vec::new();
        points
            .try_reserve_exact(num_points)
            .map_err(|_| SrsError::OutOfMemory { points: num_points })?;
        let mut current = M31::ONE;
        for _ in 0..num_points {
            points.push(current);
            current *= tau;
        }

        debug!(num_points, "generated reference string");
        Ok(Self::from_validated(points))
    }

    /// Build from explicit points, checking they form a monomial progression
    pub fn from_points(points: Vec<M31>) -> Result<Self, SrsError> {
        let first = *points.first().ok_or(SrsError::Empty)?;

        if let Some(index) = points.iter().position(|p| !p.is_canonical()) {
            return Err(SrsError::NonCanonical { index });
        }
        if first != M31::ONE {
            return Err(SrsError::Malformed { index: 0 });
        }
        if let Some(&tau) = points.get(1) {
            if tau.value() <= 1 {
                return Err(SrsError::Malformed { index: 1 });
            }
            if let Some(index) = (2..points.len()).find(|&i| points[i] != points[i - 1] * tau) {
                return Err(SrsError::Malformed { index });
            }
        }

        Ok(Self::from_validated(points))
    }

    fn from_validated(points: Vec<M31>) -> Self {
        let digest = prefix_digest(&points);
        Self { points, digest }
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[M31] {
        &self.points
    }

    /// Digest over every point
    pub fn digest(&self) -> Hash {
        self.digest
    }

    /// The first `len` points, or `TooSmall`
    pub fn prefix(&self, len: usize) -> Result<&[M31], SrsError> {
        self.points.get(..len).ok_or(SrsError::TooSmall {
            required: len,
            available: self.points.len(),
        })
    }

    /// Digest over the first `len` points
    ///
    /// Two reference strings generated from the same seed agree on every
    /// prefix, so keys stay stable when a larger string is loaded.
    pub fn prefix_digest(&self, len: usize) -> Result<Hash, SrsError> {
        self.prefix(len).map(prefix_digest)
    }

    /// Encode as a reference string file
    pub fn to_file_bytes(&self) -> Vec<u8> {
        let capacity = SRS_FILE_MAGIC.len() + 4 + self.points.len() * M31_BYTES + HASH_SIZE;
        let mut bytes = Vec::with_capacity(capacity);
        bytes.extend_from_slice(SRS_FILE_MAGIC);
        bytes.extend_from_slice(&(self.points.len() as u32).to_le_bytes());
        for point in &self.points {
            bytes.extend_from_slice(&point.to_le_bytes());
        }
        let checksum = hash_parts(&[&bytes]);
        bytes.extend_from_slice(&checksum);
        bytes
    }

    /// Decode a reference string file
    pub fn from_file_bytes(bytes: &[u8]) -> Result<Self, SrsError> {
        let header_len = SRS_FILE_MAGIC.len() + 4;
        if bytes.len() < header_len + HASH_SIZE {
            return Err(SrsError::Format(format!("file too short ({} bytes)", bytes.len())));
        }
        if &bytes[..SRS_FILE_MAGIC.len()] != SRS_FILE_MAGIC {
            return Err(SrsError::Format("bad magic".to_string()));
        }

        let mut count = [0u8; 4];
        count.copy_from_slice(&bytes[SRS_FILE_MAGIC.len()..header_len]);
        let count = u32::from_le_bytes(count) as usize;
        check_point_count(count)?;

        let body_len = header_len + count * M31_BYTES;
        if bytes.len() != body_len + HASH_SIZE {
            return Err(SrsError::Format(format!(
                "header announces {} points but file holds {} bytes",
                count,
                bytes.len()
            )));
        }
        if hash_parts(&[&bytes[..body_len]])[..] != bytes[body_len..] {
            return Err(SrsError::Checksum);
        }

        let points = bytes[header_len..body_len]
            .chunks_exact(M31_BYTES)
            .map(|chunk| M31::from_raw_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Self::from_points(points)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SrsError> {
        let path = path.as_ref();
        fs::write(path, self.to_file_bytes()).map_err(|source| SrsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, SrsError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| SrsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_file_bytes(&bytes)
    }
}

fn check_point_count(num_points: usize) -> Result<(), SrsError> {
    match num_points {
        0 => Err(SrsError::Empty),
        n if n > MAX_SRS_POINTS => Err(SrsError::TooLarge {
            requested: n,
            max: MAX_SRS_POINTS,
        }),
        _ => Ok(()),
    }
}

fn prefix_digest(points: &[M31]) -> Hash {
    let mut encoded = Vec::with_capacity(points.len() * M31_BYTES);
    for point in points {
        encoded.extend_from_slice(&point.to_le_bytes());
    }
    hash_parts(&[DIGEST_DOMAIN, &(points.len() as u64).to_le_bytes(), &encoded])
}

/// Source of reference strings for session construction
pub trait ReferenceStringProvider: Send + Sync {
    /// A reference string holding at least `min_points` points
    fn reference_string(&self, min_points: usize) -> Result<Arc<ReferenceString>, SrsError>;

    /// Short description for logs
    fn describe(&self) -> String;
}

fn ensure_size(
    srs: Arc<ReferenceString>,
    min_points: usize,
) -> Result<Arc<ReferenceString>, SrsError> {
    if srs.num_points() < min_points {
        return Err(SrsError::TooSmall {
            required: min_points,
            available: srs.num_points(),
        });
    }
    Ok(srs)
}

/// Provider over a reference string already held in memory
#[derive(Clone, Debug)]
pub struct MemReferenceStringFactory {
    srs: Arc<ReferenceString>,
}

impl MemReferenceStringFactory {
    pub fn new(srs: ReferenceString) -> Self {
        Self { srs: Arc::new(srs) }
    }
}

impl ReferenceStringProvider for MemReferenceStringFactory {
    fn reference_string(&self, min_points: usize) -> Result<Arc<ReferenceString>, SrsError> {
        ensure_size(Arc::clone(&self.srs), min_points)
    }

    fn describe(&self) -> String {
        format!("in-memory reference string ({} points)", self.srs.num_points())
    }
}

/// Provider generating its reference string from a seed on first use
#[derive(Debug)]
pub struct SeededReferenceStringFactory {
    num_points: usize,
    seed: Vec<u8>,
    cache: OnceCell<Arc<ReferenceString>>,
}

impl SeededReferenceStringFactory {
    pub fn new(num_points: usize, seed: impl Into<Vec<u8>>) -> Self {
        Self {
            num_points,
            seed: seed.into(),
            cache: OnceCell::new(),
        }
    }

    /// Whether the points have been generated yet
    pub fn is_generated(&self) -> bool {
        self.cache.get().is_some()
    }
}

impl Default for SeededReferenceStringFactory {
    fn default() -> Self {
        Self::new(DEFAULT_SRS_POINTS, DEFAULT_SRS_SEED)
    }
}

impl ReferenceStringProvider for SeededReferenceStringFactory {
    fn reference_string(&self, min_points: usize) -> Result<Arc<ReferenceString>, SrsError> {
        let srs = self.cache.get_or_try_init(|| {
            ReferenceString::generate(self.num_points, &self.seed).map(Arc::new)
        })?;
        ensure_size(Arc::clone(srs), min_points)
    }

    fn describe(&self) -> String {
        format!("seeded reference string ({} points)", self.num_points)
    }
}

/// Provider loading its reference string from disk on first use
#[derive(Debug)]
pub struct FileReferenceStringFactory {
    path: PathBuf,
    cache: OnceCell<Arc<ReferenceString>>,
}

impl FileReferenceStringFactory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.get().is_some()
    }
}

impl ReferenceStringProvider for FileReferenceStringFactory {
    fn reference_string(&self, min_points: usize) -> Result<Arc<ReferenceString>, SrsError> {
        let srs = self.cache.get_or_try_init(|| {
            let srs = ReferenceString::read_from_file(&self.path)?;
            info!(
                path = %self.path.display(),
                points = srs.num_points(),
                "loaded reference string"
            );
            Ok::<_, SrsError>(Arc::new(srs))
        })?;
        ensure_size(Arc::clone(srs), min_points)
    }

    fn describe(&self) -> String {
        format!("reference string file {}", self.path.display())
    }
}

static CRS_FACTORY: Lazy<RwLock<Option<Arc<dyn ReferenceStringProvider>>>> =
    Lazy::new(|| RwLock::new(None));

/// Replace the process-wide provider
pub fn init_crs_factory(provider: Arc<dyn ReferenceStringProvider>) {
    info!(provider = %provider.describe(), "installing reference string provider");
    *CRS_FACTORY.write().unwrap_or_else(PoisonError::into_inner) = Some(provider);
}

/// Install a seeded provider, generating its points immediately
pub fn init_seeded_crs_factory(num_points: usize, seed: &[u8]) -> Result<(), SrsError> {
    let factory = SeededReferenceStringFactory::new(num_points, seed);
    factory.reference_string(0)?;
    init_crs_factory(Arc::new(factory));
    Ok(())
}

/// Install a file-backed provider, loading the file immediately
pub fn init_file_crs_factory(path: impl Into<PathBuf>) -> Result<(), SrsError> {
    let factory = FileReferenceStringFactory::new(path);
    factory.reference_string(0)?;
    init_crs_factory(Arc::new(factory));
    Ok(())
}

/// The process-wide provider, created with default parameters on first use
pub fn get_crs_factory() -> Arc<dyn ReferenceStringProvider> {
    if let Some(provider) = CRS_FACTORY.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
        return Arc::clone(provider);
    }

    let mut slot = CRS_FACTORY.write().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(slot.get_or_insert_with(|| {
        debug!("creating default reference string provider");
        Arc::new(SeededReferenceStringFactory::default())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_monomial() {
        let srs = ReferenceString::generate(16, b"seed").unwrap();
        assert_eq!(srs.num_points(), 16);
        assert_eq!(srs.points()[0], M31::ONE);
        let tau = srs.points()[1];
        assert_eq!(srs.points()[5], tau.square().square() * tau);
        assert!(ReferenceString::from_points(srs.points().to_vec()).is_ok());
    }

    #[test]
    fn test_generate_deterministic_prefixes() {
        let small = ReferenceString::generate(8, b"seed").unwrap();
        let large = ReferenceString::generate(32, b"seed").unwrap();
        assert_eq!(small.points(), &large.points()[..8]);
        assert_eq!(small.digest(), large.prefix_digest(8).unwrap());
        assert_ne!(small.digest(), large.digest());

        let other = ReferenceString::generate(8, b"other").unwrap();
        assert_ne!(small.digest(), other.digest());
    }

    #[test]
    fn test_generate_rejects_bad_point_counts() {
        assert!(matches!(ReferenceString::generate(0, b"seed"), Err(SrsError::Empty)));
        assert!(matches!(
            ReferenceString::generate(u32::MAX as usize, b"seed"),
            Err(SrsError::TooLarge { max: MAX_SRS_POINTS, .. })
        ));
        assert!(matches!(
            ReferenceString::generate(MAX_SRS_POINTS + 1, b"seed"),
            Err(SrsError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_file_header_count_is_capped() {
        let mut bytes = ReferenceString::generate(4, b"seed").unwrap().to_file_bytes();
        let offset = SRS_FILE_MAGIC.len();
        bytes[offset..offset + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            ReferenceString::from_file_bytes(&bytes),
            Err(SrsError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_from_points_validation() {
        let srs = ReferenceString::generate(8, b"seed").unwrap();

        let mut broken = srs.points().to_vec();
        broken[4] += M31::ONE;
        assert!(matches!(
            ReferenceString::from_points(broken),
            Err(SrsError::Malformed { index: 4 })
        ));

        let mut non_canonical = srs.points().to_vec();
        non_canonical[2] = M31(u32::MAX);
        assert!(matches!(
            ReferenceString::from_points(non_canonical),
            Err(SrsError::NonCanonical { index: 2 })
        ));

        assert!(matches!(ReferenceString::from_points(vec![]), Err(SrsError::Empty)));
    }

    #[test]
    fn test_prefix_too_small() {
        let srs = ReferenceString::generate(4, b"seed").unwrap();
        assert!(srs.prefix(4).is_ok());
        assert!(matches!(
            srs.prefix(5),
            Err(SrsError::TooSmall { required: 5, available: 4 })
        ));
    }

    #[test]
    fn test_file_bytes_checksum() {
        let srs = ReferenceString::generate(8, b"seed").unwrap();
        let mut bytes = srs.to_file_bytes();
        assert_eq!(ReferenceString::from_file_bytes(&bytes).unwrap(), srs);

        bytes[14] ^= 0x01;
        assert!(matches!(ReferenceString::from_file_bytes(&bytes), Err(SrsError::Checksum)));

        assert!(matches!(
            ReferenceString::from_file_bytes(b"ZKBSRS01"),
            Err(SrsError::Format(_))
        ));
    }

    #[test]
    fn test_seeded_factory_is_lazy() {
        let factory = SeededReferenceStringFactory::new(64, b"lazy".to_vec());
        assert!(!factory.is_generated());

        let first = factory.reference_string(32).unwrap();
        assert!(factory.is_generated());
        let second = factory.reference_string(64).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        assert!(matches!(
            factory.reference_string(65),
            Err(SrsError::TooSmall { required: 65, available: 64 })
        ));
    }
}

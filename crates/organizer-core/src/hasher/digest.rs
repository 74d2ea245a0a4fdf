use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, BufReader, Read};
use std::path::Path;
use twox_hash::XxHash64;

const PARTIAL_HASH_LENGTH: u64 = 1024; // 1KB

/// XxHash64 of the first 1KB. Cheap pre-filter: files that differ here
/// cannot be duplicates, so they never reach the full digest.
pub fn partial_hash(file: &Path) -> io::Result<u64> {
    let mut buffer = Vec::with_capacity(PARTIAL_HASH_LENGTH as usize);
    File::open(file)?
        .take(PARTIAL_HASH_LENGTH)
        .read_to_end(&mut buffer)?;

    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&buffer);
    Ok(hasher.finish())
}

/// Hex BLAKE3 digest of the whole file, streamed without loading it in memory.
pub fn content_digest(file: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(file)?);
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_identical_content_same_digest() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.bin");
        let b = tmp.path().join("b.bin");
        fs::write(&a, vec![7u8; 5000]).unwrap();
        fs::write(&b, vec![7u8; 5000]).unwrap();

        assert_eq!(partial_hash(&a).unwrap(), partial_hash(&b).unwrap());
        assert_eq!(content_digest(&a).unwrap(), content_digest(&b).unwrap());
        assert_eq!(content_digest(&a).unwrap().len(), 64);
    }

    #[test]
    fn test_difference_after_prefix_is_caught_by_full_digest() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.bin");
        let b = tmp.path().join("b.bin");
        let mut tail_differs = vec![1u8; 4096];
        fs::write(&a, &tail_differs).unwrap();
        tail_differs[4000] = 2;
        fs::write(&b, &tail_differs).unwrap();

        assert_eq!(partial_hash(&a).unwrap(), partial_hash(&b).unwrap());
        assert_ne!(content_digest(&a).unwrap(), content_digest(&b).unwrap());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let tmp = tempdir().unwrap();
        assert!(content_digest(&tmp.path().join("gone")).is_err());
        assert!(partial_hash(&tmp.path().join("gone")).is_err());
    }
}

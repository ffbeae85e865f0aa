use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Lowercase hex SHA-1 of everything `reader` yields.
pub fn sha1_reader(reader: &mut dyn Read) -> std::io::Result<String> {
    let mut hasher = Sha1::new();
    let mut buffer = [0; 8192];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

pub fn calculate_sha1(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    sha1_reader(&mut file)
}

/// Length of a hex-encoded SHA-1 digest.
pub const SHA1_HEX_LEN: usize = 40;

/// Whether `digest` has the shape of a hex SHA-1, in either case.
pub fn is_sha1_hex(digest: &str) -> bool {
    digest.len() == SHA1_HEX_LEN && digest.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Hex digests compare case-insensitively.
pub fn hashes_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

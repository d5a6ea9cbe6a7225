use sha2::{Digest, Sha512};

/// Delimiter between parameter values in the signing input.
const DELIMITER: &str = ";";

/// Sign a sequence of request parameter values: SHA-512 over the values
/// joined by `;`, hex-encoded.
///
/// The values are hashed in exactly the order given. Parameter ordering is
/// part of the wire protocol - the request builder and any verifying side
/// must agree on it, and reordering changes the signature. This function
/// never sorts or deduplicates.
pub fn sign_values<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let joined = values.into_iter().collect::<Vec<_>>().join(DELIMITER);
    let mut hasher = Sha512::new();
    hasher.update(joined.as_bytes());
    hex::encode(hasher.finalize())
}

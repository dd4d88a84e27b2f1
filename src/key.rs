//! Cache key derivation.
//! Key: the trimmed text cut at 50 UTF-16 code units + 32-bit rolling hash of
//! the full text + target language, joined with `|`. The prefix keeps the
//! cache file human-readable; the hash disambiguates texts sharing a prefix.

/// Maximum length of the human-readable key prefix, in UTF-16 code units.
/// Counting units instead of chars keeps keys byte-compatible with cache
/// files produced by the historical format, which measured string length in
/// UTF-16. A pair straddling the cutoff is dropped rather than split.
const MAX_PREFIX_UNITS: usize = 50;

/// Derive the cache key for `(text, target_lang)`. Pure and deterministic.
///
/// The hash is `h = h*31 + unit` over the text's UTF-16 code units, folded to
/// a signed 32-bit value with wrapping arithmetic and rendered as hex
/// (`-`-prefixed when negative). Two distinct texts sharing the same 50-char
/// prefix and colliding hash map to the same key; this collision risk is an
/// accepted design choice carried over from existing cache files, not an
/// oversight to fix here.
pub fn derive_key(text: &str, target_lang: &str) -> String {
    let mut prefix = String::new();
    let mut units = 0;
    for ch in text.trim().chars() {
        units += ch.len_utf16();
        if units > MAX_PREFIX_UNITS {
            break;
        }
        prefix.push(ch);
    }
    format!("{}|{}|{}", prefix, hash_hex(text), target_lang)
}

/// Extract the human-readable prefix segment from a key.
pub fn key_prefix(key: &str) -> &str {
    key.split('|').next().unwrap_or(key)
}

fn hash_hex(text: &str) -> String {
    let mut hash: i32 = 0;
    for unit in text.encode_utf16() {
        // h*31 + unit, expressed as (h << 5) - h to match 32-bit overflow
        // behavior of the historical key format exactly.
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(unit as i32);
    }
    if hash < 0 {
        format!("-{:x}", (hash as i64).unsigned_abs())
    } else {
        format!("{:x}", hash)
    }
}

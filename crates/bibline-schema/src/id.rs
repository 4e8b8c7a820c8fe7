//! Global record identifiers

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bibline_core::Skip;

/// Longest identifier downstream key-value stores accept
pub const KEY_LENGTH_LIMIT: usize = 250;

/// Unpadded base64url of a natural id, the last part of a global id
pub fn encode_natural_id(natural_id: &str) -> String {
    URL_SAFE_NO_PAD.encode(natural_id.as_bytes())
}

/// `ai-<source id>-<unpadded base64url of the natural id>`
pub fn compose_id(source_id: &str, natural_id: &str) -> String {
    format!("ai-{source_id}-{}", encode_natural_id(natural_id))
}

/// Compose the id and enforce [`KEY_LENGTH_LIMIT`]. Over-long ids are
/// skipped, never truncated.
pub fn checked_id(source_id: &str, natural_id: &str) -> Result<String, Skip> {
    let id = compose_id(source_id, natural_id);
    if id.len() > KEY_LENGTH_LIMIT {
        return Err(Skip::new("id too long").with_detail(id));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_encoding() {
        assert_eq!(compose_id("48", "ZECO__123"), "ai-48-WkVDT19fMTIz");
        // No padding, URL alphabet
        assert_eq!(compose_id("49", "??>"), "ai-49-Pz8-");
    }

    #[test]
    fn global_id_ends_with_encoded_natural_id() {
        let natural = "oai:www.genderopen.de:25595/1";
        assert_eq!(encode_natural_id(natural), "b2FpOnd3dy5nZW5kZXJvcGVuLmRlOjI1NTk1LzE");
        assert_eq!(
            compose_id("162", natural),
            format!("ai-162-{}", encode_natural_id(natural))
        );
    }

    #[test]
    fn deterministic() {
        assert_eq!(compose_id("162", "oai:x:1"), compose_id("162", "oai:x:1"));
        assert_ne!(compose_id("162", "oai:x:1"), compose_id("162", "oai:x:2"));
    }

    #[test]
    fn limit_is_inclusive() {
        // "ai-48-" is 6 bytes, 183 input bytes encode to 244 chars
        let at_limit = "a".repeat(183);
        assert_eq!(checked_id("48", &at_limit).unwrap().len(), 250);
        let over = "a".repeat(184);
        let skip = checked_id("48", &over).unwrap_err();
        assert_eq!(skip.reason(), "id too long");
    }
}

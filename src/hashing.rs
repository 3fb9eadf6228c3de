//! Template Fingerprints
//!
//! Compiled templates are not cached here. Callers that want to cache them
//! key on the fingerprint, which is stable for the same configuration and
//! the same final stylesheet tree.

use sha2::{Digest, Sha256};

use crate::config::CompilerConfiguration;
use crate::document::XmlDocument;

/// Hex SHA-256 over the JSON configuration, a NUL separator, and the
/// serialized stylesheet. Line annotations are not serialized, so turning
/// numbering on or off changes the fingerprint only through the config.
pub fn template_fingerprint(
    config: &CompilerConfiguration,
    stylesheet: &XmlDocument,
) -> Result<String, serde_json::Error> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(config)?);
    hasher.update([0u8]);
    hasher.update(stylesheet.to_xml().as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Element;

    fn stylesheet(version: &str) -> XmlDocument {
        XmlDocument::new(Element::new("xsl:stylesheet").with_attribute("version", version))
    }

    #[test]
    fn test_fingerprint_is_lowercase_sha256_hex() {
        let fp = template_fingerprint(&CompilerConfiguration::default(), &stylesheet("2.0")).unwrap();
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    #[test]
    fn test_fingerprint_depends_on_config_and_tree() {
        let on = CompilerConfiguration::default();
        let off = CompilerConfiguration::without_line_numbers();

        let base = template_fingerprint(&on, &stylesheet("2.0")).unwrap();
        assert_eq!(base, template_fingerprint(&on, &stylesheet("2.0")).unwrap());
        assert_ne!(base, template_fingerprint(&off, &stylesheet("2.0")).unwrap());
        assert_ne!(base, template_fingerprint(&on, &stylesheet("3.0")).unwrap());
    }

    #[test]
    fn test_fingerprint_ignores_source_lines() {
        let config = CompilerConfiguration::default();
        let numbered = XmlDocument::parse("<xsl:stylesheet>\n<xsl:template/>\n</xsl:stylesheet>", true).unwrap();
        let plain = XmlDocument::parse("<xsl:stylesheet>\n<xsl:template/>\n</xsl:stylesheet>", false).unwrap();
        assert_eq!(
            template_fingerprint(&config, &numbered).unwrap(),
            template_fingerprint(&config, &plain).unwrap()
        );
    }
}

use crate::ExporterError;

/// A base domain used to recover host labels from certificate names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    name: String,
    len: usize,
}

impl Domain {
    pub fn new(name: &str) -> Result<Domain, ExporterError> {
        if name.is_empty() {
            return Err(ExporterError::configuration(
                "domain",
                "domain name cannot be empty",
            ));
        }
        Ok(Domain {
            name: name.to_string(),
            len: name.len(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `{host}` for a name of the form `{host}.{domain}`.
    ///
    /// The last `len(domain) + 1` bytes are removed and must equal
    /// `.{domain}` exactly. Case, trailing dots and wildcards are left as-is.
    pub fn hostname<'a>(&self, fq_name: &'a str) -> Result<&'a str, ExporterError> {
        if fq_name.is_empty() {
            return Err(ExporterError::EmptyInput);
        }
        if fq_name.len() < self.len + 1 {
            return Err(ExporterError::TooShort {
                fq_name: fq_name.to_string(),
                domain: self.name.clone(),
            });
        }

        fq_name
            .strip_suffix(self.name.as_str())
            .and_then(|rest| rest.strip_suffix('.'))
            .ok_or_else(|| ExporterError::SuffixMismatch {
                fq_name: fq_name.to_string(),
                domain: self.name.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN_NAME: &str = "example.com";

    #[test]
    fn test_hostname() {
        let d = Domain::new(DOMAIN_NAME).unwrap();
        for host in ["x", "x.y", "x.y.z", "*"] {
            let fq_name = format!("{}.{}", host, DOMAIN_NAME);
            assert_eq!(d.hostname(&fq_name).unwrap(), host, "{}", fq_name);
        }
    }

    #[test]
    fn test_empty_domain_is_rejected() {
        let err = Domain::new("").unwrap_err();
        assert_eq!(err.kind(), "Configuration");
    }

    #[test]
    fn test_empty_name() {
        let d = Domain::new(DOMAIN_NAME).unwrap();
        assert!(matches!(d.hostname(""), Err(ExporterError::EmptyInput)));
    }

    #[test]
    fn test_too_short() {
        let d = Domain::new(DOMAIN_NAME).unwrap();
        for fq_name in ["bad", "example.com", ".example.co"] {
            assert!(
                matches!(d.hostname(fq_name), Err(ExporterError::TooShort { .. })),
                "{}",
                fq_name
            );
        }
    }

    #[test]
    fn test_apex_with_separator_yields_empty_host() {
        let d = Domain::new(DOMAIN_NAME).unwrap();
        assert_eq!(d.hostname(".example.com").unwrap(), "");
    }

    #[test]
    fn test_suffix_must_match() {
        let d = Domain::new(DOMAIN_NAME).unwrap();
        for fq_name in ["www.example.org", "www-example.com", "www.EXAMPLE.com"] {
            assert!(
                matches!(
                    d.hostname(fq_name),
                    Err(ExporterError::SuffixMismatch { .. })
                ),
                "{}",
                fq_name
            );
        }
    }

    #[test]
    fn test_no_normalization() {
        let d = Domain::new(DOMAIN_NAME).unwrap();
        assert_eq!(d.hostname("WWW.example.com").unwrap(), "WWW");
        assert!(d.hostname("www.example.com.").is_err());
    }
}

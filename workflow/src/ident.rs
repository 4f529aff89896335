use crate::DefinitionError;

/// True if `s` is a lowercase identifier: ascii lowercase letters, digits, '_' and '-',
/// starting and ending with a letter or digit.
pub fn is_identifier(s: &str) -> bool {
    let bytes = s.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(&first), Some(&last)) => {
            is_lower_alnum(first)
                && is_lower_alnum(last)
                && bytes
                    .iter()
                    .all(|&b| is_lower_alnum(b) || b == b'_' || b == b'-')
        }
        _ => false,
    }
}

fn is_lower_alnum(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit()
}

/// Fail with an [`DefinitionError::InvalidIdentifier`] naming `kind` unless `name` is valid.
pub(crate) fn check_identifier(kind: &'static str, name: &str) -> Result<(), DefinitionError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(DefinitionError::InvalidIdentifier {
            kind,
            name: name.to_owned(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn test_identifiers() {
        for ok in ["n", "hello_world", "stage-2", "a1", "9lives", "x_y-z"] {
            assert!(is_identifier(ok), "{ok} should be valid");
        }
        for bad in ["", "_lead", "trail_", "-x", "x-", "Upper", "has space", "dot.ted", "ünï"] {
            assert!(!is_identifier(bad), "{bad} should be invalid");
        }
    }

    #[test]
    fn test_check_identifier_names_kind() {
        let err = check_identifier("task type", "Greeting").unwrap_err();
        assert_eq!(
            DefinitionError::InvalidIdentifier {
                kind: "task type",
                name: "Greeting".to_owned()
            },
            err
        );
    }
}

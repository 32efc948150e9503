use crate::error::{ClientError, Result};

/// Validates a star note.
///
/// # Arguments
///
/// * `note` - The note text as typed.
///
/// # Returns
///
/// A `Result<()>` indicating whether the note can be saved.
pub fn validate_note(note: &str) -> Result<()> {
    if note.trim().is_empty() {
        return Err(ClientError::Validation("Note cannot be empty".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_note() {
        assert!(validate_note("check again").is_ok());
        assert!(validate_note("  padded  ").is_ok());
        assert!(validate_note(&"x".repeat(5000)).is_ok());
        assert!(validate_note("").is_err());
        assert!(validate_note(" \t\n ").is_err());
    }
}

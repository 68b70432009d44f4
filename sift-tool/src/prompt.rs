//! Confirmation before destructive runs
//!
//! Asked once, before the scan starts, and only in execute mode.
//! `--yes` skips it.

use sift_common::{Error, Result};
use std::io::{BufRead, Write};

/// `y` / `yes` in any case; everything else declines
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Ask `question` on `output` and read one line from `input`
///
/// Returns [`Error::UserCancelled`] unless the answer is affirmative. End of
/// input counts as a decline.
pub fn confirm_with<R: BufRead, W: Write>(question: &str, input: &mut R, output: &mut W) -> Result<()> {
    write!(output, "{} [y/N] ", question)?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    if is_affirmative(&answer) {
        Ok(())
    } else {
        Err(Error::UserCancelled)
    }
}

/// Ask on the terminal unless `assume_yes` is set
pub async fn confirm(question: &str, assume_yes: bool) -> Result<()> {
    if assume_yes {
        return Ok(());
    }
    let question = question.to_string();
    tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stderr();
        confirm_with(&question, &mut input, &mut output)
    })
    .await
    .map_err(|e| Error::Unknown(format!("Confirmation prompt failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_affirmative_answers() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("yep"));
    }

    #[test]
    fn test_decline_is_user_cancelled() {
        let mut input = Cursor::new("no\n");
        let mut output = Vec::new();
        let err = confirm_with("Delete 3 records?", &mut input, &mut output).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(String::from_utf8(output).unwrap(), "Delete 3 records? [y/N] ");
    }

    #[test]
    fn test_end_of_input_declines() {
        let mut input = Cursor::new("");
        let mut output = Vec::new();
        assert!(confirm_with("Proceed?", &mut input, &mut output).is_err());
    }

    #[tokio::test]
    async fn test_assume_yes_skips_prompt() {
        assert!(confirm("Proceed?", true).await.is_ok());
    }
}

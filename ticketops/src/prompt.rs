//! Shared stdin confirmation for the batch binaries.

use std::io::{self, Write};

/// Ask a y/N question on stdin. `assume_yes` (the --yes flag) skips the
/// prompt.
pub fn confirm(question: &str, assume_yes: bool) -> io::Result<bool> {
    if assume_yes {
        return Ok(true);
    }

    print!("{} [y/N]: ", question);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

// Console duplicate resolver - asks the operator about each candidate pair
//
// Generic over reader/writer so tests can drive it with in-memory buffers.

use crate::aggregate::AggregateRow;
use crate::deduplication::{DuplicateCandidate, DuplicateResolver, Resolution};
use crate::normalizer::UNREGISTERED_MARKER;
use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};

pub struct ConsoleResolver<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsoleResolver<R, W> {
    pub fn new(input: R, output: W) -> Self {
        ConsoleResolver { input, output }
    }

    fn describe(&mut self, label: &str, row: &AggregateRow, candidate: &DuplicateCandidate<'_>) -> Result<()> {
        writeln!(
            self.output,
            "  [{}] {} ({})",
            label,
            row.name,
            row.registration.as_deref().unwrap_or(UNREGISTERED_MARKER)
        )?;
        for race_id in candidate.race_ids {
            let cell = match row.entry(*race_id) {
                Some(entry) => format!("{} → {} b.", entry.place, entry.points),
                None => "-".to_string(),
            };
            writeln!(self.output, "      race {:>6}: {}", race_id, cell)?;
        }
        Ok(())
    }
}

impl<R: BufRead, W: Write> DuplicateResolver for ConsoleResolver<R, W> {
    /// Re-asks until a valid code arrives; end of input is an unresolved duplicate
    fn resolve(&mut self, candidate: &DuplicateCandidate<'_>) -> Result<Resolution> {
        writeln!(self.output)?;
        writeln!(self.output, "🔍 Possible duplicate in category {}:", candidate.category)?;
        self.describe("1", candidate.left, candidate)?;
        self.describe("2", candidate.right, candidate)?;

        loop {
            write!(
                self.output,
                "Merge? 1 = keep left values, 2 = keep right values, 3 = different runners\n---> "
            )?;
            self.output.flush()?;

            let mut line = String::new();
            let read = self
                .input
                .read_line(&mut line)
                .context("Failed to read operator answer")?;
            if read == 0 {
                bail!("input closed before an answer was given");
            }

            match line.parse::<Resolution>() {
                Ok(resolution) => return Ok(resolution),
                Err(e) => writeln!(self.output, "❌ {}", e)?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::RaceEntry;
    use crate::identity::RunnerIdentity;
    use crate::scoring::Place;
    use std::io::Cursor;

    fn create_test_row(name: &str, reg: Option<&str>, race: u32) -> AggregateRow {
        let identity = match reg {
            Some(code) => RunnerIdentity::Registered(code.to_string()),
            None => RunnerIdentity::Unregistered(name.to_lowercase()),
        };
        let mut row = AggregateRow::new(identity, name);
        row.results.insert(
            race,
            RaceEntry {
                place: Place::Ranked(2),
                points: 190,
            },
        );
        row
    }

    #[test]
    fn test_reprompts_until_valid() {
        let left = create_test_row("Jan Novák", Some("A123456"), 1);
        let right = create_test_row("Jan Novák", None, 2);
        let candidate = DuplicateCandidate {
            category: "H",
            left: &left,
            right: &right,
            race_ids: &[1, 2],
        };

        let mut output = Vec::new();
        let mut resolver = ConsoleResolver::new(Cursor::new("yes\n2\n"), &mut output);

        let resolution = resolver.resolve(&candidate).unwrap();
        assert_eq!(resolution, Resolution::KeepRight);

        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("A123456"));
        assert!(shown.contains("unknown resolution 'yes'"));
    }

    #[test]
    fn test_closed_input_is_error() {
        let left = create_test_row("Eva Malá", None, 1);
        let right = create_test_row("Eva Mala", Some("B765432"), 2);
        let candidate = DuplicateCandidate {
            category: "D",
            left: &left,
            right: &right,
            race_ids: &[1, 2],
        };

        let mut resolver = ConsoleResolver::new(Cursor::new(""), Vec::new());
        assert!(resolver.resolve(&candidate).is_err());
    }
}

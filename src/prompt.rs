use std::io::{BufRead, Write};

use crate::config::{parse_folds, parse_multiplier, parse_yes_no, RunParams};
use crate::error::{PipelineError, Result};

/// Ask for the multiplier and fold count on a terminal-like stream.
///
/// Every question is re-asked after an invalid answer, at most
/// `max_attempts` times; running out of attempts (or input) fails with
/// `InvalidParameter`.
pub fn prompt_params<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    max_attempts: usize,
) -> Result<RunParams> {
    let defaults = RunParams::default();

    let multiplier = if ask(
        input,
        output,
        max_attempts,
        "Do you have a specified threshold multiplier? (y/n) ",
        parse_yes_no,
    )? {
        ask(
            input,
            output,
            max_attempts,
            "Enter the multiplier (decimal number): ",
            parse_multiplier,
        )?
    } else {
        defaults.multiplier
    };

    let folds = if ask(
        input,
        output,
        max_attempts,
        "Do you have a specified number of folds for cross-validation? (y/n) ",
        parse_yes_no,
    )? {
        ask(
            input,
            output,
            max_attempts,
            "Enter the number of folds (integer): ",
            parse_folds,
        )?
    } else {
        defaults.folds
    };

    RunParams::new(multiplier, folds)
}

fn ask<R, W, T>(
    input: &mut R,
    output: &mut W,
    max_attempts: usize,
    question: &str,
    parse: impl Fn(&str) -> Result<T>,
) -> Result<T>
where
    R: BufRead,
    W: Write,
{
    let io_err = |e: std::io::Error| PipelineError::InvalidParameter(format!("prompt I/O: {e}"));

    let mut last_error = None;
    for _ in 0..max_attempts {
        write!(output, "{question}").map_err(io_err)?;
        output.flush().map_err(io_err)?;

        let mut line = String::new();
        if input.read_line(&mut line).map_err(io_err)? == 0 {
            return Err(PipelineError::InvalidParameter(
                "input ended before an answer was given".to_string(),
            ));
        }

        match parse(&line) {
            Ok(value) => return Ok(value),
            Err(e) => {
                writeln!(output, "Invalid input ({e}), please try again.").map_err(io_err)?;
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        PipelineError::InvalidParameter("no attempts allowed".to_string())
    }))
}

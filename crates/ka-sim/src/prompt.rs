//! Interactive question flow for a simulation run

use std::io::{BufRead, Write};

use ka_engine::{BonusKind, CashoutStrategy, PlayMode};

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};

/// Ask for mode, round count, free bonuses and cashout strategy
///
/// Anything not asked keeps its value from `base`.
pub fn ask_sim_config<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    total_steps: u32,
    base: SimConfig,
) -> SimResult<SimConfig> {
    writeln!(output, "Select the mode to simulate:")?;
    writeln!(output, "1: Base Game (No Bonuses)")?;
    writeln!(output, "2: Mystic Bonus (Bonus 1)")?;
    writeln!(output, "3: Dragon Bonus (Bonus 2)")?;
    let mut mode = match ask(input, output, "Enter your choice (1, 2, or 3): ")?.as_str() {
        "1" => PlayMode::Base,
        "2" => PlayMode::BonusBuy(BonusKind::Mystic),
        "3" => PlayMode::BonusBuy(BonusKind::Dragon),
        _ => {
            return Err(SimError::InvalidInput(
                "Invalid choice. Please enter 1, 2, or 3.".into(),
            ));
        }
    };

    let rounds = ask(input, output, "Enter the number of rounds to simulate: ")?
        .parse::<u64>()
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| {
            SimError::InvalidInput(
                "Invalid number of rounds. Please enter a positive integer.".into(),
            )
        })?;

    if mode == PlayMode::Base {
        let answer = ask(input, output, "Enable free bonuses in Base mode? (y/n): ")?;
        if answer.eq_ignore_ascii_case("y") {
            mode = PlayMode::BaseWithFreeBonuses;
        }
    }

    let question = format!("Enter cashout strategy (R for random, or step number 0-{total_steps}): ");
    let cashout = loop {
        let answer = ask(input, output, &question)?;
        if answer.eq_ignore_ascii_case("r") {
            break CashoutStrategy::Random;
        }
        match answer.parse::<u32>() {
            Ok(step) if step <= total_steps => break CashoutStrategy::Fixed(step),
            _ => writeln!(
                output,
                "Invalid strategy. Please enter 'R' or a number between 0 and {total_steps}."
            )?,
        }
    };

    Ok(base.with_mode(mode).with_rounds(rounds).with_cashout(cashout))
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> SimResult<String> {
    write!(output, "{question}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(SimError::InvalidInput("input closed before an answer".into()));
    }
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(script: &str) -> (SimResult<SimConfig>, String) {
        let mut input = script.as_bytes();
        let mut output = Vec::new();
        let result = ask_sim_config(&mut input, &mut output, 50, SimConfig::quick());
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_base_with_free_bonuses_and_fixed_cashout() {
        let (result, _) = run("1\n2500\ny\n12\n");
        let config = result.unwrap();
        assert_eq!(config.mode, PlayMode::BaseWithFreeBonuses);
        assert_eq!(config.rounds, 2500);
        assert_eq!(config.cashout, CashoutStrategy::Fixed(12));
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn test_bonus_mode_skips_free_bonus_question() {
        let (result, output) = run("3\n10\nR\n");
        let config = result.unwrap();
        assert_eq!(config.mode, PlayMode::BonusBuy(BonusKind::Dragon));
        assert_eq!(config.cashout, CashoutStrategy::Random);
        assert!(!output.contains("free bonuses"));
    }

    #[test]
    fn test_invalid_cashout_is_asked_again() {
        let (result, output) = run("2\n10\n77\nabc\n50\n");
        assert_eq!(result.unwrap().cashout, CashoutStrategy::Fixed(50));
        assert_eq!(output.matches("Invalid strategy").count(), 2);
    }

    #[test]
    fn test_invalid_answers_abort() {
        assert!(run("4\n").0.is_err());
        assert!(run("1\n0\n").0.is_err());
        assert!(run("1\n-5\n").0.is_err());
        assert!(run("1\n10\nn\n").0.is_err());
    }
}

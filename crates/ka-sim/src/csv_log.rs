//! CSV sinks for rounds and bonus activations

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use ka_engine::{MultiplierTable, RoundResult};

use crate::error::SimResult;

pub const ROUNDS_HEADER: [&str; 9] = [
    "Game Number",
    "Final Step",
    "Multiplier",
    "Outcome",
    "Winnings",
    "Cost",
    "Crash Point",
    "Cashout Point",
    "Used Bonus",
];

pub const BONUS_HEADER: [&str; 7] = [
    "Game Number",
    "Current Step",
    "Result Step",
    "Cost",
    "RTP",
    "Game Crash Point",
    "Redistributed Crash Point",
];

/// Consumer of finished rounds, fed in round order
pub trait RoundSink {
    /// Record round `number` (1-based)
    fn record(&mut self, number: u64, round: &RoundResult) -> SimResult<()>;

    /// Flush buffered output
    fn finish(&mut self) -> SimResult<()>;
}

/// One row per round
pub struct RoundCsvLog<W: Write> {
    writer: csv::Writer<W>,
    table: MultiplierTable,
}

impl RoundCsvLog<BufWriter<File>> {
    /// Create (truncate) the log file and write the header
    pub fn create(path: &Path, table: &MultiplierTable) -> SimResult<Self> {
        Self::from_writer(BufWriter::new(File::create(path)?), table)
    }
}

impl<W: Write> RoundCsvLog<W> {
    pub fn from_writer(writer: W, table: &MultiplierTable) -> SimResult<Self> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(ROUNDS_HEADER)?;
        Ok(Self {
            writer,
            table: table.clone(),
        })
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(self) -> SimResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| io::Error::new(e.error().kind(), e.error().to_string()).into())
    }
}

impl<W: Write> RoundSink for RoundCsvLog<W> {
    fn record(&mut self, number: u64, round: &RoundResult) -> SimResult<()> {
        let multiplier = self.table.get(round.final_step).unwrap_or(0.0);
        self.writer.write_record([
            number.to_string(),
            round.final_step.to_string(),
            format!("{multiplier:.2}"),
            round.outcome_label(),
            format!("{:.2}", round.total_winnings),
            format!("{:.2}", round.total_cost),
            round.crash_step.to_string(),
            round.cashout_step.to_string(),
            round.used_bonus.map(|k| k.name()).unwrap_or("None").to_string(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> SimResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// One row per bonus activation
pub struct BonusCsvLog<W: Write> {
    writer: csv::Writer<W>,
}

impl BonusCsvLog<BufWriter<File>> {
    pub fn create(path: &Path) -> SimResult<Self> {
        Self::from_writer(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> BonusCsvLog<W> {
    pub fn from_writer(writer: W) -> SimResult<Self> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(BONUS_HEADER)?;
        Ok(Self { writer })
    }

    pub fn into_inner(self) -> SimResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| io::Error::new(e.error().kind(), e.error().to_string()).into())
    }
}

impl<W: Write> RoundSink for BonusCsvLog<W> {
    fn record(&mut self, number: u64, round: &RoundResult) -> SimResult<()> {
        for event in &round.bonus_events {
            self.writer.write_record([
                number.to_string(),
                event.from_step.to_string(),
                event.to_step.to_string(),
                format!("{:.2}", event.cost),
                format_rtp(event.rtp),
                event.crash_step.to_string(),
                event
                    .redistributed_crash_step
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "N/A".into()),
            ])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> SimResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn format_rtp(rtp: f64) -> String {
    if rtp.is_infinite() {
        "Infinity".into()
    } else {
        format!("{rtp:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ka_engine::{BonusEvent, BonusKind, RoundOutcome};

    fn table() -> MultiplierTable {
        MultiplierTable::from_multipliers(vec![1.0, 1.5, 2.25, 3.375]).unwrap()
    }

    fn round_with_bonus() -> RoundResult {
        RoundResult {
            final_step: 2,
            outcome: RoundOutcome::CashedOut,
            total_cost: 1.0,
            total_winnings: 2.25,
            crash_step: 3,
            cashout_step: 2,
            speed_increment: 1,
            used_bonus: Some(BonusKind::Mystic),
            bonus_events: vec![BonusEvent {
                kind: BonusKind::Mystic,
                free: true,
                from_step: 0,
                to_step: 1,
                cost: 0.0,
                payout: 1.5,
                rtp: f64::INFINITY,
                crashed: false,
                crash_step: 1,
                redistributed_crash_step: Some(3),
            }],
        }
    }

    #[test]
    fn test_round_rows() {
        let mut log = RoundCsvLog::from_writer(Vec::new(), &table()).unwrap();
        log.record(1, &round_with_bonus()).unwrap();
        log.finish().unwrap();

        let text = String::from_utf8(log.into_inner().unwrap()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Game Number,Final Step,Multiplier,Outcome,Winnings,Cost,Crash Point,Cashout Point,Used Bonus"
        );
        assert_eq!(lines.next().unwrap(), "1,2,2.25,Cashed out,2.25,1.00,3,2,Mystic");
    }

    #[test]
    fn test_bonus_crash_row_names_the_bonus() {
        let mut round = round_with_bonus();
        round.outcome = RoundOutcome::CrashedOnBonus;
        round.used_bonus = Some(BonusKind::Dragon);
        round.final_step = 1;
        round.total_winnings = 0.0;
        round.total_cost = 1.5;

        let mut log = RoundCsvLog::from_writer(Vec::new(), &table()).unwrap();
        log.record(4, &round).unwrap();
        let text = String::from_utf8(log.into_inner().unwrap()).unwrap();
        assert_eq!(
            text.lines().nth(1).unwrap(),
            "4,1,1.50,Crashed (Dragon Bonus),0.00,1.50,3,2,Dragon"
        );
    }

    #[test]
    fn test_bonus_rows() {
        let mut log = BonusCsvLog::from_writer(Vec::new()).unwrap();
        let mut plain = round_with_bonus();
        plain.bonus_events[0].redistributed_crash_step = None;
        plain.bonus_events[0].cost = 3.0;
        plain.bonus_events[0].rtp = 50.0;

        log.record(7, &round_with_bonus()).unwrap();
        log.record(8, &plain).unwrap();
        log.finish().unwrap();

        let text = String::from_utf8(log.into_inner().unwrap()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Game Number,Current Step,Result Step,Cost,RTP,Game Crash Point,Redistributed Crash Point"
        );
        assert_eq!(lines[1], "7,0,1,0.00,Infinity,1,3");
        assert_eq!(lines[2], "8,0,1,3.00,50.00,1,N/A");
    }

    #[test]
    fn test_round_without_bonus_writes_none() {
        let mut round = round_with_bonus();
        round.used_bonus = None;
        round.bonus_events.clear();

        let mut rounds = RoundCsvLog::from_writer(Vec::new(), &table()).unwrap();
        rounds.record(2, &round).unwrap();
        let text = String::from_utf8(rounds.into_inner().unwrap()).unwrap();
        assert!(text.lines().nth(1).unwrap().ends_with(",2,None"));

        let mut bonuses = BonusCsvLog::from_writer(Vec::new()).unwrap();
        bonuses.record(2, &round).unwrap();
        let text = String::from_utf8(bonuses.into_inner().unwrap()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}

use clap::{Parser, Subcommand};
use smartrisk_core::domain::Objective;
use smartrisk_core::questionnaire::QuestionId;

#[derive(Debug, Parser)]
#[command(name = "smartrisk")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the questionnaire catalog as JSON.
    Questions,

    /// Score a completed questionnaire.
    Score {
        /// Answer as QUESTION_ID=VALUE. Choice questions take the option's points.
        #[arg(long = "answer", value_parser = parse_answer, required = true)]
        answers: Vec<(QuestionId, f64)>,
    },

    /// Print the profile assigned when the questionnaire is skipped.
    Skip,

    /// List the optimizer's stock reference data.
    Stocks,

    /// Request an allocation from the optimizer.
    Allocate {
        /// `min` (minimize risk) or `max` (maximize return).
        #[arg(long, value_parser = parse_objective)]
        objective: Objective,

        /// Risk target in percent (1-100). Required with `--objective max`.
        #[arg(long)]
        risk: Option<f64>,

        /// Seed the risk target from a questionnaire score instead of `--risk`.
        #[arg(long, conflicts_with = "risk")]
        from_score: Option<u32>,

        #[arg(long)]
        cash: f64,

        /// SYMBOL or SYMBOL:MIN_WEIGHT_PERCENT, once per asset.
        #[arg(long = "stock", value_parser = parse_stock)]
        stocks: Vec<(String, i64)>,

        /// Print the optimizer request instead of sending it.
        #[arg(long)]
        dry_run: bool,
    },
}

pub fn parse_answer(s: &str) -> Result<(QuestionId, f64), String> {
    let (id, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected QUESTION_ID=VALUE, got {s:?}"))?;
    let id = id
        .trim()
        .parse::<QuestionId>()
        .map_err(|e| format!("bad question id {id:?}: {e}"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad answer value {value:?}: {e}"))?;
    Ok((id, value))
}

pub fn parse_stock(s: &str) -> Result<(String, i64), String> {
    let (symbol, min) = match s.split_once(':') {
        Some((symbol, min)) => {
            let min = min
                .trim()
                .parse::<i64>()
                .map_err(|e| format!("bad minimum weight {min:?}: {e}"))?;
            (symbol, min)
        }
        None => (s, 0),
    };
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(format!("missing symbol in {s:?}"));
    }
    Ok((symbol.to_string(), min))
}

pub fn parse_objective(s: &str) -> Result<Objective, String> {
    Objective::from_wire_code(s).ok_or_else(|| format!("unknown objective {s:?} (use min or max)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_answers() {
        assert_eq!(parse_answer("3=10000"), Ok((3, 10_000.0)));
        assert_eq!(parse_answer(" 1 = 6 "), Ok((1, 6.0)));
        assert!(parse_answer("3").is_err());
        assert!(parse_answer("x=1").is_err());
    }

    #[test]
    fn parses_stocks_with_optional_minimum() {
        assert_eq!(parse_stock("AMZN:25"), Ok(("AMZN".to_string(), 25)));
        assert_eq!(parse_stock("NVO"), Ok(("NVO".to_string(), 0)));
        assert!(parse_stock(":10").is_err());
        assert!(parse_stock("AMZN:lots").is_err());
    }

    #[test]
    fn parses_allocate_command() {
        let args = Args::try_parse_from([
            "smartrisk",
            "allocate",
            "--objective",
            "max",
            "--risk",
            "20",
            "--cash",
            "5000",
            "--stock",
            "AMZN:30",
            "--stock",
            "NVO",
            "--dry-run",
        ])
        .unwrap();

        let Command::Allocate {
            objective,
            risk,
            stocks,
            dry_run,
            ..
        } = args.command
        else {
            panic!("expected allocate");
        };
        assert_eq!(objective, Objective::MaximizeReturn);
        assert_eq!(risk, Some(20.0));
        assert_eq!(stocks.len(), 2);
        assert!(dry_run);
    }

    #[test]
    fn risk_and_from_score_conflict() {
        let res = Args::try_parse_from([
            "smartrisk",
            "allocate",
            "--objective",
            "max",
            "--risk",
            "20",
            "--from-score",
            "29",
            "--cash",
            "1",
        ]);
        assert!(res.is_err());
    }
}

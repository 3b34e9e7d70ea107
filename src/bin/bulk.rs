use clap::Parser;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use stress_quiz::{read_bulk, Error, Outcome, CATALOG};

/// Scores a CSV of answer rows: respondent id, then one value per question.
#[derive(Parser)]
struct Args {
    path: String,
    /// Print one JSON object per row instead of plain text.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Row<'a> {
    id: &'a str,
    #[serde(flatten)]
    outcome: &'a Outcome,
}

fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Args::parse();
    let reader = BufReader::new(File::open(&args.path)?);
    for row in read_bulk(reader, &CATALOG) {
        match row.and_then(|(id, store)| Ok((store.to_outcome(&CATALOG)?, id))) {
            Ok((outcome, id)) => {
                if args.json {
                    let line = serde_json::to_string(&Row {
                        id: &id,
                        outcome: &outcome,
                    })?;
                    println!("{line}");
                } else {
                    println!(
                        "id = {}, score = {}/{}, level = {}",
                        id, outcome.score, outcome.max, outcome.level
                    );
                }
            }
            Err(e) => log::warn!("skipping row: {e}"),
        }
    }
    Ok(())
}

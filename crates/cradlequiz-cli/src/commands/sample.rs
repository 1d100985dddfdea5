//! The `cradlequiz sample` command.

use anyhow::Result;

use super::{open_engine, SelectionArgs};

pub fn execute(selection: SelectionArgs, json: bool) -> Result<()> {
    let (config, engine) = open_engine(&selection)?;
    let request = selection.request(&config)?;
    let quiz = engine.request_quiz(request)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&quiz)?);
        return Ok(());
    }

    for (n, q) in quiz.questions.iter().enumerate() {
        println!(
            "{}. [{}] ({}; {}) {}",
            n + 1,
            q.id,
            q.difficulty,
            q.tags.join(", "),
            q.text
        );
        for (i, option) in q.options.iter().enumerate() {
            println!("     {}) {option}", i + 1);
        }
    }
    Ok(())
}

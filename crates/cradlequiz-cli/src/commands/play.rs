//! The `cradlequiz play` command: an interactive quiz over stdin.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use cradlequiz_core::report::{format_accuracy, ResultsReport};
use cradlequiz_core::{Accuracy, QuizEngine, QuizRequest, SessionResults};

use super::{open_engine, SelectionArgs};

pub fn execute(selection: SelectionArgs, output: Option<PathBuf>) -> Result<()> {
    let (config, engine) = open_engine(&selection)?;
    let request = selection.request(&config)?;

    let stdin = std::io::stdin();
    let report = run_quiz(
        &engine,
        request,
        config.idle_timeout(),
        stdin.lock(),
        std::io::stdout(),
    )?;

    print_results(&report.results);

    if let Some(dir) = output {
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
        let json_path = dir.join(format!("quiz-{timestamp}.json"));
        report.save_json(&json_path)?;
        let md_path = dir.join(format!("quiz-{timestamp}.md"));
        std::fs::write(&md_path, report.to_markdown())
            .with_context(|| format!("failed to write {}", md_path.display()))?;
        eprintln!("Results saved to: {}", json_path.display());
    }

    Ok(())
}

enum Input {
    Pick(usize),
    Quit,
    Invalid,
}

fn parse_input(line: &str, options: usize) -> Input {
    if line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit") {
        return Input::Quit;
    }
    match line.parse::<usize>() {
        Ok(n) if (1..=options).contains(&n) => Input::Pick(n - 1),
        _ => Input::Invalid,
    }
}

/// Ask every served question, record answers and return the session report.
///
/// End of input or `q` finishes the session early; unanswered questions are
/// left out of the score.
pub fn run_quiz<R: BufRead, W: Write>(
    engine: &QuizEngine,
    request: QuizRequest,
    idle_timeout: chrono::Duration,
    mut input: R,
    mut out: W,
) -> Result<ResultsReport> {
    let quiz = engine.request_quiz(request)?;
    let sid = quiz.session_id;
    let total = quiz.questions.len();

    writeln!(
        out,
        "{total} question(s). Answer with the option number, or q to stop.\n"
    )?;

    'questions: while let Some(q) = engine.next_question(sid)? {
        let number = engine.progress(sid)?.answered + 1;
        writeln!(out, "Question {number}/{total} ({}): {}", q.difficulty, q.text)?;
        for (i, option) in q.options.iter().enumerate() {
            writeln!(out, "  {}) {option}", i + 1)?;
        }

        let choice = loop {
            write!(out, "> ")?;
            out.flush()?;
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                break 'questions;
            }
            match parse_input(line.trim(), q.options.len()) {
                Input::Pick(choice) => break choice,
                Input::Quit => break 'questions,
                Input::Invalid => {
                    writeln!(out, "Please enter a number from 1 to {}.", q.options.len())?
                }
            }
        };

        if engine.evict_idle(idle_timeout) > 0 {
            engine
                .progress(sid)
                .context("session expired while waiting for an answer")?;
        }

        let feedback = engine.submit_answer(sid, q.id.as_str(), choice)?;
        if feedback.correct {
            writeln!(out, "Correct!")?;
        } else {
            writeln!(
                out,
                "Not quite. The answer is {}) {}",
                feedback.correct_index + 1,
                q.options[feedback.correct_index]
            )?;
        }
        if !feedback.explanation.is_empty() {
            writeln!(out, "{}", feedback.explanation)?;
        }
        writeln!(out)?;
    }

    engine.finish_session(sid)?;
    let report = engine.report(sid)?;
    // Completed results are final; fetching them releases the session.
    engine.get_results(sid)?;
    Ok(report)
}

fn print_results(results: &SessionResults) {
    let mut table = Table::new();
    table.set_header(vec!["Scope", "Correct", "Answered", "Accuracy"]);

    let mut row = |scope: String, acc: &Accuracy| {
        table.add_row(vec![
            Cell::new(scope),
            Cell::new(acc.correct),
            Cell::new(acc.answered),
            Cell::new(format_accuracy(acc.accuracy)),
        ]);
    };

    row("overall".to_string(), &results.aggregate);
    for (key, acc) in &results.by_category {
        row(format!("category: {key}"), acc);
    }
    for (level, acc) in &results.by_difficulty {
        row(format!("difficulty: {level}"), acc);
    }

    println!("\n{table}");
    println!(
        "Answered {} of {} question(s).",
        results.progress.answered, results.progress.total
    );
}

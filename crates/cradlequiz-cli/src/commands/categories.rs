//! The `cradlequiz categories` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use cradlequiz_core::config::load_config_from;

use super::open_repository;

pub fn execute(corpus: Option<PathBuf>, config: Option<PathBuf>) -> Result<()> {
    let corpus = match corpus {
        Some(path) => path,
        None => load_config_from(config.as_deref())?.corpus,
    };
    let repo = open_repository(&corpus)?;
    let stats = repo.stats();

    let mut table = Table::new();
    table.set_header(vec!["Key", "Name", "Questions"]);
    for category in repo.categories() {
        let count = stats
            .per_category
            .get(category.key.as_str())
            .copied()
            .unwrap_or(0);
        table.add_row(vec![
            Cell::new(category.key.as_str()),
            Cell::new(&category.name),
            Cell::new(count),
        ]);
    }

    println!("{table}");
    println!("{} questions in total", stats.total);
    Ok(())
}

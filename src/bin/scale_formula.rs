//! Utility to print a formula scaled to a base ingredient amount
//!
//! Usage: scale_formula <formula_id> [base_amount]

use baker_ratio::{config, db, tools};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let formula_id: i64 = match args.next() {
        Some(id) => id.parse()?,
        None => {
            eprintln!("Usage: scale_formula <formula_id> [base_amount]");
            std::process::exit(2);
        }
    };
    let base_amount = args.next();

    let db_path = config::database_path();
    println!("Database path: {}", db_path.display());

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = db::Database::new(&db_path)?;
    database.with_conn(db::migrations::run_migrations)?;

    let view = tools::detail::scale_formula(&database, formula_id, base_amount.as_deref())?;

    println!("{} (#{})", view.formula_name, view.formula_id);
    if !view.note.is_empty() {
        println!("  {}", view.note);
    }
    println!();
    println!("  {:<30} {:>14} {:<4} {:>8}", view.base.name, view.base.amount, view.base.unit, "1");
    for row in &view.others {
        println!(
            "  {:<30} {:>14} {:<4} {:>8}",
            row.name,
            row.amount,
            row.unit,
            row.ratio.as_deref().unwrap_or("")
        );
    }
    if let Some(total) = &view.total {
        println!("  {:<30} {:>14} {:<4}", total.name, total.amount, total.unit);
    }

    Ok(())
}

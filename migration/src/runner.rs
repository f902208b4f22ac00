use colored::*;
use futures::FutureExt;
use sea_orm_migration::prelude::*;
use std::io::{self, Write};
use std::time::Instant;

const STATUS_COLUMN: usize = 72;

pub async fn run_all_migrations(url: &str) {
    let db = sea_orm::Database::connect(url)
        .await
        .expect("DB connection failed");

    let migrations = <crate::Migrator as MigratorTrait>::migrations();
    println!("Applying {} migrations...", migrations.len());

    let schema_manager = SchemaManager::new(&db);
    let started = Instant::now();
    for migration in migrations {
        apply_one(&schema_manager, migration).await;
    }
    println!("Schema ready in {:.2?}.", started.elapsed());
}

async fn apply_one(schema_manager: &SchemaManager<'_>, migration: Box<dyn MigrationTrait>) {
    // Pad on the raw name; the styled string counts its escape codes.
    let dots = ".".repeat(STATUS_COLUMN.saturating_sub(migration.name().len()));
    print!("  {} {dots} ", migration.name().bold());
    io::stdout().flush().unwrap();

    let start = Instant::now();
    let outcome = std::panic::AssertUnwindSafe(migration.up(schema_manager))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(())) => {
            let elapsed = format!("({:.2?})", start.elapsed()).dimmed();
            println!("{} {elapsed}", "ok".green());
        }
        Ok(Err(e)) => {
            println!("{}", "failed".red());
            eprintln!("{e}");
            std::process::exit(1);
        }
        Err(_) => {
            println!("{}", "failed".red());
            std::process::exit(1);
        }
    }
}

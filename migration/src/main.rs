use std::{env, fs, path::Path};

use migration::Migrator;

mod runner;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let db_path = env::var("DATABASE_PATH").expect("DATABASE_PATH must be set");
    let url = format!("sqlite://{db_path}?mode=rwc");

    match env::args().nth(1).as_deref() {
        Some("clean") => remove_db_file(&db_path),
        Some("fresh") => {
            remove_db_file(&db_path);
            migrate(&db_path, &url).await;
        }
        None => migrate(&db_path, &url).await,
        Some(other) => {
            eprintln!("Unknown command '{other}'. Usage: migration [clean|fresh]");
            std::process::exit(2);
        }
    }
}

async fn migrate(db_path: &str, url: &str) {
    if let Some(parent) = Path::new(db_path).parent() {
        fs::create_dir_all(parent).expect("Failed to create DB directory");
    }
    runner::run_all_migrations(url).await;
}

fn remove_db_file(path: &str) {
    let db_path = Path::new(path);
    if db_path.exists() {
        fs::remove_file(db_path).expect("Failed to delete DB file");
        println!("Deleted DB: {}", db_path.display());
    } else {
        println!("No DB file at {}", db_path.display());
    }
}

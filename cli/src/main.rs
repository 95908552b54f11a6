use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use relmap_core::{Schema, SchemaRegistry, TypeDef};
use relmap_sqlite::FtsTable;
use relmap_sqlite::ddl::{
    create_fts_table_sql, create_index_sql, create_table_sql, drop_table_sql,
};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "relmap")]
#[command(about = "Schema-driven SQLite DDL generation and database management")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the generated DDL for every entity in a model file.
    Ddl(DdlArgs),
    /// Create all tables, indexes, and FTS mirrors in a database.
    Create(DbArgs),
    /// Drop all tables and FTS mirrors from a database.
    Drop(DbArgs),
    /// Show table existence and row counts.
    Status(DbArgs),
    /// Create and repopulate every FTS mirror from its source table.
    FtsRebuild(DbArgs),
}

#[derive(Debug, Args)]
struct DdlArgs {
    /// Model file: a JSON array of type definitions.
    #[arg(long)]
    model: PathBuf,
}

#[derive(Debug, Args)]
struct DbArgs {
    /// Model file: a JSON array of type definitions.
    #[arg(long)]
    model: PathBuf,
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Ddl(args) => run_ddl(args),
        Command::Create(args) => run_create(args),
        Command::Drop(args) => run_drop(args),
        Command::Status(args) => run_status(args),
        Command::FtsRebuild(args) => run_fts_rebuild(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn load_schema(path: &PathBuf) -> Result<Schema, String> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read model file '{}': {err}", path.display()))?;
    let defs: Vec<TypeDef> = serde_json::from_str(&raw)
        .map_err(|err| format!("Invalid model file '{}': {err}", path.display()))?;

    let mut registry = SchemaRegistry::new();
    for def in defs {
        registry.register(def).map_err(|e| e.to_string())?;
    }
    registry.build().map_err(|e| e.to_string())
}

fn open_database(path: &PathBuf) -> Result<Connection, String> {
    Connection::open(path)
        .map_err(|err| format!("Failed to open database '{}': {err}", path.display()))
}

fn run_ddl(args: DdlArgs) -> Result<(), String> {
    let schema = load_schema(&args.model)?;

    for entity in schema.entities() {
        if entity.dynamic_name {
            eprintln!("note: '{}' uses runtime table names; showing default", entity.name);
        }
        println!("{};", create_table_sql(entity, &entity.table).map_err(|e| e.to_string())?);
        for index in create_index_sql(entity, &entity.table).map_err(|e| e.to_string())? {
            println!("{index};");
        }
        if let Ok(fts) = schema.fts_entity(&entity.name) {
            println!("{};", create_fts_table_sql(fts).map_err(|e| e.to_string())?);
        }
    }
    Ok(())
}

fn run_create(args: DbArgs) -> Result<(), String> {
    let schema = load_schema(&args.model)?;
    let conn = open_database(&args.db)?;

    let mut created = 0usize;
    for entity in schema.entities() {
        if entity.dynamic_name {
            eprintln!("note: skipping '{}' (runtime table names)", entity.name);
            continue;
        }
        conn.execute_batch(&create_table_sql(entity, &entity.table).map_err(|e| e.to_string())?)
            .map_err(|e| e.to_string())?;
        for index in create_index_sql(entity, &entity.table).map_err(|e| e.to_string())? {
            conn.execute_batch(&index).map_err(|e| e.to_string())?;
        }
        if let Ok(fts) = schema.fts_entity(&entity.name) {
            conn.execute_batch(&create_fts_table_sql(fts).map_err(|e| e.to_string())?)
                .map_err(|e| e.to_string())?;
        }
        created += 1;
    }

    println!("Created {created} table(s) in '{}'.", args.db.display());
    Ok(())
}

fn run_drop(args: DbArgs) -> Result<(), String> {
    let schema = load_schema(&args.model)?;
    let conn = open_database(&args.db)?;

    let mut dropped = 0usize;
    for entity in schema.entities() {
        if entity.dynamic_name {
            continue;
        }
        // Mirrors first so sources never outlive them mid-drop.
        if let Ok(fts) = schema.fts_entity(&entity.name) {
            conn.execute_batch(&drop_table_sql(&fts.table).map_err(|e| e.to_string())?)
                .map_err(|e| e.to_string())?;
        }
        conn.execute_batch(&drop_table_sql(&entity.table).map_err(|e| e.to_string())?)
            .map_err(|e| e.to_string())?;
        dropped += 1;
    }

    println!("Dropped {dropped} table(s) from '{}'.", args.db.display());
    Ok(())
}

fn run_status(args: DbArgs) -> Result<(), String> {
    let schema = load_schema(&args.model)?;
    let conn = open_database(&args.db)?;

    for entity in schema.entities() {
        if entity.dynamic_name {
            println!("{:<24} (runtime table names)", entity.name);
            continue;
        }
        match table_row_count(&conn, &entity.table)? {
            Some(rows) => println!("{:<24} {rows} row(s)", entity.table),
            None => println!("{:<24} missing", entity.table),
        }
        if let Ok(fts) = schema.fts_entity(&entity.name) {
            match table_row_count(&conn, &fts.table)? {
                Some(rows) => println!("{:<24} {rows} row(s)", fts.table),
                None => println!("{:<24} missing", fts.table),
            }
        }
    }
    Ok(())
}

fn table_row_count(conn: &Connection, table: &str) -> Result<Option<i64>, String> {
    let exists: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE name = ?1",
            [table],
            |row| row.get(0),
        )
        .map_err(|e| e.to_string())?;
    if exists == 0 {
        return Ok(None);
    }
    // Identifier safety: the name came from a validated entity model.
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })
    .map(Some)
    .map_err(|e| e.to_string())
}

fn run_fts_rebuild(args: DbArgs) -> Result<(), String> {
    let schema = load_schema(&args.model)?;
    let conn = open_database(&args.db)?;

    let mut rebuilt = 0usize;
    for entity in schema.entities() {
        let Ok(fts) = schema.fts_entity(&entity.name) else {
            continue;
        };
        let mirror = FtsTable::new(&conn, &schema, &entity.name).map_err(|e| e.to_string())?;
        mirror.create_table().map_err(|e| e.to_string())?;
        let rows = mirror.populate(true).map_err(|e| e.to_string())?;
        println!("{:<24} {rows} row(s) mirrored", fts.table);
        rebuilt += 1;
    }

    if rebuilt == 0 {
        println!("No FTS mirrors declared in the model.");
    }
    Ok(())
}

use std::{
    cmp::Ordering,
    ffi::c_int,
    path::Path,
    sync::Once,
    time::{Duration, Instant},
};

use include_dir::{include_dir, Dir};
use rusqlite::{Connection, OpenFlags, TransactionBehavior};
use rusqlite_migration::{Migrations, SchemaVersion};
use shared::{error::StoreError, model::ServiceVersion, other_error};
use tracing::{debug, error, info, instrument, span, trace, warn, Level};

static MIGRATIONS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/migrations");

fn sqlite_connection_profiling_callback(query: &str, duration: Duration) {
    trace!(target: "sqlite_profiling", ?duration, query);
}

fn sqlite_connection_trace_callback(query: &str) {
    trace!(target: "sqlite_tracing", query);
}

fn sqlite_log_callback(sqlite_code: c_int, msg: &str) {
    use rusqlite::ffi;
    let err_code = ffi::Error::new(sqlite_code);

    // See https://www.sqlite.org/rescode.html for description of result codes.
    match sqlite_code & 0xff {
        ffi::SQLITE_NOTICE => info!(target: "sqlite", msg, %err_code, "SQLITE NOTICE"),
        ffi::SQLITE_WARNING => warn!(target: "sqlite", msg, %err_code, "SQLITE WARNING"),
        _ => error!(target: "sqlite", msg, %err_code, "SQLITE ERROR"),
    };
}

pub fn get_migrations() -> Result<Migrations<'static>, StoreError> {
    Migrations::from_directory(&MIGRATIONS_DIR)
        .map_err(|e| other_error!("Migrations::from_directory: {:?}", e))
}

#[instrument(skip(conn))]
pub fn configure_new_connection(conn: &mut Connection) -> Result<(), StoreError> {
    run_pragmas(conn)?;

    if cfg!(debug_assertions) {
        conn.trace(Some(sqlite_connection_trace_callback));
    } else {
        // Hook up the profiling callback
        conn.profile(Some(sqlite_connection_profiling_callback));
    }

    Ok(())
}

#[instrument(skip(conn))]
pub fn run_pragmas(conn: &Connection) -> Result<(), StoreError> {
    // In memory databases answer "memory" and stay that way
    let journal_mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!(%journal_mode);
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

fn schema_version(migrations: &Migrations, conn: &Connection) -> Result<usize, StoreError> {
    match migrations
        .current_version(conn)
        .map_err(|e| other_error!("Migrations::current_version: {:?}", e))?
    {
        SchemaVersion::Inside(n) => Ok(n.into()),
        SchemaVersion::Outside(n) => Err(other_error!(
            "Schema version {n} is outside of known schema migrations. Manual intervention required"
        )),
        SchemaVersion::NoneSet => Ok(0),
    }
}

/// Brings the schema up to date, returning how many migrations ran
#[instrument(skip(conn))]
pub fn run_migrations(conn: &mut Connection) -> Result<usize, StoreError> {
    let migrations = get_migrations()?;
    let _span = span!(Level::INFO, "Running migrations").entered();

    let initial_version = schema_version(&migrations, conn)?;
    migrations
        .to_latest(conn)
        .map_err(|e| other_error!("Migrations::to_latest: {:?}", e))?;
    let final_version = schema_version(&migrations, conn)?;

    Ok(final_version - initial_version)
}

/// Records `current_version` if it's newer than the last version to open the
/// database
#[instrument(skip(conn))]
pub fn record_service_version(
    conn: &mut Connection,
    current_version: &str,
) -> Result<Option<ServiceVersion>, StoreError> {
    let previous_version = ServiceVersion::fetch_latest(conn)?;

    let newer = Ordering::Less
        == previous_version
            .as_ref()
            .map(|prev| prev.cmp(current_version))
            // If this is the first version, it's automatically newer
            .unwrap_or(Ok(Ordering::Less))
            .map_err(|e| {
                other_error!(
                    "Comparing {:?} to {}: {:?}",
                    previous_version,
                    current_version,
                    e
                )
            })?;

    if !newer {
        return Ok(None);
    }

    let new_version = ServiceVersion::new(current_version.to_owned())
        .map_err(|e| other_error!("ServiceVersion::new({}): {:?}", current_version, e))?;
    let r = ServiceVersion::create(conn, new_version)?;
    info!("New version: {r}");
    Ok(Some(r))
}

fn configure_sqlite_log() -> Result<(), StoreError> {
    // Configure the log callback before opening the database
    static CONFIG_LOG: Once = Once::new();
    let mut config_result = Ok(());
    CONFIG_LOG.call_once(|| unsafe {
        config_result = rusqlite::trace::config_log(Some(sqlite_log_callback));
    });
    Ok(config_result?)
}

fn prepare(mut conn: Connection, current_version: &str) -> Result<Connection, StoreError> {
    configure_new_connection(&mut conn)?;

    debug!("Checking DB is writable");
    conn.transaction_with_behavior(TransactionBehavior::Exclusive)?;

    let ran = run_migrations(&mut conn)?;
    debug!(ran, "Migrations complete");

    record_service_version(&mut conn, current_version)?;

    Ok(conn)
}

/// Opens (creating if needed) the database and brings it up to date
#[instrument]
pub fn open_database(connection_string: &str, current_version: &str) -> Result<Connection, StoreError> {
    configure_sqlite_log()?;

    let open_flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX
        | OpenFlags::SQLITE_OPEN_CREATE;

    let conn = Connection::open_with_flags(connection_string, open_flags)?;
    prepare(conn, current_version)
}

/// A private, fully migrated database that disappears when dropped
pub fn open_in_memory(current_version: &str) -> Result<Connection, StoreError> {
    prepare(Connection::open_in_memory()?, current_version)
}

/// Removes the database file along with its WAL side files
#[instrument]
pub fn delete_database(path: &Path) -> Result<(), std::io::Error> {
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.as_os_str().to_owned();
        file.push(suffix);
        match std::fs::remove_file(&file) {
            Ok(()) => warn!(?file, "Deleted database file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Runs an optimize on the database. Should be run periodically to keep the
/// database running optimally. It should be very fast if run regularly
#[instrument(skip(conn))]
pub fn optimize_database(conn: &Connection) -> Result<Duration, StoreError> {
    let start = Instant::now();
    conn.pragma_update(None, "analysis_limit", "400")?;
    conn.pragma_update(None, "optimize", "")?;

    Ok(start.elapsed())
}

#[instrument(skip(conn))]
pub fn close_database(conn: Connection) -> Result<(), StoreError> {
    let d1 = optimize_database(&conn)?;
    let d2 = vacuum_database(&conn)?;

    info!(
        "Optimize db took: {:.3}, vacuum took: {:.3}, total: {:.3}",
        d1.as_secs_f32(),
        d2.as_secs_f32(),
        (d1 + d2).as_secs_f32()
    );
    conn.close().map_err(|(_conn, e)| e)?;

    Ok(())
}

// Vacuums the database to free up space and improve fragmentation
#[instrument(skip(conn))]
pub fn vacuum_database(conn: &Connection) -> Result<Duration, StoreError> {
    let start = Instant::now();
    conn.execute("VACUUM", ())?;
    Ok(start.elapsed())
}

#[cfg(test)]
pub(crate) fn test_connection() -> Connection {
    open_in_memory("0.1.0").expect("in memory database")
}

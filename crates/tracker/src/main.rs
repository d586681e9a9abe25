use std::{io, path::Path};

use clap::Parser;
use shared::*;
use tracing::{debug, warn};
use tracker::{db, App, Cli, TracingErrorSink};

fn main() -> Result<(), anyhow::Error> {
    load_dotenv()?;
    configure_tracing();

    let args = Cli::parse();
    debug!(?args);

    let app = App::from_args(&args)?;

    if args.debug_delete_database {
        warn!("Deleting database before starting");
        db::delete_database(Path::new(&args.sqlite_connection_string))?;
    }

    let mut conn = db::open_database(&args.sqlite_connection_string, env!("CARGO_PKG_VERSION"))?;

    let result = app.run(&mut conn, args.command, &TracingErrorSink, &mut io::stdout().lock());

    db::close_database(conn)?;
    result
}

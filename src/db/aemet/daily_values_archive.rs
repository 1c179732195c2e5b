use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::Path,
};

use duckdb::Connection;
use itertools::Itertools;
use log::{info, warn};
use thiserror::Error;

use crate::{
    api::aemet::{
        daily_values::{MetadataSet, YearDataset},
        lib_opendata::Row,
    },
    config::MysqlTarget,
    etl::Persist,
    utils::{
        confirm::Confirm,
        lib_duckdb::{quote_ident, ReplaceTable},
    },
};

pub const DATA_TABLE_PREFIX: &str = "data";
pub const METADATA_TABLE: &str = "metadata";

/// Alias of the attached MySQL database inside DuckDB.
const MYSQL_ALIAS: &str = "target";

#[derive(Error, Debug)]
pub enum PersistError {
    #[error(transparent)]
    Duckdb(#[from] duckdb::Error),

    #[error("Failed writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("No rows to write into table {0}")]
    NoRows(String),

    #[error("Confirmation prompt failed: {0}")]
    Prompt(#[source] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Written {
        data_rows: usize,
        metadata_rows: Option<usize>,
    },
    Declined,
}

/// Daily climatological values of one AEMET station, one table per year.
#[derive(Debug, Clone)]
pub struct DailyValuesArchive {
    pub base_dir: String,
    pub duckdb_path: String,
    pub station_id: String,
    /// When set the tables go to this MySQL database instead of the DuckDB file.
    pub mysql: Option<MysqlTarget>,
}

impl DailyValuesArchive {
    pub fn table_name(year: i16) -> String {
        format!("{}{}", DATA_TABLE_PREFIX, year)
    }

    /// Return the json filename for the year.  Does not check if the file exists.
    pub fn filename(&self, year: i16) -> String {
        self.base_dir.to_owned()
            + "/Raw/"
            + &year.to_string()
            + "/daily_values_"
            + &self.station_id
            + "_"
            + &year.to_string()
            + ".json"
    }

    pub fn metadata_filename(&self) -> String {
        self.base_dir.to_owned() + "/Raw/metadata_" + &self.station_id + ".json"
    }

    pub fn confirmation_message(&self, year: i16, with_metadata: bool) -> String {
        let mut message = format!(
            "Everything ready to load the data into table \"{}\"",
            DailyValuesArchive::table_name(year)
        );
        if with_metadata {
            message += &format!(" and the metadata into table \"{}\"", METADATA_TABLE);
        }
        message += "\nWarning, the tables will be dropped and created again with the downloaded data";
        message
    }

    /// Table name as seen from the DuckDB connection.
    fn qualified(&self, table: &str) -> String {
        match self.mysql {
            Some(_) => format!("{}.{}", quote_ident(MYSQL_ALIAS), quote_ident(table)),
            None => quote_ident(table),
        }
    }

    fn connect(&self) -> Result<Connection, PersistError> {
        if let Some(dir) = Path::new(&self.duckdb_path).parent() {
            create_dir(dir)?;
        }
        let conn = Connection::open(&self.duckdb_path)?;
        if let Some(mysql) = &self.mysql {
            info!("Attaching MySQL database {} on {}", mysql.database, mysql.host);
            conn.attach_mysql(mysql, MYSQL_ALIAS)?;
        }
        Ok(conn)
    }

    /// Drop and recreate `table` with `rows`.  Returns the number of rows written.
    fn replace_table(
        &self,
        conn: &Connection,
        table: &str,
        path: &str,
        rows: &[Row],
    ) -> Result<usize, PersistError> {
        if rows.is_empty() {
            return Err(PersistError::NoRows(table.to_string()));
        }
        write_json(path, rows)?;
        let n = conn.replace_table_from_json(&self.qualified(table), path, &columns(rows))?;
        info!("{} rows written into table {}", n, table);
        Ok(n)
    }
}

impl Persist for DailyValuesArchive {
    fn persist(
        &self,
        data: &YearDataset,
        metadata: Option<&MetadataSet>,
        confirm: &mut dyn Confirm,
    ) -> Result<PersistOutcome, PersistError> {
        let table = DailyValuesArchive::table_name(data.year);
        if data.is_empty() {
            return Err(PersistError::NoRows(table));
        }
        let message = self.confirmation_message(data.year, metadata.is_some());
        if !confirm.confirm(&message).map_err(PersistError::Prompt)? {
            warn!("Not loading table {}", table);
            return Ok(PersistOutcome::Declined);
        }

        let conn = self.connect()?;
        let data_rows = self.replace_table(&conn, &table, &self.filename(data.year), &data.rows)?;
        let metadata_rows = match metadata {
            Some(metadata) => Some(self.replace_table(
                &conn,
                METADATA_TABLE,
                &self.metadata_filename(),
                &metadata.fields,
            )?),
            None => None,
        };
        conn.close().map_err(|(_, e)| e)?;

        Ok(PersistOutcome::Written {
            data_rows,
            metadata_rows,
        })
    }
}

/// Union of the keys of all rows, in the order they first show up.
pub fn columns(rows: &[Row]) -> Vec<String> {
    rows.iter().flat_map(|row| row.keys()).unique().cloned().collect()
}

fn create_dir(dir: &Path) -> Result<(), PersistError> {
    fs::create_dir_all(dir).map_err(|source| PersistError::Io {
        path: dir.display().to_string(),
        source,
    })
}

fn write_json(path: &str, rows: &[Row]) -> Result<(), PersistError> {
    let io_err = |source| PersistError::Io {
        path: path.to_string(),
        source,
    };
    if let Some(dir) = Path::new(path).parent() {
        create_dir(dir)?;
    }
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, rows)?;
    writer.flush().map_err(io_err)
}

use log::{error, info};
use serde::Deserialize;

use crate::interval::window::{DateWindow, WindowSplit};

use super::lib_opendata::{FetchError, OpenDataClient, Row, Transport};

/// One request for the daily climatological values of a station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationQuery {
    pub station_id: String,
    pub year: i16,
    pub window: DateWindow,
}

impl StationQuery {
    pub fn new(station_id: &str, year: i16, window: DateWindow) -> StationQuery {
        StationQuery {
            station_id: station_id.to_string(),
            year,
            window,
        }
    }

    /// Path relative to the OpenData base url.
    pub fn path(&self) -> String {
        daily_values_path(
            &self.window.start_param(),
            &self.window.end_param(),
            &self.station_id,
        )
    }
}

/// Start and end of the fixed range used to find the metadata pointer.
const METADATA_FECHAINI: &str = "2000-01-01T00:00:00UTC";
const METADATA_FECHAFIN: &str = "2000-01-02T00:00:00UTC";

fn daily_values_path(fechaini: &str, fechafin: &str, station_id: &str) -> String {
    format!(
        "valores/climatologicos/diarios/datos/fechaini/{}/fechafin/{}/estacion/{}",
        fechaini, fechafin, station_id
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum WindowStatus {
    Fetched(usize),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowReport {
    pub window: DateWindow,
    pub status: WindowStatus,
}

/// All the rows of one year, in the order they arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct YearDataset {
    pub year: i16,
    pub rows: Vec<Row>,
    pub windows: Vec<WindowReport>,
}

impl YearDataset {
    pub fn new(year: i16) -> YearDataset {
        YearDataset {
            year,
            rows: Vec::new(),
            windows: Vec::new(),
        }
    }

    /// Append the rows of a window after the ones already there.
    pub fn extend(&mut self, window: DateWindow, rows: Vec<Row>) {
        self.windows.push(WindowReport {
            window,
            status: WindowStatus::Fetched(rows.len()),
        });
        self.rows.extend(rows);
    }

    pub fn record_failure(&mut self, window: DateWindow, reason: String) {
        self.windows.push(WindowReport {
            window,
            status: WindowStatus::Failed(reason),
        });
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn failed_windows(&self) -> usize {
        self.windows
            .iter()
            .filter(|w| matches!(w.status, WindowStatus::Failed(_)))
            .count()
    }
}

/// Field descriptors of the daily values endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetadataSet {
    pub descripcion: Option<String>,
    pub copyright: Option<String>,
    #[serde(rename = "notaLegal")]
    pub nota_legal: Option<String>,
    #[serde(rename = "campos")]
    pub fields: Vec<Row>,
}

/// See https://opendata.aemet.es/dist/index.html#/valores-climatologicos
pub struct DailyValuesApi<T: Transport> {
    client: OpenDataClient<T>,
    station_id: String,
}

impl<T: Transport> DailyValuesApi<T> {
    pub fn new(client: OpenDataClient<T>, station_id: &str) -> Self {
        DailyValuesApi {
            client,
            station_id: station_id.to_string(),
        }
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    pub fn client(&self) -> &OpenDataClient<T> {
        &self.client
    }

    /// Prepare and retrieve the rows of one window.
    pub fn fetch_window(&self, year: i16, window: DateWindow) -> Result<Vec<Row>, FetchError> {
        let query = StationQuery::new(&self.station_id, year, window);
        info!(
            "Requesting AEMET daily values for station {}, {} ...",
            query.station_id, query.window
        );
        let prepared = self.client.prepare(&query.path())?;
        let url = prepared.datos.ok_or(FetchError::MissingPointer("datos"))?;
        info!("Getting the generated data ...");
        self.client.retrieve_rows(&url)
    }

    /// Fetch every window of the year and concatenate them in window order.
    ///
    /// A window that fails for any reason other than a refused request is
    /// logged, counted as zero rows and recorded in the dataset.  A refused
    /// request aborts right away.
    pub fn fetch_year(&self, year: i16, split: WindowSplit) -> Result<YearDataset, FetchError> {
        let mut dataset = YearDataset::new(year);
        for window in split.windows(year)? {
            match self.fetch_window(year, window) {
                Ok(rows) => {
                    info!("  got {} rows for {}", rows.len(), window);
                    dataset.extend(window, rows);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!("Failed to fetch {} for station {}: {}", window, self.station_id, e);
                    dataset.record_failure(window, e.to_string());
                }
            }
            info!("  {} rows in total for {}", dataset.len(), year);
        }
        Ok(dataset)
    }

    /// The metadata pointer is the same for any date range, so ask for a
    /// small fixed one.
    pub fn fetch_metadata(&self) -> Result<MetadataSet, FetchError> {
        info!("Getting metadata ...");
        let path = daily_values_path(METADATA_FECHAINI, METADATA_FECHAFIN, &self.station_id);
        let prepared = self.client.prepare(&path)?;
        let url = prepared
            .metadatos
            .ok_or(FetchError::MissingPointer("metadatos"))?;
        self.client.retrieve(&url)
    }
}

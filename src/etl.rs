use log::{error, info, warn};
use thiserror::Error;

use crate::{
    api::aemet::{
        daily_values::{DailyValuesApi, MetadataSet, YearDataset},
        lib_opendata::{FetchError, Transport},
    },
    config::RunSettings,
    db::aemet::daily_values_archive::{PersistError, PersistOutcome},
    utils::confirm::Confirm,
};

/// Where a year ends up once it has been fetched.
pub trait Persist {
    fn persist(
        &self,
        data: &YearDataset,
        metadata: Option<&MetadataSet>,
        confirm: &mut dyn Confirm,
    ) -> Result<PersistOutcome, PersistError>;
}

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Aborting at year {year}: {source}")]
    Fatal {
        year: i16,
        #[source]
        source: FetchError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum YearOutcome {
    Written {
        data_rows: usize,
        metadata_rows: Option<usize>,
    },
    Declined,
    /// Nothing came back for the year, existing tables were left untouched.
    SkippedEmpty,
    FetchFailed(String),
    PersistFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearReport {
    pub year: i16,
    pub rows: usize,
    pub failed_windows: usize,
    pub outcome: YearOutcome,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunReport {
    pub years: Vec<YearReport>,
    pub metadata_fetched: bool,
}

impl RunReport {
    pub fn written(&self) -> usize {
        self.years
            .iter()
            .filter(|y| matches!(y.outcome, YearOutcome::Written { .. }))
            .count()
    }

    pub fn log_summary(&self) {
        for y in &self.years {
            info!(
                "{}: {} rows, {} failed windows, {:?}",
                y.year, y.rows, y.failed_windows, y.outcome
            );
        }
        info!(
            "{} of {} years written",
            self.written(),
            self.years.len()
        );
    }
}

/// Fetch every configured year and hand it to the persister, one year at a time.
pub struct Pipeline<T: Transport, P: Persist> {
    api: DailyValuesApi<T>,
    persister: P,
    confirm: Box<dyn Confirm>,
    settings: RunSettings,
}

impl<T: Transport, P: Persist> Pipeline<T, P> {
    pub fn new(
        api: DailyValuesApi<T>,
        persister: P,
        confirm: Box<dyn Confirm>,
        settings: RunSettings,
    ) -> Self {
        Pipeline {
            api,
            persister,
            confirm,
            settings,
        }
    }

    pub fn api(&self) -> &DailyValuesApi<T> {
        &self.api
    }

    pub fn persister(&self) -> &P {
        &self.persister
    }

    /// Stops at the first refused data request.  Any other failure, including
    /// a refused metadata request, is logged, reported and the loop moves on.
    pub fn run(&mut self) -> Result<RunReport, EtlError> {
        let mut report = RunReport::default();
        let mut metadata: Option<MetadataSet> = None;

        for (i, &year) in self.settings.years.iter().enumerate() {
            if i == 0 && self.settings.fetch_metadata {
                match self.api.fetch_metadata() {
                    Ok(m) => {
                        info!("Got {} metadata fields", m.fields.len());
                        report.metadata_fetched = true;
                        metadata = Some(m);
                    }
                    // even a refused metadata request only costs the metadata
                    Err(e) => error!("Failed to get the metadata: {}", e),
                }
            }

            let data = match self.api.fetch_year(year, self.settings.split) {
                Ok(data) => data,
                Err(e) if e.is_fatal() => return Err(EtlError::Fatal { year, source: e }),
                Err(e) => {
                    error!("Failed to fetch year {}: {}", year, e);
                    report.years.push(YearReport {
                        year,
                        rows: 0,
                        failed_windows: 0,
                        outcome: YearOutcome::FetchFailed(e.to_string()),
                    });
                    continue;
                }
            };

            let outcome = if data.is_empty() {
                warn!("No data for {}, skipping the load", year);
                YearOutcome::SkippedEmpty
            } else {
                // metadata goes with the first year that gets loaded
                let outcome = match self.persister.persist(
                    &data,
                    metadata.as_ref(),
                    self.confirm.as_mut(),
                ) {
                    Ok(PersistOutcome::Written {
                        data_rows,
                        metadata_rows,
                    }) => YearOutcome::Written {
                        data_rows,
                        metadata_rows,
                    },
                    Ok(PersistOutcome::Declined) => YearOutcome::Declined,
                    Err(e) => {
                        error!("Failed to load year {}: {}", year, e);
                        YearOutcome::PersistFailed(e.to_string())
                    }
                };
                metadata = None;
                outcome
            };

            report.years.push(YearReport {
                year,
                rows: data.len(),
                failed_windows: data.failed_windows(),
                outcome,
            });
        }

        Ok(report)
    }
}

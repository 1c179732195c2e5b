use crate::config::Config;

use super::aemet::daily_values_archive::DailyValuesArchive;

pub struct ProdDb {}

impl ProdDb {
    pub fn aemet_daily_values(config: &Config, station_id: &str) -> DailyValuesArchive {
        DailyValuesArchive {
            base_dir: config.archive_dir.clone() + "/Aemet/DailyValues",
            duckdb_path: config.duckdb_path.clone(),
            station_id: station_id.to_string(),
            mysql: config.mysql.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_from_config() {
        let config = Config::from_lookup(|key| match key {
            "AEMET_API_KEY" => Some("abc".to_string()),
            "ARCHIVE_DIR" => Some("/data".to_string()),
            _ => None,
        })
        .unwrap();
        let archive = ProdDb::aemet_daily_values(&config, "3195");
        assert_eq!(archive.duckdb_path, "/data/aemet.duckdb");
        assert_eq!(
            archive.filename(2019),
            "/data/Aemet/DailyValues/Raw/2019/daily_values_3195_2019.json"
        );
        assert!(archive.mysql.is_none());
    }
}

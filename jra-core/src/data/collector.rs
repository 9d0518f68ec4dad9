//! Per-category collectors.
//!
//! Each collector fetches the category's endpoint for one year and turns the
//! body into a [`YearlyDataset`] with the category's fixed schema. Row
//! extraction is not implemented yet: every collector returns an empty table
//! whatever the body contains.

use std::sync::Arc;

use super::provider::Fetch;
use crate::category::CategoryKind;
use crate::dataset::YearlyDataset;
use crate::error::CollectError;

/// Capability: collect one year of one category.
pub trait Collector: Send + Sync {
    fn category(&self) -> CategoryKind;

    fn collect(&self, year: i32) -> Result<YearlyDataset, CollectError>;
}

/// Where a category's data lives: `{api_url}/{prefix}?year={year}`.
#[derive(Clone)]
struct Endpoint {
    fetcher: Arc<dyn Fetch>,
    api_url: String,
}

impl Endpoint {
    fn new(fetcher: Arc<dyn Fetch>, api_url: &str) -> Self {
        Self {
            fetcher,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn fetch_year(&self, category: CategoryKind, year: i32) -> Result<String, CollectError> {
        let url = format!("{}/{}", self.api_url, category.prefix());
        let year = year.to_string();
        Ok(self.fetcher.fetch(&url, &[("year", year.as_str())])?)
    }
}

pub struct RaceCalendarCollector {
    endpoint: Endpoint,
}

impl Collector for RaceCalendarCollector {
    fn category(&self) -> CategoryKind {
        CategoryKind::RaceCalendar
    }

    fn collect(&self, year: i32) -> Result<YearlyDataset, CollectError> {
        tracing::info!("Collecting race calendar for year {year}");
        let _body = self.endpoint.fetch_year(self.category(), year)?;
        Ok(YearlyDataset::empty(self.category(), year))
    }
}

pub struct RaceResultsCollector {
    endpoint: Endpoint,
}

impl Collector for RaceResultsCollector {
    fn category(&self) -> CategoryKind {
        CategoryKind::RaceResults
    }

    fn collect(&self, year: i32) -> Result<YearlyDataset, CollectError> {
        tracing::info!("Collecting race results for year {year}");
        let _body = self.endpoint.fetch_year(self.category(), year)?;
        Ok(YearlyDataset::empty(self.category(), year))
    }
}

pub struct HorseDataCollector {
    endpoint: Endpoint,
}

impl Collector for HorseDataCollector {
    fn category(&self) -> CategoryKind {
        CategoryKind::HorseData
    }

    fn collect(&self, year: i32) -> Result<YearlyDataset, CollectError> {
        tracing::info!("Collecting horse data for year {year}");
        let _body = self.endpoint.fetch_year(self.category(), year)?;
        Ok(YearlyDataset::empty(self.category(), year))
    }
}

pub struct TrackConditionCollector {
    endpoint: Endpoint,
}

impl Collector for TrackConditionCollector {
    fn category(&self) -> CategoryKind {
        CategoryKind::TrackCondition
    }

    fn collect(&self, year: i32) -> Result<YearlyDataset, CollectError> {
        tracing::info!("Collecting track condition data for year {year}");
        let _body = self.endpoint.fetch_year(self.category(), year)?;
        Ok(YearlyDataset::empty(self.category(), year))
    }
}

/// One collector per category, all sharing a transport.
pub struct CollectorSet {
    race_calendar: RaceCalendarCollector,
    race_results: RaceResultsCollector,
    horse_data: HorseDataCollector,
    track_condition: TrackConditionCollector,
}

impl CollectorSet {
    pub fn new(fetcher: Arc<dyn Fetch>, api_url: &str) -> Self {
        let endpoint = Endpoint::new(fetcher, api_url);
        Self {
            race_calendar: RaceCalendarCollector {
                endpoint: endpoint.clone(),
            },
            race_results: RaceResultsCollector {
                endpoint: endpoint.clone(),
            },
            horse_data: HorseDataCollector {
                endpoint: endpoint.clone(),
            },
            track_condition: TrackConditionCollector { endpoint },
        }
    }

    pub fn get(&self, category: CategoryKind) -> &dyn Collector {
        match category {
            CategoryKind::RaceCalendar => &self.race_calendar,
            CategoryKind::RaceResults => &self.race_results,
            CategoryKind::HorseData => &self.horse_data,
            CategoryKind::TrackCondition => &self.track_condition,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::FetchError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingFetcher {
        calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl Fetch for RecordingFetcher {
        fn name(&self) -> &str {
            "recording"
        }

        fn fetch(&self, url: &str, query: &[(&str, &str)]) -> Result<String, FetchError> {
            self.calls.lock().unwrap().push((
                url.to_string(),
                query
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ));
            Ok("<table><tr><td>ignored</td></tr></table>".to_string())
        }
    }

    struct FailingFetcher;

    impl Fetch for FailingFetcher {
        fn name(&self) -> &str {
            "failing"
        }

        fn fetch(&self, url: &str, _query: &[(&str, &str)]) -> Result<String, FetchError> {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 503,
            })
        }
    }

    #[test]
    fn dispatch_is_exhaustive_and_matches_category() {
        let set = CollectorSet::new(Arc::new(RecordingFetcher::default()), "https://api.test");
        for cat in CategoryKind::ALL {
            assert_eq!(set.get(cat).category(), cat);
        }
    }

    #[test]
    fn collectors_return_empty_tables_with_schema() {
        let set = CollectorSet::new(Arc::new(RecordingFetcher::default()), "https://api.test");
        for cat in CategoryKind::ALL {
            let ds = set.get(cat).collect(2020).unwrap();
            assert!(ds.is_empty());
            assert_eq!(ds.year(), 2020);
            assert_eq!(ds.columns(), cat.columns());
        }
    }

    #[test]
    fn endpoint_is_category_and_year_specific() {
        let fetcher = Arc::new(RecordingFetcher::default());
        let set = CollectorSet::new(fetcher.clone(), "https://api.test/");
        set.get(CategoryKind::HorseData).collect(1999).unwrap();

        let calls = fetcher.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "https://api.test/horse_data");
        assert_eq!(calls[0].1, vec![("year".to_string(), "1999".to_string())]);
    }

    #[test]
    fn transport_failure_surfaces_as_transport_error() {
        let set = CollectorSet::new(Arc::new(FailingFetcher), "https://api.test");
        let err = set.get(CategoryKind::RaceResults).collect(2020).unwrap_err();
        assert!(err.is_transport());
    }
}

//! Property tests for the summary manifest.

use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use jra_core::data::SummaryManifest;
use jra_core::CategoryKind;

fn category() -> impl Strategy<Value = CategoryKind> {
    prop::sample::select(CategoryKind::ALL.to_vec())
}

proptest! {
    /// The manifest is exactly the grouping of `{prefix}_{year}.csv` names.
    #[test]
    fn manifest_groups_generated_names(
        cells in prop::collection::vec((category(), 1986i32..2030), 0..40),
        noise in prop::collection::vec("[a-z]{1,8}\\.(csv|json|txt)", 0..5),
    ) {
        let mut names: Vec<String> = cells
            .iter()
            .map(|(c, y)| format!("{}_{y}.csv", c.prefix()))
            .collect();
        // Underscore-free noise never contributes an entry.
        names.extend(noise);

        let manifest = SummaryManifest::from_file_names(&names);

        let mut expected: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
        for (c, y) in &cells {
            expected.entry(c.prefix()).or_default().insert(y.to_string());
        }

        prop_assert_eq!(manifest.len(), expected.len());
        for (prefix, years) in &expected {
            let got: Vec<String> = manifest.years(prefix).unwrap().to_vec();
            let want: Vec<String> = years.iter().cloned().collect();
            prop_assert_eq!(got, want);
        }
    }

    /// Name order never changes the manifest.
    #[test]
    fn manifest_is_order_independent(
        cells in prop::collection::vec((category(), 1986i32..2030), 0..30),
    ) {
        let names: Vec<String> = cells
            .iter()
            .map(|(c, y)| format!("{}_{y}.csv", c.prefix()))
            .collect();
        let mut reversed = names.clone();
        reversed.reverse();

        prop_assert_eq!(
            SummaryManifest::from_file_names(&names),
            SummaryManifest::from_file_names(&reversed)
        );
    }
}

use std::collections::BTreeMap;

use serde::Serialize;

use crate::geojson::FeatureCollection;

/// Feature counts of a layer, shown next to its schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    pub feature_count: usize,
    /// Feature count per geometry type name.
    pub kinds: BTreeMap<String, usize>,
    pub dominant_kind: Option<String>,
}

impl CollectionSummary {
    pub fn of(collection: &FeatureCollection) -> Self {
        let mut kinds: BTreeMap<String, usize> = BTreeMap::new();
        for feature in &collection.features {
            *kinds.entry(feature.kind().as_str().to_string()).or_insert(0) += 1;
        }

        let mut dominant: Option<(&String, usize)> = None;
        for (name, count) in &kinds {
            if dominant.is_none_or(|(_, best)| *count > best) {
                dominant = Some((name, *count));
            }
        }

        Self {
            feature_count: collection.features.len(),
            dominant_kind: dominant.map(|(name, _)| name.clone()),
            kinds,
        }
    }
}

use super::classifier::days_between;
use super::records::{ListingIdentity, SourceSnapshot};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Which postal codes image planning should consider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ZipFilter {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl ZipFilter {
    /// Builds an allow-list; an empty list or the literal `all` means every zip.
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed = BTreeSet::new();
        for code in codes {
            let code = code.as_ref().trim();
            if code.eq_ignore_ascii_case("all") {
                return Self::All;
            }
            if !code.is_empty() {
                allowed.insert(code.to_ascii_uppercase());
            }
        }

        if allowed.is_empty() {
            Self::All
        } else {
            Self::Only(allowed)
        }
    }

    pub fn allows(&self, zip: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(allowed) => allowed.contains(&zip.to_ascii_uppercase()),
        }
    }
}

/// Listings still lacking photos within a single postal code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZipGap {
    pub listings: BTreeSet<String>,
    pub dates: BTreeMap<NaiveDate, Vec<String>>,
    seen: HashSet<(NaiveDate, String)>,
}

impl ZipGap {
    fn record(&mut self, day: NaiveDate, listing_key: &str) {
        self.listings.insert(listing_key.to_string());
        let keys = self.dates.entry(day).or_default();
        if self.seen.insert((day, listing_key.to_string())) {
            keys.push(listing_key.to_string());
        }
    }

    pub fn to_view(&self) -> ZipGapView {
        ZipGapView {
            listings: self.listings.iter().cloned().collect(),
            dates: self
                .dates
                .iter()
                .map(|(day, keys)| (day.to_string(), keys.clone()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZipGapView {
    pub listings: Vec<String>,
    pub dates: BTreeMap<String, Vec<String>>,
}

/// Collects, per zip, every listing in `[start, end]` whose images are absent
/// or not yet usable.
pub fn missing_by_zip(
    snapshot: &SourceSnapshot,
    start: NaiveDate,
    end: NaiveDate,
    filter: &ZipFilter,
) -> BTreeMap<String, ZipGap> {
    let mut gaps: BTreeMap<String, ZipGap> = BTreeMap::new();

    for day in days_between(start, end) {
        for record in snapshot.listings_on(day) {
            let listing_key = record.listing_key.trim();
            let zip = record.zip.trim();
            let domain = record.domain.trim();
            if listing_key.is_empty() || zip.is_empty() || domain.is_empty() {
                continue;
            }
            if !filter.allows(zip) {
                continue;
            }

            if snapshot.has_images(&ListingIdentity::new(listing_key, domain)) {
                continue;
            }

            gaps.entry(zip.to_string())
                .or_default()
                .record(day, listing_key);
        }
    }

    gaps
}

pub fn missing_by_zip_view(gaps: &BTreeMap<String, ZipGap>) -> BTreeMap<String, ZipGapView> {
    gaps.iter()
        .map(|(zip, gap)| (zip.clone(), gap.to_view()))
        .collect()
}

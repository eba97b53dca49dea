use super::zip_gaps::ZipGap;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// date -> zip -> batches of listing keys.
pub type ImageBatches = BTreeMap<NaiveDate, BTreeMap<String, Vec<Vec<String>>>>;

/// Splits `listing_keys` into ordered chunks of at most `max_batch` keys.
pub fn chunk_listings(listing_keys: &[String], max_batch: usize) -> Vec<Vec<String>> {
    listing_keys
        .chunks(max_batch.max(1))
        .map(<[String]>::to_vec)
        .collect()
}

/// Regroups per-zip gaps into per-day image fetch batches.
pub fn plan_image_batches(gaps: &BTreeMap<String, ZipGap>, max_batch: usize) -> ImageBatches {
    let mut batches = ImageBatches::new();

    for (zip, gap) in gaps {
        for (day, listing_keys) in &gap.dates {
            if listing_keys.is_empty() {
                continue;
            }
            batches
                .entry(*day)
                .or_default()
                .insert(zip.clone(), chunk_listings(listing_keys, max_batch));
        }
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn remainder_forms_final_batch() {
        let batches = chunk_listings(&keys(&["A", "B", "C", "D", "E"]), 2);
        assert_eq!(
            batches,
            vec![keys(&["A", "B"]), keys(&["C", "D"]), keys(&["E"])]
        );
    }

    #[test]
    fn batch_counts_and_order_hold_for_any_size() {
        let source: Vec<String> = (0..23).map(|n| format!("HAR{n:03}")).collect();
        for size in 1..=25 {
            let batches = chunk_listings(&source, size);
            assert_eq!(batches.len(), source.len().div_ceil(size));
            let (last, full) = batches.split_last().expect("non-empty input");
            assert!(full.iter().all(|batch| batch.len() == size));
            assert!(!last.is_empty() && last.len() <= size);
            assert_eq!(batches.concat(), source);
        }
    }

    #[test]
    fn empty_lists_produce_no_batches() {
        assert!(chunk_listings(&[], 3).is_empty());

        let mut gaps = BTreeMap::new();
        let mut gap = ZipGap::default();
        let day = NaiveDate::from_ymd_opt(2025, 10, 5).expect("valid date");
        gap.dates.insert(day, Vec::new());
        gaps.insert("77002".to_string(), gap);
        assert!(plan_image_batches(&gaps, 3).is_empty());
    }

    #[test]
    fn batches_are_keyed_by_day_then_zip() {
        let day = NaiveDate::from_ymd_opt(2025, 10, 6).expect("valid date");
        let mut gaps = BTreeMap::new();
        for (zip, listing) in [("77002", "HAR200"), ("77479", "HAR102")] {
            let mut gap = ZipGap::default();
            gap.listings.insert(listing.to_string());
            gap.dates.insert(day, vec![listing.to_string()]);
            gaps.insert(zip.to_string(), gap);
        }

        let batches = plan_image_batches(&gaps, 100);
        assert_eq!(batches[&day]["77002"], vec![keys(&["HAR200"])]);
        assert_eq!(batches[&day]["77479"], vec![keys(&["HAR102"])]);
    }
}

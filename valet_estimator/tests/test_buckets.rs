use pretty_assertions::assert_eq;
use rstest::rstest;
use valet_estimator::BucketPartition;

#[test]
fn test_default_partition() {
    let partition = BucketPartition::default();
    assert_eq!(
        partition.labels(),
        vec!["0.00-0.20", "0.20-0.40", "0.40-0.60", "0.60-0.80", "0.80-1.00"]
    );
    assert_eq!(BucketPartition::parse("").unwrap(), partition);
    assert_eq!(BucketPartition::parse("   ").unwrap(), partition);
}

#[rstest]
#[case(0.0, 0)]
#[case(0.1999, 0)]
#[case(0.2, 1)]
#[case(0.5, 2)]
#[case(0.8, 4)]
#[case(0.9999, 4)]
#[case(1.0, 4)]
#[case(-0.5, 0)]
#[case(3.0, 4)]
fn test_half_open_lookup(#[case] fraction: f64, #[case] index: usize) {
    let partition = BucketPartition::default();
    assert_eq!(partition.index_for(fraction), index);
}

#[test]
fn test_every_fraction_lands_in_exactly_one_bucket() {
    let partition = BucketPartition::parse("0-0.1,0.1-0.35,0.35-0.9,0.9-1.0").unwrap();
    for step in 0..=1000 {
        let f = step as f64 / 1000.0;
        let holding: Vec<usize> = partition
            .buckets()
            .iter()
            .enumerate()
            .filter(|(_, b)| b.contains(f))
            .map(|(i, _)| i)
            .collect();
        let index = partition.index_for(f);
        if f < 1.0 {
            assert_eq!(holding, vec![index], "fraction {f}");
        } else {
            assert!(holding.is_empty());
            assert_eq!(index, partition.len() - 1);
        }
    }
}

#[test]
fn test_custom_spec_labels() {
    let partition = BucketPartition::parse("0-0.5, 0.5-1").unwrap();
    assert_eq!(partition.labels(), vec!["0.00-0.50", "0.50-1.00"]);
    assert_eq!(partition.label_for(0.75), "0.50-1.00");
    assert_eq!(partition.position("0.00-0.50"), Some(0));
    assert_eq!(partition.to_string(), "0.00-0.50,0.50-1.00");
}

#[rstest]
#[case("0-0.3,0.4-1.0")]
#[case("0-0.5")]
#[case("0.1-1.0")]
#[case("0-0.6,0.5-1.0")]
#[case("0-0.5,0.5-0.5,0.5-1.0")]
#[case("zero-one")]
#[case("0.5")]
fn test_invalid_partitions_are_rejected(#[case] spec: &str) {
    assert!(BucketPartition::parse(spec).is_err(), "{spec} accepted");
}

#[test]
fn test_from_labels_keeps_stored_text() {
    let partition = BucketPartition::from_labels(&["0.00-0.50", "0.50-1.01"]).unwrap();
    assert_eq!(partition.labels(), vec!["0.00-0.50", "0.50-1.01"]);
    assert_eq!(partition.label_for(1.0), "0.50-1.01");
}

//! Tests for core types

#[cfg(test)]
mod tests {
    use super::super::types::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn example(event_date: NaiveDate, g1f5: bool, g1f10: bool) -> LabeledExample {
        LabeledExample {
            event_date,
            features: vec![0.0],
            goal_in_first_5: g1f5,
            goal_in_first_10: g1f10,
        }
    }

    #[test]
    fn test_date_range_is_half_open() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 2, 1));
        assert!(range.contains(date(2024, 1, 1)));
        assert!(range.contains(date(2024, 1, 31)));
        assert!(!range.contains(date(2024, 2, 1)));
        assert!(!range.contains(date(2023, 12, 31)));
    }

    #[test]
    fn test_date_range_spanning() {
        let rows = vec![
            example(date(2024, 3, 5), true, true),
            example(date(2024, 1, 9), false, true),
            example(date(2024, 2, 14), false, false),
        ];
        let range = DateRange::spanning(&rows).unwrap();
        assert_eq!(range.start, date(2024, 1, 9));
        assert_eq!(range.end, date(2024, 3, 6));
        assert!(rows.iter().all(|r| range.contains(r.event_date)));

        assert!(DateRange::spanning(&[]).is_none());
    }

    #[test]
    fn test_date_range_serialization() {
        let range = DateRange::new(date(2023, 10, 1), date(2024, 7, 1));
        let json = serde_json::to_value(range).unwrap();
        assert_eq!(json["start"], "2023-10-01");
        assert_eq!(json["end"], "2024-07-01");
        assert_eq!(range.to_string(), "2023-10-01 to 2024-07-01");
    }

    #[test]
    fn test_target_names() {
        assert_eq!(Target::G1f5.key(), "g1f5");
        assert_eq!(Target::G1f10.key(), "g1f10");
        assert_eq!(Target::G1f5.to_string(), "G1F5");
        assert_eq!(serde_json::to_string(&Target::G1f10).unwrap(), "\"g1f10\"");
        assert_eq!(Target::ALL, [Target::G1f5, Target::G1f10]);
    }

    #[test]
    fn test_labels_per_target() {
        let row = example(date(2024, 1, 1), false, true);
        assert_eq!(row.label(Target::G1f5), 0);
        assert_eq!(row.label(Target::G1f10), 1);
    }

    #[test]
    fn test_missing_features_become_zero() {
        let row = LabeledExample::from_optional(date(2024, 1, 1), vec![Some(1.5), None, Some(-2.0)], true, true);
        assert_eq!(row.features, vec![1.5, 0.0, -2.0]);
    }

    #[test]
    fn test_has_both_classes() {
        assert!(has_both_classes(&[0, 1, 1]));
        assert!(!has_both_classes(&[1, 1, 1]));
        assert!(!has_both_classes(&[0]));
        assert!(!has_both_classes(&[]));
    }

    #[test]
    fn test_split_sets_access() {
        let sets = SplitSets {
            train: vec![example(date(2024, 1, 1), true, true); 3],
            validate: vec![example(date(2024, 2, 1), false, true)],
            test: vec![],
        };
        assert_eq!(sets.sizes(), (3, 1, 0));
        assert_eq!(sets.get(SplitName::Validate).len(), 1);
        assert_eq!(SplitName::Validate.to_string(), "Validate");
    }
}

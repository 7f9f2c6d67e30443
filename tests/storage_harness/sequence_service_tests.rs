//! Macro-generated test suite for `SequenceService` contract validation.
//!
//! Any backend must hand out 1, 2, 3, ... per counter name, keep names
//! independent, and never return the same value twice under concurrency.

/// Generate a `SequenceService` conformance test suite.
///
/// `$factory` is re-evaluated for each test and must be `Clone + 'static`
/// for the concurrency test.
#[macro_export]
macro_rules! sequence_service_tests {
    ($factory:expr) => {
        mod sequence_service_contract_tests {
            use super::*;
            use lms_invoicing::core::SequenceService;
            use std::collections::HashSet;

            #[tokio::test]
            async fn test_first_value_is_one() {
                let sequences = $factory;
                assert_eq!(sequences.next_value("invoice_number").await.unwrap(), 1);
            }

            #[tokio::test]
            async fn test_values_increase_by_one() {
                let sequences = $factory;
                let values: Vec<u64> = {
                    let mut v = Vec::new();
                    for _ in 0..5 {
                        v.push(sequences.next_value("receipts").await.unwrap());
                    }
                    v
                };
                assert_eq!(values, vec![1, 2, 3, 4, 5]);
            }

            #[tokio::test]
            async fn test_names_are_independent() {
                let sequences = $factory;
                sequences.next_value("a").await.unwrap();
                sequences.next_value("a").await.unwrap();

                assert_eq!(sequences.next_value("b").await.unwrap(), 1);
                assert_eq!(sequences.next_value("a").await.unwrap(), 3);
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn test_concurrent_values_are_distinct() {
                let sequences = $factory;

                let mut handles = Vec::new();
                for _ in 0..25 {
                    let sequences = sequences.clone();
                    handles.push(tokio::spawn(async move {
                        sequences.next_value("contended").await.unwrap()
                    }));
                }

                let mut seen = HashSet::new();
                for handle in handles {
                    assert!(seen.insert(handle.await.unwrap()), "duplicate counter value");
                }
                assert_eq!(seen.len(), 25);
                assert_eq!(seen.iter().copied().max(), Some(25));
            }
        }
    };
}

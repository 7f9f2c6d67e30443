//! Macro-generated test suite for `DataService<TestRecord>` contract validation.
//!
//! The `data_service_tests!` macro generates a test module that validates any
//! `DataService<TestRecord>` implementation against the full contract: CRUD,
//! newest-first listing, versioned compare-and-swap, search and concurrent
//! access.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//! use lms_invoicing::storage::InMemoryDataService;
//!
//! data_service_tests!(InMemoryDataService::<TestRecord>::new());
//! ```

/// Generate a full `DataService<TestRecord>` conformance test suite.
///
/// `$factory` must be an expression that evaluates to an instance implementing
/// `DataService<TestRecord>`. It is re-evaluated for each test to ensure
/// isolation. For the concurrent access test, the returned service must also
/// implement `Clone + 'static` (shared state via Arc pattern).
#[macro_export]
macro_rules! data_service_tests {
    ($factory:expr) => {
        mod data_service_contract_tests {
            use super::*;
            use lms_invoicing::core::{DataService, Entity};
            use uuid::Uuid;

            // ==================================================================
            // CRUD
            // ==================================================================

            #[tokio::test]
            async fn test_create_and_get() {
                let service = $factory;
                let record = create_test_record("Alice", "alice@test.com", 30, true);
                let original_id = record.id;

                let created = service.create(record.clone()).await.unwrap();
                assert_eq!(created.id(), original_id);

                let retrieved = service.get(&original_id).await.unwrap();
                assert_eq!(retrieved, Some(record), "Record should round-trip unchanged");
            }

            #[tokio::test]
            async fn test_get_nonexistent() {
                let service = $factory;

                let result = service.get(&Uuid::new_v4()).await.unwrap();
                assert!(result.is_none(), "Getting a nonexistent record should return None");
            }

            #[tokio::test]
            async fn test_list_empty() {
                let service = $factory;

                let all = service.list().await.unwrap();
                assert!(all.is_empty(), "List on empty store should return empty vec");
            }

            #[tokio::test]
            async fn test_list_newest_first() {
                let service = $factory;
                service.create(create_aged_record("oldest", 3)).await.unwrap();
                service.create(create_aged_record("newest", 1)).await.unwrap();
                service.create(create_aged_record("middle", 2)).await.unwrap();

                let names: Vec<String> = service
                    .list()
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|r| r.name)
                    .collect();
                assert_eq!(names, vec!["newest", "middle", "oldest"]);
            }

            #[tokio::test]
            async fn test_update_existing() {
                let service = $factory;
                let record = service
                    .create(create_test_record("Bob", "bob@test.com", 25, true))
                    .await
                    .unwrap();

                let mut changed = record.clone();
                changed.email = "robert@test.com".to_string();
                service.update(&record.id, changed).await.unwrap();

                let retrieved = service.get(&record.id).await.unwrap().unwrap();
                assert_eq!(retrieved.email, "robert@test.com");
            }

            #[tokio::test]
            async fn test_update_nonexistent() {
                let service = $factory;
                let record = create_test_record("Ghost", "ghost@test.com", 1, false);

                let result = service.update(&record.id, record.clone()).await;
                assert!(result.is_err(), "Updating a missing record should fail");
                assert!(service.get(&record.id).await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_delete_existing() {
                let service = $factory;
                let record = service
                    .create(create_test_record("Carol", "carol@test.com", 41, true))
                    .await
                    .unwrap();

                assert!(service.delete(&record.id).await.unwrap());
                assert!(service.get(&record.id).await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_delete_nonexistent() {
                let service = $factory;

                let removed = service.delete(&Uuid::new_v4()).await.unwrap();
                assert!(!removed, "Deleting a missing record reports nothing removed");
            }

            // ==================================================================
            // Versioned compare-and-swap
            // ==================================================================

            #[tokio::test]
            async fn test_update_if_version_matches() {
                let service = $factory;
                let record = service
                    .create(create_test_record("Dana", "dana@test.com", 33, true))
                    .await
                    .unwrap();

                let next = next_version(&record, "Dana v1");
                let stored = service
                    .update_if_version(&record.id, 0, next)
                    .await
                    .unwrap()
                    .expect("version 0 should match a fresh record");
                assert_eq!(stored.version(), 1);

                let retrieved = service.get(&record.id).await.unwrap().unwrap();
                assert_eq!(retrieved.name, "Dana v1");
                assert_eq!(retrieved.version(), 1);
            }

            #[tokio::test]
            async fn test_update_if_version_stale() {
                let service = $factory;
                let record = service
                    .create(create_test_record("Eve", "eve@test.com", 29, true))
                    .await
                    .unwrap();

                let first = next_version(&record, "first writer");
                let second = next_version(&record, "second writer");

                assert!(
                    service
                        .update_if_version(&record.id, 0, first)
                        .await
                        .unwrap()
                        .is_some()
                );
                assert!(
                    service
                        .update_if_version(&record.id, 0, second)
                        .await
                        .unwrap()
                        .is_none(),
                    "A writer holding a stale version must lose"
                );

                let retrieved = service.get(&record.id).await.unwrap().unwrap();
                assert_eq!(retrieved.name, "first writer");
            }

            #[tokio::test]
            async fn test_update_if_version_missing_record() {
                let service = $factory;
                let record = create_test_record("Nobody", "nobody@test.com", 0, false);

                let result = service
                    .update_if_version(&record.id, 0, record.clone())
                    .await
                    .unwrap();
                assert!(result.is_none());
                assert!(service.get(&record.id).await.unwrap().is_none());
            }

            // ==================================================================
            // Search
            // ==================================================================

            #[tokio::test]
            async fn test_search_string_field() {
                let service = $factory;
                service
                    .create(create_test_record("Frank", "frank@test.com", 50, true))
                    .await
                    .unwrap();
                service
                    .create(create_test_record("Grace", "grace@test.com", 50, false))
                    .await
                    .unwrap();

                let results = service.search("email", "grace@test.com").await.unwrap();
                assert_eq!(results.len(), 1);
                assert_eq!(results[0].name, "Grace");
            }

            #[tokio::test]
            async fn test_search_integer_field() {
                let service = $factory;
                service
                    .create(create_test_record("Heidi", "heidi@test.com", 27, true))
                    .await
                    .unwrap();
                service
                    .create(create_test_record("Ivan", "ivan@test.com", 64, true))
                    .await
                    .unwrap();

                let results = service.search("age", "64").await.unwrap();
                assert_eq!(results.len(), 1);
                assert_eq!(results[0].name, "Ivan");
            }

            #[tokio::test]
            async fn test_search_boolean_field() {
                let service = $factory;
                service
                    .create(create_test_record("Judy", "judy@test.com", 22, true))
                    .await
                    .unwrap();
                service
                    .create(create_test_record("Mallory", "mallory@test.com", 22, false))
                    .await
                    .unwrap();

                let inactive = service.search("active", "false").await.unwrap();
                assert_eq!(inactive.len(), 1);
                assert_eq!(inactive[0].name, "Mallory");
            }

            #[tokio::test]
            async fn test_search_no_results() {
                let service = $factory;
                service
                    .create(create_test_record("Niaj", "niaj@test.com", 38, true))
                    .await
                    .unwrap();

                let results = service.search("email", "nobody@test.com").await.unwrap();
                assert!(results.is_empty());
            }

            #[tokio::test]
            async fn test_search_unknown_field() {
                let service = $factory;
                service
                    .create(create_test_record("Olivia", "olivia@test.com", 31, true))
                    .await
                    .unwrap();

                let results = service
                    .search("nonexistent_field", "anything")
                    .await
                    .unwrap();
                assert!(results.is_empty(), "Search on unknown field should return empty vec");
            }

            // ==================================================================
            // Concurrent access
            // ==================================================================

            /// Parallel creates from spawned tasks all land in the store.
            #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
            async fn test_concurrent_access() {
                let service = $factory;

                let mut handles = Vec::new();
                for i in 0..10 {
                    let service = service.clone();
                    handles.push(tokio::spawn(async move {
                        let record = create_test_record(
                            &format!("worker-{}", i),
                            &format!("worker{}@test.com", i),
                            i,
                            i % 2 == 0,
                        );
                        service.create(record).await.unwrap()
                    }));
                }
                for handle in handles {
                    handle.await.unwrap();
                }

                assert_eq!(service.list().await.unwrap().len(), 10);
            }
        }
    };
}

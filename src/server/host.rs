//! Server host holding the ledger and its collaborators
//!
//! The host is transport-agnostic: it wires storage backends into an
//! [`InvoiceService`] according to an [`AppConfig`] and hands the result to
//! whatever exposure wants it (the REST router, tests, a CLI).

use crate::config::{AppConfig, SeedConfig, StorageBackend};
use crate::core::{BillingResult, DataService, SequenceService};
use crate::entities::{Course, Invoice, Student};
use crate::ledger::{InvoiceService, Notifier};
use crate::storage::{InMemoryDataService, InMemorySequenceService};
use std::sync::Arc;
use tracing::{debug, info};

/// Host context containing the ledger state
///
/// `courses` and `students` are exposed so the surrounding application
/// (catalog and directory handlers, seeding, tests) can share the same stores.
pub struct BillingHost {
    pub config: Arc<AppConfig>,
    pub service: Arc<InvoiceService>,
    pub invoices: Arc<dyn DataService<Invoice>>,
    pub courses: Arc<dyn DataService<Course>>,
    pub students: Arc<dyn DataService<Student>>,
}

impl BillingHost {
    /// Wire explicit stores into a host
    pub fn from_components(
        config: AppConfig,
        invoices: Arc<dyn DataService<Invoice>>,
        courses: Arc<dyn DataService<Course>>,
        students: Arc<dyn DataService<Student>>,
        sequences: Arc<dyn SequenceService>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        let mut service = InvoiceService::new(
            invoices.clone(),
            courses.clone(),
            students.clone(),
            sequences,
        )
        .with_settings(config.invoicing.clone())
        .with_notifications(config.notifications.clone());
        if let Some(notifier) = notifier {
            service = service.with_notifier(notifier);
        }

        Self {
            config: Arc::new(config),
            service: Arc::new(service),
            invoices,
            courses,
            students,
        }
    }

    /// Host backed by process-local memory
    pub fn in_memory(config: AppConfig) -> Self {
        Self::from_components(
            config,
            Arc::new(InMemoryDataService::<Invoice>::new()),
            Arc::new(InMemoryDataService::<Course>::new()),
            Arc::new(InMemoryDataService::<Student>::new()),
            Arc::new(InMemorySequenceService::new()),
            None,
        )
    }

    /// Host backed by MongoDB, creating the invoice-number index on the way
    #[cfg(feature = "mongodb_backend")]
    pub async fn mongodb(config: AppConfig) -> BillingResult<Self> {
        use crate::core::StorageError;
        use crate::storage::{MongoDataService, MongoSequenceService};

        let client = mongodb::Client::with_uri_str(&config.storage.mongodb.uri)
            .await
            .map_err(|e| StorageError::ConnectionError {
                backend: "mongodb".to_string(),
                message: e.to_string(),
            })?;
        let database = client.database(&config.storage.mongodb.database);

        let invoices = MongoDataService::<Invoice>::new(database.clone());
        invoices.ensure_unique_index("invoiceNumber").await?;

        tracing::info!(
            database = %config.storage.mongodb.database,
            "Connected to MongoDB"
        );

        Ok(Self::from_components(
            config,
            Arc::new(invoices),
            Arc::new(MongoDataService::<Course>::new(database.clone())),
            Arc::new(MongoDataService::<Student>::new(database.clone())),
            Arc::new(MongoSequenceService::new(database)),
            None,
        ))
    }

    /// Build the host for the backend named in the configuration, then
    /// write the configured seed records
    pub async fn from_config(config: AppConfig) -> BillingResult<Self> {
        config.validate()?;
        let host = match config.storage.backend {
            StorageBackend::InMemory => Self::in_memory(config),
            #[cfg(feature = "mongodb_backend")]
            StorageBackend::Mongodb => Self::mongodb(config).await?,
            #[cfg(not(feature = "mongodb_backend"))]
            StorageBackend::Mongodb => {
                return Err(crate::core::ConfigError::InvalidValue {
                    field: "storage.backend".to_string(),
                    value: "mongodb".to_string(),
                    message: "built without the mongodb_backend feature".to_string(),
                }
                .into());
            }
        };

        let seed = host.config.seed.clone();
        host.seed(&seed).await?;
        Ok(host)
    }

    /// Write seed courses and students, skipping ids that already exist
    pub async fn seed(&self, seed: &SeedConfig) -> BillingResult<()> {
        let mut courses = 0;
        for entry in &seed.courses {
            if let Some(id) = entry.id
                && self.courses.get(&id).await?.is_some()
            {
                debug!(course_id = %id, "Seed course already present");
                continue;
            }
            let mut course = Course::new(entry.title.clone(), entry.price);
            if let Some(id) = entry.id {
                course.id = id;
            }
            course.category = entry.category.clone();
            course.duration = entry.duration.clone();
            self.courses.create(course).await?;
            courses += 1;
        }

        let mut students = 0;
        for entry in &seed.students {
            if let Some(id) = entry.id
                && self.students.get(&id).await?.is_some()
            {
                debug!(student_id = %id, "Seed student already present");
                continue;
            }
            let mut student = Student::new(
                entry.candidate_name.clone(),
                entry.email.clone(),
                entry.mobile_no.clone(),
            );
            if let Some(id) = entry.id {
                student.id = id;
            }
            student.name_of_programme = entry.name_of_programme.clone();
            self.students.create(student).await?;
            students += 1;
        }

        if courses + students > 0 {
            info!(courses, students, "Seed records written");
        }
        Ok(())
    }
}

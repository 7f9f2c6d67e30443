//! Macros for reducing boilerplate when defining entities
//!
//! Every stored record carries the same `id`, `created_at` and `updated_at`
//! bookkeeping, so the [`Entity`](crate::core::Entity) implementation is
//! generated rather than written by hand for each type.

/// Implement [`Entity`](crate::core::Entity) for a struct with `id`,
/// `created_at` and `updated_at` fields
///
/// Add the `versioned` marker when the struct also has a `version: u64` field
/// that writers compare-and-swap on.
///
/// # Example
///
/// ```rust,ignore
/// impl_entity!(Course, "course", "courses");
/// impl_entity!(Invoice, "invoice", "invoices", versioned);
/// ```
#[macro_export]
macro_rules! impl_entity {
    ($type:ident, $singular:expr, $plural:expr) => {
        $crate::impl_entity!(@base $type, $singular, $plural, {});
    };
    ($type:ident, $singular:expr, $plural:expr, versioned) => {
        $crate::impl_entity!(@base $type, $singular, $plural, {
            fn version(&self) -> u64 {
                self.version
            }
        });
    };
    (@base $type:ident, $singular:expr, $plural:expr, { $($extra:tt)* }) => {
        impl $crate::core::entity::Entity for $type {
            fn resource_name() -> &'static str {
                $plural
            }

            fn resource_name_singular() -> &'static str {
                $singular
            }

            fn id(&self) -> ::uuid::Uuid {
                self.id
            }

            fn created_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.created_at
            }

            fn updated_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.updated_at
            }

            $($extra)*
        }
    };
}

use crate::host::config::{AccessRule, CollectionConfig, FieldAccess, FieldAdmin, FieldConfig, FieldType};

/// Name of the system-managed order attribute.
pub const DOC_ORDER_FIELD: &str = "docOrder";

/// The `docOrder` field: readable by everyone, never writable through normal
/// write paths, hidden from edit forms and indexed for sorting.
pub fn order_field() -> FieldConfig {
    FieldConfig {
        name: DOC_ORDER_FIELD.to_string(),
        field_type: FieldType::Number,
        access: FieldAccess {
            create: AccessRule::Denied,
            read: AccessRule::Allowed,
            update: AccessRule::Denied,
        },
        admin: FieldAdmin { hidden: true },
        index: true,
    }
}

/// Add `docOrder` to a collection unless it already has it.
pub fn inject_order_field(collection: &mut CollectionConfig) {
    if collection.field(DOC_ORDER_FIELD).is_none() {
        collection.fields.push(order_field());
    }
}

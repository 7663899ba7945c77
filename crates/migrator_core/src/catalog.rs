use std::fmt;
use std::str::FromStr;

use migrator_logging::migrator_warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of a migratable object. The declaration order is the catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    Table,
    Query,
    Procedure,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 3] = [ObjectKind::Table, ObjectKind::Query, ObjectKind::Procedure];

    pub fn label(self) -> &'static str {
        match self {
            ObjectKind::Table => "Table",
            ObjectKind::Query => "Query",
            ObjectKind::Procedure => "Procedure",
        }
    }

    /// Tab title used by the preview step.
    pub fn plural_label(self) -> &'static str {
        match self {
            ObjectKind::Table => "Tables",
            ObjectKind::Query => "Queries",
            ObjectKind::Procedure => "Stored Procedures",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ObjectKind {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" | "tables" => Ok(ObjectKind::Table),
            "query" | "queries" => Ok(ObjectKind::Query),
            "procedure" | "procedures" | "proc" => Ok(ObjectKind::Procedure),
            other => Err(SelectionError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigratableObject {
    pub name: String,
    pub kind: ObjectKind,
    pub record_count: u64,
    pub selected: bool,
}

impl MigratableObject {
    /// Procedures carry no records; any count passed for one is dropped.
    pub fn new(kind: ObjectKind, name: impl Into<String>, record_count: u64, selected: bool) -> Self {
        let record_count = match kind {
            ObjectKind::Procedure => 0,
            ObjectKind::Table | ObjectKind::Query => record_count,
        };
        Self {
            name: name.into(),
            kind,
            record_count,
            selected,
        }
    }

    pub fn is(&self, kind: ObjectKind, name: &str) -> bool {
        self.kind == kind && self.name == name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no {kind} named {name:?} in the catalog")]
    UnknownObject { kind: ObjectKind, name: String },
    #[error("unknown object kind {0:?}")]
    UnknownKind(String),
}

/// Receives the selected subset after every successful toggle.
pub trait SelectionObserver {
    fn selection_changed(&mut self, subset: &[MigratableObject]);
}

/// Catalog of migratable objects read from the source database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    database_name: String,
    objects: Vec<MigratableObject>,
}

impl Catalog {
    /// Builds a catalog in kind order, keeping the given order within a kind.
    /// A repeated `(kind, name)` is dropped.
    pub fn new(database_name: impl Into<String>, objects: Vec<MigratableObject>) -> Self {
        let mut unique: Vec<MigratableObject> = Vec::with_capacity(objects.len());
        for object in objects {
            if unique.iter().any(|o| o.is(object.kind, &object.name)) {
                migrator_warn!("Dropping duplicate {} {:?} from catalog", object.kind, object.name);
                continue;
            }
            unique.push(object);
        }
        unique.sort_by_key(|o| o.kind);
        Self {
            database_name: database_name.into(),
            objects: unique,
        }
    }

    /// The mock Access database shown by the wizard.
    pub fn sample() -> Self {
        use ObjectKind::{Procedure, Query, Table};
        let objects = vec![
            MigratableObject::new(Table, "Customers", 91, true),
            MigratableObject::new(Table, "Orders", 830, true),
            MigratableObject::new(Table, "Products", 77, true),
            MigratableObject::new(Table, "Employees", 9, true),
            MigratableObject::new(Table, "Categories", 8, true),
            MigratableObject::new(Table, "Suppliers", 29, true),
            MigratableObject::new(Table, "Shippers", 3, true),
            MigratableObject::new(Query, "CustomerOrders", 830, true),
            MigratableObject::new(Query, "ProductsByCategory", 77, true),
            MigratableObject::new(Query, "SalesByEmployee", 42, false),
            MigratableObject::new(Query, "OrderDetails", 2155, true),
            MigratableObject::new(Query, "TopCustomers", 10, false),
            MigratableObject::new(Procedure, "UpdateInventory", 0, false),
            MigratableObject::new(Procedure, "CalculateOrderTotal", 0, true),
            MigratableObject::new(Procedure, "GenerateInvoice", 0, false),
        ];
        Self::new("Sample.accdb", objects)
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn set_database_name(&mut self, name: impl Into<String>) {
        self.database_name = name.into();
    }

    pub fn objects(&self) -> &[MigratableObject] {
        &self.objects
    }

    pub fn objects_of(&self, kind: ObjectKind) -> impl Iterator<Item = &MigratableObject> {
        self.objects.iter().filter(move |o| o.kind == kind)
    }

    pub fn get(&self, kind: ObjectKind, name: &str) -> Option<&MigratableObject> {
        self.objects.iter().find(|o| o.is(kind, name))
    }

    /// Flips `selected` on one object and notifies `observer` with the new subset.
    /// Returns the object's new selection flag.
    pub fn toggle(
        &mut self,
        kind: ObjectKind,
        name: &str,
        observer: &mut dyn SelectionObserver,
    ) -> Result<bool, SelectionError> {
        let object = self
            .objects
            .iter_mut()
            .find(|o| o.is(kind, name))
            .ok_or_else(|| SelectionError::UnknownObject {
                kind,
                name: name.to_string(),
            })?;
        object.selected = !object.selected;
        let selected = object.selected;
        observer.selection_changed(&self.selected_subset());
        Ok(selected)
    }

    pub fn selected_count(&self) -> usize {
        self.objects.iter().filter(|o| o.selected).count()
    }

    pub fn total_count(&self) -> usize {
        self.objects.len()
    }

    pub fn count_of(&self, kind: ObjectKind) -> usize {
        self.objects_of(kind).count()
    }

    pub fn selected_subset(&self) -> Vec<MigratableObject> {
        self.objects.iter().filter(|o| o.selected).cloned().collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::sample()
    }
}

/// The session's copy of the selected subset, kept current by toggles.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    objects: Vec<MigratableObject>,
}

impl Selection {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self {
            objects: catalog.selected_subset(),
        }
    }

    pub fn objects(&self) -> &[MigratableObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn total_records(&self) -> u64 {
        self.objects.iter().map(|o| o.record_count).sum()
    }
}

impl SelectionObserver for Selection {
    fn selection_changed(&mut self, subset: &[MigratableObject]) {
        self.objects = subset.to_vec();
    }
}

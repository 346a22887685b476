//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod gestione;
pub mod item;
pub mod result;

pub use gestione::{ColumnMapping, Gestione};
pub use item::{GestioneItem, ItemField, NormalizedItem, Outcome};

//! Macros shared by the configuration models.

mod deserialization;

//! Chain independent block schema.
//!
//! Every watcher unifies its native encoding into these types before a block leaves it.

mod action;
mod block;
mod transaction;
mod value;

pub use action::{Action, ActionKind, TokenMovement};
pub use block::{BlockExtension, CanonicalBlock};
pub use transaction::{CanonicalTransaction, EosTransactionStatus, TransactionExtension};
pub use value::BigValue;

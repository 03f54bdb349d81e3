//! Raw EOS chain API payloads.

mod block;
mod transaction;

pub use block::{Block as EOSBlock, ChainInfo as EOSChainInfo};
pub use transaction::{
	Action as EOSAction, Compression as EOSCompression, PackedTransaction as EOSPackedTransaction,
	PermissionLevel as EOSPermissionLevel, ReceiptStatus as EOSReceiptStatus,
	ReceiptTrx as EOSReceiptTrx, TransactionReceipt as EOSTransactionReceipt,
	UnpackedTransaction as EOSUnpackedTransaction,
};

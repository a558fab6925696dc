mod receipt;
mod reconcile;

pub use receipt::ReceiptWatcherService;
pub use reconcile::ReconcileService;

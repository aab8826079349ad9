//! Text output trait interface.
//!
//! Implemented by the VGA and serial drivers, consumed by the dispatcher's
//! diagnostics and by `klog`.

pub trait Console: Send + Sync {
    /// Write raw bytes. Bytes the device cannot show are written as-is.
    fn print(&self, text: &[u8]);
}
